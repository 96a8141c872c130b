//! Command implementations for pantry.
//!
//! This module contains the implementation of all CLI commands. Each command
//! returns the text to print on stdout.

mod cache;
mod config;
mod fetch;
mod sync;
mod watch;

pub use cache::cache;
pub use config::config;
pub use fetch::fetch;
pub use sync::sync;
pub use watch::watch;
