//! pantry - offline request layer for the shopping-list client
//!
//! This crate sits between the client and its backend. Static assets are
//! served from a versioned cache, API reads fall back to the last good
//! response, and API writes that cannot reach the server are persisted to a
//! durable FIFO queue and replayed in order once connectivity returns.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod http;
pub mod logging;
pub mod offline;
pub mod output;
pub mod storage;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::PantryError;
pub use offline::OfflineLayer;
