//! Configuration management for pantry.
//!
//! This module handles loading and saving configuration from `~/.pantry/`.

mod paths;
mod settings;

pub use paths::{Paths, HOME_ENV};
pub use settings::{ApiConfig, CacheConfig, Config, GeneralConfig, SyncConfig};
