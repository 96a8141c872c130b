//! Storage layer for pantry.
//!
//! This module provides SQLite-based persistence for:
//! - The offline request queue and its discard log
//! - Response caches

mod database;
mod migrations;

pub use database::{Database, DatabaseLocation, SharedDatabase};
