//! Command-line interface for pantry.

pub mod args;
pub mod commands;
