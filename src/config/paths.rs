//! Path resolution for pantry configuration and data files.
//!
//! All pantry data is stored in `~/.pantry/` (or `$PANTRY_HOME`):
//! - `config.yaml` - Main configuration file
//! - `pantry.db` - SQLite database for the request queue and caches

use std::path::PathBuf;

use crate::error::PantryError;

/// Environment variable that overrides the data directory.
pub const HOME_ENV: &str = "PANTRY_HOME";

/// Paths to pantry configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.pantry/`
    pub root: PathBuf,
    /// Config file: `~/.pantry/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.pantry/pantry.db`
    pub database: PathBuf,
}

impl Paths {
    /// Create paths from `$PANTRY_HOME`, falling back to the user's home
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set.
    pub fn new() -> Result<Self, PantryError> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let home = std::env::var("HOME").map_err(|_| {
            PantryError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".pantry")))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("pantry.db"),
            root,
        }
    }

    /// Ensure the data directory exists, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), PantryError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                PantryError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }

        Ok(())
    }
}
