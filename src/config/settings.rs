//! Configuration settings for pantry.
//!
//! Settings are loaded from `~/.pantry/config.yaml`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::args::OutputFormat;
use crate::config::Paths;
use crate::error::PantryError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Backend API settings.
    pub api: ApiConfig,
    /// Response cache settings.
    pub cache: CacheConfig,
    /// Offline queue replay settings.
    pub sync: SyncConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
}

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend API. Requests to this origin are reads or
    /// queueable writes; everything else is a static asset.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path patterns (regular expressions) that are never cached or queued.
    #[serde(default = "default_bypass")]
    pub bypass: Vec<String>,
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache generation. Bumping it retires every cache from older
    /// generations on the next `activate`.
    #[serde(default = "default_cache_version")]
    pub version: u32,
    /// Static asset URLs fetched into the static cache on `install`.
    #[serde(default)]
    pub precache: Vec<String>,
}

/// Offline queue replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between replay attempts while the queue is non-empty.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Per-request network timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

// Default value functions for serde
const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

fn default_base_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_bypass() -> Vec<String> {
    vec!["^/auth/v1/".to_string(), "^/realtime/v1/".to_string()]
}

const fn default_cache_version() -> u32 {
    1
}

const fn default_poll_interval() -> u64 {
    30
}

const fn default_request_timeout() -> u64 {
    30
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            bypass: default_bypass(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: default_cache_version(),
            precache: Vec::new(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Parse the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed.
    pub fn base_url(&self) -> Result<Url, PantryError> {
        Url::parse(&self.base_url).map_err(|e| {
            PantryError::Config(format!("Invalid api.base_url '{}': {e}", self.base_url))
        })
    }
}

impl SyncConfig {
    /// Interval between background replay attempts.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Network timeout applied to every outgoing request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, PantryError> {
        let paths = Paths::new()?;
        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, PantryError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            PantryError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            PantryError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Save configuration to the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<(), PantryError> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;
        self.save_to_path(&paths.config_file)
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), PantryError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| PantryError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            PantryError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.general.default_output, OutputFormat::Pretty);
        assert_eq!(config.api.base_url, "http://localhost:54321");
        assert_eq!(config.api.bypass.len(), 2);
        assert_eq!(config.cache.version, 1);
        assert!(config.cache.precache.is_empty());
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.sync.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(config.general.default_output, OutputFormat::Pretty);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut config = Config::default();
        config.api.base_url = "https://abc.supabase.co".to_string();
        config.cache.version = 4;

        config.save_to_path(&config_path).unwrap();

        let loaded = Config::load_from_path(&config_path).unwrap();

        assert_eq!(loaded.api.base_url, "https://abc.supabase.co");
        assert_eq!(loaded.cache.version, 4);
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let partial_yaml = r"
sync:
  poll_interval_secs: 5
";
        std::fs::write(&config_path, partial_yaml).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(config.sync.poll_interval_secs, 5);
        // Defaults should be used for missing fields
        assert_eq!(config.sync.request_timeout_secs, 30);
        assert_eq!(config.api.base_url, "http://localhost:54321");
    }

    #[test]
    fn test_malformed_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "sync: [not, a, map]").unwrap();

        let result = Config::load_from_path(&config_path);
        assert!(matches!(result, Err(PantryError::Config(_))));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();

        assert!(matches!(config.api.base_url(), Err(PantryError::Config(_))));
    }
}
