//! kobosync configuration
//!
//! A single `config.toml` holds the device layout and library defaults.
//! Each section implements [`ConfigSection`] so it validates and merges
//! independently.
//!
//! # Example
//!
//! ```rust,no_run
//! use kobosync_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Books go to {}", config.device.books_dir);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

mod device_config;
mod library_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{ConfigManager, ENV_DEVICE_NAME, ENV_DEVICE_USER, ENV_MOUNT_ROOT};
pub use validation::{ConfigSection, Validator};

pub use device_config::DeviceConfig;
pub use library_config::LibraryConfig;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Device mount and storage layout
    pub device: DeviceConfig,

    /// Source library settings
    pub library: LibraryConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.device.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.library.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Sets one field from its dotted key, as typed on the command line
    ///
    /// List fields take comma-separated values. An empty `device.user`
    /// goes back to `$USER`.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let list = || -> Vec<String> {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        };

        match key {
            "device.mount_root" => self.device.mount_root = PathBuf::from(value),
            "device.user" => {
                self.device.user = Some(value.to_string()).filter(|user| !user.is_empty())
            }
            "device.device_name" => self.device.device_name = value.to_string(),
            "device.books_dir" => self.device.books_dir = value.to_string(),
            "device.onboard_root" => self.device.onboard_root = value.to_string(),
            "device.database_file" => self.device.database_file = PathBuf::from(value),
            "library.metadata_file" => self.library.metadata_file = value.to_string(),
            "library.archive_extensions" => self.library.archive_extensions = list(),
            "library.ignore" => self.library.ignore = list(),
            "library.start_index" => {
                self.library.start_index = value.trim().parse().map_err(|_| {
                    ConfigError::ValidationError(format!(
                        "Field 'library.start_index': '{}' is not a number",
                        value
                    ))
                })?
            }
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Unknown config key '{}'",
                    key
                )))
            }
        }
        Ok(())
    }

    /// Renders the configuration as it would be saved
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.device.merge(other.device);
        self.library.merge(other.library);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            device: DeviceConfig::default(),
            library: LibraryConfig::default(),
        }
    }
}
