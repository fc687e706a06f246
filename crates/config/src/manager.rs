//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable overriding `device.user`
pub const ENV_DEVICE_USER: &str = "KOBOSYNC_DEVICE_USER";
/// Environment variable overriding `device.device_name`
pub const ENV_DEVICE_NAME: &str = "KOBOSYNC_DEVICE_NAME";
/// Environment variable overriding `device.mount_root`
pub const ENV_MOUNT_ROOT: &str = "KOBOSYNC_DEVICE_MOUNT_ROOT";

/// Main configuration manager
///
/// Handles file paths, defaults, and validation.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager using the default config directory
    ///
    /// - Linux: `~/.config/kobosync/`
    /// - macOS: `~/Library/Application Support/kobosync/`
    /// - Windows: `%APPDATA%\kobosync\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let config_path = config_dir.join("config.toml");
        let persistence = ConfigPersistence::new(config_path);

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "kobosync")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    /// Returns the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Loads the configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file is corrupted, returns an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Saves the configuration to file
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads the current config, applies `update_fn` and saves the result
    ///
    /// ```rust,no_run
    /// # use kobosync_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| config.set_value("device.books_dir", "Comics"))
    ///     .expect("Failed to update config");
    /// ```
    ///
    /// Nothing is written if `update_fn` fails or the result does not validate.
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<Config>
    where
        F: FnOnce(&mut Config) -> ConfigResult<()>,
    {
        let mut config = self.load()?;
        update_fn(&mut config)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Writes a default config file if one doesn't exist
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.save(&Config::default())?;
        log::info!("Generated default config at {}", self.config_path().display());
        Ok(true)
    }

    /// Overwrites the existing config file with default values
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    ///
    /// Returns all validation errors found, or an empty list if valid.
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the config and applies `KOBOSYNC_DEVICE_*` environment overrides
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;

        if let Ok(user) = std::env::var(ENV_DEVICE_USER) {
            config.device.user = Some(user);
        }

        if let Ok(name) = std::env::var(ENV_DEVICE_NAME) {
            config.device.device_name = name;
        }

        if let Ok(root) = std::env::var(ENV_MOUNT_ROOT) {
            config.device.mount_root = PathBuf::from(root);
        }

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}
