//! Device layout configuration section
//!
//! Describes where the e-reader mounts on the host and how its storage is
//! laid out, so the sync engine can derive destination paths and content
//! identifiers.

use crate::error::{ConfigError, ConfigResult};
use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Device mount and storage layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Directory under which removable media are mounted
    pub mount_root: PathBuf,

    /// Mount owner; `$USER` when unset
    pub user: Option<String>,

    /// Volume label of the device
    pub device_name: String,

    /// Directory on the device that receives the archives
    pub books_dir: String,

    /// Prefix the device uses for content identifiers
    pub onboard_root: String,

    /// Catalog path relative to the mount point
    pub database_file: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mount_root: PathBuf::from("/media"),
            user: None,
            device_name: "KOBOeReader".to_string(),
            books_dir: "Mangas".to_string(),
            onboard_root: "file:///mnt/onboard".to_string(),
            database_file: PathBuf::from(".kobo/KoboReader.sqlite"),
        }
    }
}

impl DeviceConfig {
    /// Returns the configured user, falling back to the `USER` environment variable
    pub fn resolved_user(&self) -> Option<String> {
        self.user
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
    }

    /// Returns `<mount_root>/<user>/<device_name>`
    pub fn mount_point(&self) -> ConfigResult<PathBuf> {
        let user = self
            .resolved_user()
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "no device user configured and USER is not set".to_string(),
            })?;

        Ok(self.mount_root.join(user).join(&self.device_name))
    }
}

impl ConfigSection for DeviceConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::not_empty(&self.mount_root.to_string_lossy(), "device.mount_root"),
            Validator::plain_name(&self.device_name, "device.device_name"),
            Validator::plain_name(&self.books_dir, "device.books_dir"),
            Validator::has_prefix(&self.onboard_root, "file://", "device.onboard_root"),
        ];

        if let Some(ref user) = self.user {
            results.push(Validator::plain_name(user, "device.user"));
        }

        if self.database_file.as_os_str().is_empty() {
            results.push(Err(ValidationError::new(
                "device.database_file",
                "must not be empty",
            )));
        } else if self.database_file.is_absolute() {
            results.push(Err(ValidationError::with_value(
                "device.database_file",
                "must be relative to the mount point",
                self.database_file.display(),
            )));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.mount_root = other.mount_root;
        if other.user.is_some() {
            self.user = other.user;
        }
        self.device_name = other.device_name;
        self.books_dir = other.books_dir;
        self.onboard_root = other.onboard_root;
        self.database_file = other.database_file;
    }

    fn section_name(&self) -> &'static str {
        "device"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(DeviceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_mount_point_uses_configured_user() {
        let config = DeviceConfig {
            user: Some("reader".to_string()),
            ..Default::default()
        };

        assert_eq!(
            config.mount_point().unwrap(),
            PathBuf::from("/media/reader/KOBOeReader")
        );
    }

    #[test]
    fn test_books_dir_must_be_plain_name() {
        let config = DeviceConfig {
            books_dir: "Mangas/Seinen".to_string(),
            ..Default::default()
        };

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "device.books_dir");
    }

    #[test]
    fn test_absolute_database_file_rejected() {
        let config = DeviceConfig {
            database_file: PathBuf::from("/abs/KoboReader.sqlite"),
            onboard_root: "/mnt/onboard".to_string(),
            ..Default::default()
        };

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_merge_keeps_user_when_other_unset() {
        let mut base = DeviceConfig {
            user: Some("reader".to_string()),
            ..Default::default()
        };
        let other = DeviceConfig {
            device_name: "KOBO".to_string(),
            ..Default::default()
        };

        base.merge(other);
        assert_eq!(base.user.as_deref(), Some("reader"));
        assert_eq!(base.device_name, "KOBO");
    }
}
