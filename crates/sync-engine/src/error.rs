//! Error types for sync operations

use crate::types::SyncState;
use kobosync_config::ConfigError;
use kobosync_core::AppError;
use kobosync_library::LibraryError;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// Document, catalog or file error
    #[error(transparent)]
    App(#[from] AppError),

    /// Metadata file could not be loaded
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// Device layout could not be resolved from the configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A step was requested out of order
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SyncState,
    },

    /// The operator gave up waiting for the device
    #[error("Device not ready: {0}")]
    DeviceNotReady(String),

    /// Report serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Returns the underlying document or catalog error, if any
    pub fn app_error(&self) -> Option<&AppError> {
        match self {
            Self::App(e) | Self::Library(LibraryError::Document(e)) => Some(e),
            _ => None,
        }
    }
}
