//! Error types for kobosync
//!
//! Errors fall into two severity tiers:
//! - **Recoverable**: affects a single volume, which is skipped while the run continues
//!   (missing source file, file already on the device, no matching catalog record).
//! - **Fatal**: aborts the whole run (unparseable document, schema violation,
//!   database or filesystem failure, catalog not connected).

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Only the current volume is affected; it is skipped
    Recoverable,
    /// The run cannot continue
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type shared by the document model and the catalog store
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Metadata document errors =====
    /// The metadata document is not valid structured text
    #[error("Invalid metadata document {path}: {reason}")]
    DocumentFormat { path: PathBuf, reason: String },

    /// A field is missing or has a malformed value
    #[error("Schema error on '{field}': {reason}")]
    Schema { field: String, reason: String },

    /// A dotted field path does not resolve to a value
    #[error("Key not found: {path}")]
    KeyNotFound { path: String },

    // ===== Per-volume conditions =====
    /// No catalog record matches the identifier
    #[error("Record not found: {entity} with {identifier}")]
    RecordNotFound { entity: String, identifier: String },

    /// Destination file is already present on the device
    #[error("Already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Source file referenced by the document does not exist
    #[error("Source file missing: {path}")]
    SourceMissing { path: PathBuf },

    // ===== Catalog errors =====
    /// A catalog operation was attempted without an open connection
    #[error("Catalog is not connected")]
    NotConnected,

    /// Catalog database operation failed
    #[error("Database error: {message}")]
    DatabaseError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== File system errors =====
    /// General I/O error
    #[error("I/O error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // ===== Generic errors =====
    /// Invalid argument provided
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RecordNotFound { .. } | Self::AlreadyExists { .. } | Self::SourceMissing { .. } => {
                ErrorSeverity::Recoverable
            }
            _ => ErrorSeverity::Fatal,
        }
    }

    /// Returns true if the affected volume can be skipped and the run continued
    pub fn is_recoverable(&self) -> bool {
        self.severity() == ErrorSeverity::Recoverable
    }

    /// Returns a message suitable for showing to the operator
    pub fn user_message(&self) -> String {
        match self {
            Self::DocumentFormat { path, .. } => {
                format!("{} is not a readable metadata file.", path.display())
            }
            Self::Schema { field, reason } => {
                format!("The metadata field '{}' is invalid: {}.", field, reason)
            }
            Self::KeyNotFound { path } => format!("The field '{}' is not set.", path),
            Self::RecordNotFound { identifier, .. } => {
                format!(
                    "{} is not registered on the device yet. Unplug and replug it, then retry.",
                    identifier
                )
            }
            Self::AlreadyExists { path } => {
                format!("{} is already on the device.", path.display())
            }
            Self::SourceMissing { path } => format!("{} does not exist.", path.display()),
            Self::NotConnected => "The device library is not open.".to_string(),
            Self::DatabaseError { .. } => {
                "The device library could not be updated. Is the device mounted?".to_string()
            }
            Self::IoError { path, .. } => {
                format!("A file operation failed on {}.", path.display())
            }
            Self::InvalidArgument { argument, .. } => format!("Invalid value for {}.", argument),
        }
    }

    /// Helper to create a database error from any error type
    pub fn database<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Helper to create a schema error
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Recoverable < ErrorSeverity::Fatal);
    }

    #[test]
    fn test_per_volume_errors_are_recoverable() {
        let errors = vec![
            AppError::RecordNotFound {
                entity: "content".to_string(),
                identifier: "file:///mnt/onboard/Mangas/a.cbz".to_string(),
            },
            AppError::AlreadyExists {
                path: PathBuf::from("/media/u/KOBO/Mangas/a.cbz"),
            },
            AppError::SourceMissing {
                path: PathBuf::from("/series/a.cbz"),
            },
        ];

        for err in errors {
            assert_eq!(err.severity(), ErrorSeverity::Recoverable);
            assert!(err.is_recoverable());
        }
    }

    #[test]
    fn test_run_level_errors_are_fatal() {
        assert_eq!(AppError::NotConnected.severity(), ErrorSeverity::Fatal);
        assert_eq!(
            AppError::schema("vol.1.date", "expected DD-MM-YYYY").severity(),
            ErrorSeverity::Fatal
        );
        assert_eq!(
            AppError::DocumentFormat {
                path: PathBuf::from(".metadata.yaml"),
                reason: "bad indentation".to_string(),
            }
            .severity(),
            ErrorSeverity::Fatal
        );
    }

    #[test]
    fn test_error_display() {
        let err = AppError::KeyNotFound {
            path: "vol.4.name".to_string(),
        };
        assert_eq!(err.to_string(), "Key not found: vol.4.name");

        let err = AppError::schema("name", "must not be empty");
        assert!(err.to_string().contains("'name'"));
    }

    #[test]
    fn test_database_helper_keeps_source() {
        let inner = io::Error::new(io::ErrorKind::Other, "disk I/O error");
        let err = AppError::database("Failed to update content", inner);

        assert!(matches!(err, AppError::DatabaseError { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_helper_keeps_path() {
        let inner = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = AppError::io("/series/vol1.cbz", inner);
        assert!(err.to_string().contains("/series/vol1.cbz"));
    }

    #[test]
    fn test_user_messages() {
        let err = AppError::RecordNotFound {
            entity: "content".to_string(),
            identifier: "file:///mnt/onboard/Mangas/a.cbz".to_string(),
        };
        assert!(err.user_message().contains("replug"));
        assert!(!AppError::NotConnected.user_message().is_empty());
    }
}
