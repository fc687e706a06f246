pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorSeverity, Result};
pub use types::{
    is_todo, CreditField, CreditRecord, FieldPath, FieldValue, KoboTimestamp, MetadataDocument,
    RootField, Validator, VolumeField, VolumeRecord, KOBO_TIME_FORMAT, TODO_SENTINEL,
};
