//! Domain types for kobosync
//!
//! This module contains the domain models organized by responsibility:
//! - `document`: Series metadata document, volumes and credits
//! - `path`: Dotted field paths over a document
//! - `common`: Shared traits, the `TODO` placeholder and catalog timestamps

mod common;
mod document;
mod path;

// Re-export all public types
pub use common::{is_todo, KoboTimestamp, Validator, KOBO_TIME_FORMAT, TODO_SENTINEL};
pub use document::{CreditRecord, FieldValue, MetadataDocument, VolumeRecord};
pub use path::{CreditField, FieldPath, RootField, VolumeField};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_types_are_exported() {
        let doc = MetadataDocument::new("Oh-Roh");
        let path: FieldPath = "vol.1.date".parse().unwrap();
        assert_eq!(path, FieldPath::VolumeField(1, VolumeField::Date));
        assert!(doc.get_path(path).is_err());
        assert!(CreditRecord::default().is_empty());
    }
}
