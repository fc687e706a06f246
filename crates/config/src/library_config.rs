//! Library configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Source library settings used by `init` and `sync`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Name of the metadata document inside a series directory
    pub metadata_file: String,

    /// Archive extensions picked up when scanning a series directory
    pub archive_extensions: Vec<String>,

    /// File names never picked up by a scan
    pub ignore: Vec<String>,

    /// Index given to the first discovered volume
    pub start_index: u32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            metadata_file: ".metadata.yaml".to_string(),
            archive_extensions: vec!["cbz".to_string()],
            ignore: Vec::new(),
            start_index: 1,
        }
    }
}

impl ConfigSection for LibraryConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::plain_name(&self.metadata_file, "library.metadata_file"),
            Validator::in_range(self.start_index, 1, 9999, "library.start_index"),
        ];

        if self.archive_extensions.is_empty() {
            results.push(Err(ValidationError::new(
                "library.archive_extensions",
                "must list at least one extension",
            )));
        }

        for (i, ext) in self.archive_extensions.iter().enumerate() {
            results.push(Validator::not_empty(
                ext,
                &format!("library.archive_extensions[{}]", i),
            ));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.metadata_file = other.metadata_file;
        self.archive_extensions = other.archive_extensions;
        self.ignore = other.ignore;
        self.start_index = other.start_index;
    }

    fn section_name(&self) -> &'static str {
        "library"
    }
}
