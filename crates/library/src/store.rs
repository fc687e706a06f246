//! Metadata files on disk
//!
//! A series directory holds its volume archives and one metadata file
//! (`.metadata.yaml` by default). Saves go through a temporary file in the
//! same directory followed by a rename, so a crash never leaves a truncated
//! document behind.

use crate::codec;
use crate::error::{LibraryError, Result};
use crate::paths::{self, ListOptions};
use kobosync_core::types::{MetadataDocument, VolumeRecord, TODO_SENTINEL};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default metadata file name inside a series directory
pub const DEFAULT_METADATA_FILE: &str = ".metadata.yaml";

/// Default archive extension picked up by volume discovery
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "cbz";

/// Returns the metadata file path for a series directory
pub fn metadata_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(filename)
}

/// Loads and parses a metadata file
pub fn load_document(path: &Path) -> Result<MetadataDocument> {
    let text = fs::read_to_string(path).map_err(|e| LibraryError::io(path, e))?;
    let doc = codec::parse(&text, path)?;
    debug!(
        "Loaded '{}' with {} volumes from {}",
        doc.name,
        doc.volumes.len(),
        path.display()
    );
    Ok(doc)
}

/// Renders and writes a document atomically
pub fn save_document(doc: &MetadataDocument, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| LibraryError::io(dir, e))?;
    temp_file
        .write_all(codec::render(doc).as_bytes())
        .map_err(|e| LibraryError::io(temp_file.path(), e))?;
    temp_file
        .flush()
        .map_err(|e| LibraryError::io(temp_file.path(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| LibraryError::io(path, e.error))?;

    info!("Metadata saved to {}", path.display());
    Ok(())
}

/// Builds volume records from the archives found in `dir`
///
/// Files are taken in natural order and numbered contiguously from
/// `start_index`. Each volume is named after its file stem and dated with
/// the `TODO` placeholder.
pub fn discover_volumes(
    dir: &Path,
    start_index: u32,
    options: &ListOptions,
) -> Result<BTreeMap<u32, VolumeRecord>> {
    let files = paths::sorted_alphanumeric(dir, options)?;

    let volumes: BTreeMap<u32, VolumeRecord> = (start_index..)
        .zip(files)
        .map(|(index, file)| {
            let volume = VolumeRecord::new(paths::file_stem(&file), file).with_date(TODO_SENTINEL);
            (index, volume)
        })
        .collect();

    info!("Discovered {} volumes in {}", volumes.len(), dir.display());
    Ok(volumes)
}

/// Options for [`init_document`]
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub filename: String,
    pub start_index: u32,
    pub listing: ListOptions,
    /// Replace an existing metadata file
    pub force: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            filename: DEFAULT_METADATA_FILE.to_string(),
            start_index: 1,
            listing: ListOptions::new().with_extensions([DEFAULT_ARCHIVE_EXTENSION]),
            force: false,
        }
    }
}

/// Creates a metadata file for a series directory from its archives
pub fn init_document(dir: &Path, name: &str, options: &InitOptions) -> Result<MetadataDocument> {
    let path = metadata_path(dir, &options.filename);
    if path.exists() && !options.force {
        return Err(LibraryError::AlreadyInitialized(path));
    }

    let mut doc = MetadataDocument::new(name);
    doc.volumes = discover_volumes(dir, options.start_index, &options.listing)?;
    save_document(&doc, &path)?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = metadata_path(temp_dir.path(), DEFAULT_METADATA_FILE);

        let mut doc = MetadataDocument::new("Oh-Roh");
        doc.volumes
            .insert(1, VolumeRecord::new("Oh-Roh", "Oh-Roh.cbz").with_date("12-1989"));
        save_document(&doc, &path).unwrap();

        let loaded = load_document(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = metadata_path(temp_dir.path(), DEFAULT_METADATA_FILE);

        save_document(&MetadataDocument::new("First"), &path).unwrap();
        save_document(&MetadataDocument::new("Second"), &path).unwrap();

        assert_eq!(load_document(&path).unwrap().name, "Second");
        let leftovers = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_document(&temp_dir.path().join(DEFAULT_METADATA_FILE));
        assert!(matches!(result, Err(LibraryError::Io { .. })));
    }

    #[test]
    fn test_discover_volumes_numbering() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["Vol 10.cbz", "Vol 2.cbz", "Vol 1.cbz", "cover.jpg"] {
            fs::write(temp_dir.path().join(name), b"x").unwrap();
        }

        let options = ListOptions::new().with_extensions(["cbz"]);
        let volumes = discover_volumes(temp_dir.path(), 3, &options).unwrap();

        let summary: Vec<(u32, &str, &str)> = volumes
            .iter()
            .map(|(i, v)| (*i, v.name.as_str(), v.file.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (3, "Vol 1", "Vol 1.cbz"),
                (4, "Vol 2", "Vol 2.cbz"),
                (5, "Vol 10", "Vol 10.cbz"),
            ]
        );
        assert!(volumes
            .values()
            .all(|v| v.date.as_deref() == Some(TODO_SENTINEL)));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.cbz"), b"x").unwrap();

        let doc = init_document(temp_dir.path(), "Series", &InitOptions::default()).unwrap();
        assert_eq!(doc.volumes.len(), 1);

        let result = init_document(temp_dir.path(), "Series", &InitOptions::default());
        assert!(matches!(result, Err(LibraryError::AlreadyInitialized(_))));

        let forced = InitOptions {
            force: true,
            start_index: 7,
            ..Default::default()
        };
        let doc = init_document(temp_dir.path(), "Series", &forced).unwrap();
        assert!(doc.volumes.contains_key(&7));
    }
}
