//! Integration tests for metadata files: hand-written documents, edits and re-saves

use kobosync_core::types::{FieldValue, Validator, VolumeRecord};
use kobosync_core::AppError;
use kobosync_library::{
    init_document, load_document, metadata_path, save_document, InitOptions, LibraryError,
    ListOptions, DEFAULT_METADATA_FILE,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

type Result<T> = std::result::Result<T, LibraryError>;

const HAND_WRITTEN: &str = "\
--- # Oh-Roh Metadata
name:
    Oh-Roh
original:
    王狼
author:
    Buronson
artist:
    Kentarō Miura
editor:
    Hakusensha
lang:
    en
synopsis: |
    Super synopsis.

    On two paragraphs.
vol:
    1:
        name:   Oh-Roh
        date:   12-1989
        file:   Oh-Roh.cbz
        original:  王狼
    2:
        name:   Oh-Roh-Den
        date:   08-1990
        file:   Oh-Roh-Den.cbz
        original:  王狼伝
";

fn write_series(dir: &TempDir, text: &str) -> PathBuf {
    let path = metadata_path(dir.path(), DEFAULT_METADATA_FILE);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_load_hand_written_document() -> Result<()> {
    let temp_dir = TempDir::new().map_err(|e| LibraryError::io("tempdir", e))?;
    let path = write_series(&temp_dir, HAND_WRITTEN);

    let doc = load_document(&path)?;
    assert_eq!(doc.name, "Oh-Roh");
    assert_eq!(doc.attribution().as_deref(), Some("Buronson, Kentarō Miura"));
    assert_eq!(
        doc.synopsis.as_deref(),
        Some("Super synopsis.\n\nOn two paragraphs.\n")
    );
    assert_eq!(doc.volumes.len(), 2);
    assert_eq!(doc.volumes[&2].original.as_deref(), Some("王狼伝"));
    assert!(doc.is_valid());

    Ok(())
}

#[test]
fn test_resave_normalizes_then_stays_stable() -> Result<()> {
    let temp_dir = TempDir::new().map_err(|e| LibraryError::io("tempdir", e))?;
    let path = write_series(&temp_dir, HAND_WRITTEN);

    let doc = load_document(&path)?;
    save_document(&doc, &path)?;
    let first = fs::read_to_string(&path).map_err(|e| LibraryError::io(&path, e))?;

    save_document(&load_document(&path)?, &path)?;
    let second = fs::read_to_string(&path).map_err(|e| LibraryError::io(&path, e))?;

    assert_eq!(first, second);
    assert!(first.contains("synopsis: |-\n    Super synopsis.\n\n    On two paragraphs.\n"));
    assert!(first.contains("        original:   王狼\n"));

    Ok(())
}

#[test]
fn test_edit_through_dotted_paths() -> Result<()> {
    let temp_dir = TempDir::new().map_err(|e| LibraryError::io("tempdir", e))?;
    let path = write_series(&temp_dir, HAND_WRITTEN);

    let mut doc = load_document(&path)?;
    doc.set("vol.2.date", "15-08-1990")?;
    doc.set("romanized", "Ōrō")?;
    doc.set(
        "vol.3",
        FieldValue::Volume(VolumeRecord::new("Extra", "Extra.cbz")),
    )?;
    save_document(&doc, &path)?;

    let reloaded = load_document(&path)?;
    assert_eq!(reloaded.get("vol.2.date")?, FieldValue::from("15-08-1990"));
    assert_eq!(reloaded.get("romanized")?, FieldValue::from("Ōrō"));
    assert_eq!(reloaded.get("vol.3.file")?, FieldValue::from("Extra.cbz"));

    let err = reloaded.get("vol.3.date").unwrap_err();
    assert!(matches!(err, AppError::KeyNotFound { .. }));

    Ok(())
}

#[test]
fn test_malformed_document_reports_path() -> Result<()> {
    let temp_dir = TempDir::new().map_err(|e| LibraryError::io("tempdir", e))?;
    let path = write_series(&temp_dir, "name: [Oh-Roh\n");

    match load_document(&path) {
        Err(LibraryError::Document(AppError::DocumentFormat { path: reported, .. })) => {
            assert_eq!(reported, path);
        }
        other => panic!("expected a format error, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_init_from_directory_scan() -> Result<()> {
    let temp_dir = TempDir::new().map_err(|e| LibraryError::io("tempdir", e))?;
    for name in ["Berserk 10.cbz", "Berserk 9.cbz", "Berserk 1.cbz", "notes.txt"] {
        fs::write(temp_dir.path().join(name), b"PK").map_err(|e| LibraryError::io(name, e))?;
    }

    let options = InitOptions {
        listing: ListOptions::new()
            .with_extensions([".CBZ"])
            .with_ignore(["Berserk 9.cbz"]),
        ..Default::default()
    };
    init_document(temp_dir.path(), "Berserk", &options)?;

    let doc = load_document(&metadata_path(temp_dir.path(), DEFAULT_METADATA_FILE))?;
    assert_eq!(doc.name, "Berserk");
    assert_eq!(doc.volumes[&1].file, "Berserk 1.cbz");
    assert_eq!(doc.volumes[&2].file, "Berserk 10.cbz");
    assert_eq!(doc.volumes[&2].date.as_deref(), Some("TODO"));

    Ok(())
}
