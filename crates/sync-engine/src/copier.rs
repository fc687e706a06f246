//! Source to device file transfer

use kobosync_core::AppError;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Result of one transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    /// A file with the same name is already at the destination; left as is
    AlreadyExists,
    SourceMissing,
}

impl CopyOutcome {
    /// Turns the skip outcomes into their per-volume error
    pub fn into_result(self, source: &Path, destination: &Path) -> Result<(), AppError> {
        match self {
            Self::Copied => Ok(()),
            Self::AlreadyExists => Err(AppError::AlreadyExists {
                path: destination.to_path_buf(),
            }),
            Self::SourceMissing => Err(AppError::SourceMissing {
                path: source.to_path_buf(),
            }),
        }
    }
}

/// Moves a volume file onto the device
pub trait FileCopier {
    fn copy(&self, source: &Path, destination: &Path) -> Result<CopyOutcome, AppError>;
}

/// Byte copy over the filesystem
///
/// Data goes to a temporary file next to the destination which is renamed
/// once complete, so an interrupted transfer never leaves a partial archive
/// under the final name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCopier;

impl FileCopier for FsCopier {
    fn copy(&self, source: &Path, destination: &Path) -> Result<CopyOutcome, AppError> {
        if !source.is_file() {
            return Ok(CopyOutcome::SourceMissing);
        }
        if destination.exists() {
            return Ok(CopyOutcome::AlreadyExists);
        }

        let reader = File::open(source).map_err(|e| AppError::io(source, e))?;
        let bytes = write_atomically(reader, destination)?;
        debug!("Copied {} bytes to {}", bytes, destination.display());
        info!("Importing {}", source.display());
        Ok(CopyOutcome::Copied)
    }
}

/// Streams `reader` into `destination`, which appears only once fully written
fn write_atomically(mut reader: impl Read, destination: &Path) -> Result<u64, AppError> {
    let dir = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| AppError::io(dir, e))?;
    let bytes = io::copy(&mut reader, &mut temp_file).map_err(|e| AppError::io(destination, e))?;
    temp_file
        .flush()
        .map_err(|e| AppError::io(temp_file.path(), e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| AppError::io(temp_file.path(), e))?;
    temp_file
        .persist_noclobber(destination)
        .map_err(|e| AppError::io(destination, e.error))?;

    Ok(bytes)
}
