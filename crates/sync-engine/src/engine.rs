//! Sync orchestrator
//!
//! A run walks through `Idle → Scanning → Copying → AwaitingDeviceReady →
//! Updating → Done`. Each step is its own call so the device-ready pause
//! can be driven by a terminal prompt, a test, or skipped entirely when
//! only the catalog needs rewriting. Any fatal error moves the run to
//! `Failed`, after which no further step is accepted.

use crate::copier::FileCopier;
use crate::error::{SyncError, SyncResult};
use crate::mapping;
use crate::types::{DeviceLayout, SyncMode, SyncOptions, SyncReport, SyncState, VolumeOutcome, VolumeReport};
use chrono::Local;
use kobosync_core::types::{MetadataDocument, VolumeRecord};
use kobosync_core::AppError;
use kobosync_database::queries::{
    add_membership, content_exists, create_collection, delete_collection, edit,
};
use kobosync_database::{CatalogStore, DatabaseConfig};
use kobosync_library::{load_document, metadata_path, DEFAULT_METADATA_FILE};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Suspension point between copying files and updating the catalog
///
/// The device only creates catalog records for new files once it has been
/// unplugged and has indexed them. Implementations return once the device
/// is mounted again, or fail to abort the run.
pub trait DeviceReadySignal {
    fn wait_until_ready(&mut self) -> SyncResult<()>;
}

impl<F> DeviceReadySignal for F
where
    F: FnMut() -> SyncResult<()>,
{
    fn wait_until_ready(&mut self) -> SyncResult<()> {
        self()
    }
}

/// Drives one sync of a series directory onto a device
pub struct SyncOrchestrator {
    source_dir: PathBuf,
    metadata_file: String,
    layout: DeviceLayout,
    options: SyncOptions,
    state: SyncState,
    document: Option<MetadataDocument>,
    selected: Vec<(u32, VolumeRecord)>,
    report: SyncReport,
}

impl SyncOrchestrator {
    pub fn new(source_dir: impl Into<PathBuf>, layout: DeviceLayout, options: SyncOptions) -> Self {
        let mode = options.mode;
        Self {
            source_dir: source_dir.into(),
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
            layout,
            options,
            state: SyncState::Idle,
            document: None,
            selected: Vec::new(),
            report: SyncReport::new("", mode),
        }
    }

    /// Reads the series metadata from a differently named file
    pub fn with_metadata_file(mut self, filename: impl Into<String>) -> Self {
        self.metadata_file = filename.into();
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn layout(&self) -> &DeviceLayout {
        &self.layout
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// The loaded document, once scanned
    pub fn document(&self) -> Option<&MetadataDocument> {
        self.document.as_ref()
    }

    /// Indices of the volumes this run handles, once scanned
    pub fn selected_volumes(&self) -> Vec<u32> {
        self.selected.iter().map(|(index, _)| *index).collect()
    }

    pub fn report(&self) -> &SyncReport {
        &self.report
    }

    /// A closed handle on the device catalog
    pub fn catalog(&self) -> CatalogStore {
        CatalogStore::new(DatabaseConfig::new(self.layout.database_path()))
    }

    fn expect_state(&self, allowed: &[SyncState], operation: &'static str) -> SyncResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SyncError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn settle<T>(&mut self, result: SyncResult<T>, next: SyncState) -> SyncResult<T> {
        match result {
            Ok(value) => {
                debug!("Sync state: {} -> {}", self.state, next);
                self.state = next;
                Ok(value)
            }
            Err(e) => {
                warn!("Sync failed while {}: {}", self.state, e);
                self.state = SyncState::Failed;
                Err(e)
            }
        }
    }

    /// Loads the document, selects volumes and checks their dates
    pub fn scan(&mut self) -> SyncResult<()> {
        self.expect_state(&[SyncState::Idle], "scan")?;
        self.state = SyncState::Scanning;

        let result = self.load_selection();
        self.settle(result, SyncState::Scanning)
    }

    fn load_selection(&mut self) -> SyncResult<()> {
        let path = metadata_path(&self.source_dir, &self.metadata_file);
        let doc = load_document(&path)?;

        let mut selected: Vec<(u32, VolumeRecord)> = match &self.options.volumes {
            Some(indices) => indices
                .iter()
                .map(|index| {
                    doc.volumes
                        .get(index)
                        .map(|volume| (*index, volume.clone()))
                        .ok_or_else(|| AppError::KeyNotFound {
                            path: format!("vol.{}", index),
                        })
                })
                .collect::<Result<_, _>>()?,
            None => doc
                .volumes
                .iter()
                .map(|(index, volume)| (*index, volume.clone()))
                .collect(),
        };

        if self.options.mode == SyncMode::Oneshot {
            if selected.is_empty() {
                return Err(AppError::schema("vol", "a oneshot needs at least one volume").into());
            }
            selected.truncate(1);
        }

        // Malformed dates stop the run before anything touches the device
        for (index, volume) in &selected {
            mapping::volume_date(*index, volume)?;
        }

        let mut report = SyncReport::new(doc.name.clone(), self.options.mode);
        report.volumes = selected
            .iter()
            .map(|(index, volume)| VolumeReport {
                index: *index,
                file: volume.file.clone(),
                content_id: self.layout.content_id(&volume.file),
                copy: None,
                update: None,
            })
            .collect();

        info!(
            "Scanned '{}': {} of {} volumes selected",
            doc.name,
            selected.len(),
            doc.volumes.len()
        );

        self.report = report;
        self.selected = selected;
        self.document = Some(doc);
        Ok(())
    }

    /// Copies the selected volume files onto the device
    pub fn copy(&mut self, copier: &dyn FileCopier) -> SyncResult<()> {
        self.expect_state(&[SyncState::Scanning], "copy")?;
        self.state = SyncState::Copying;

        let result = self.copy_volumes(copier);
        self.settle(result, SyncState::AwaitingDeviceReady)
    }

    fn copy_volumes(&mut self, copier: &dyn FileCopier) -> SyncResult<()> {
        for (index, volume) in &self.selected {
            let source = self.source_dir.join(&volume.file);
            let destination = self.layout.destination(&volume.file);

            let outcome = match copier
                .copy(&source, &destination)?
                .into_result(&source, &destination)
            {
                Ok(()) => VolumeOutcome::Copied,
                Err(condition) => skip_volume(*index, condition)?,
            };

            if let Some(entry) = self.report.volume_mut(*index) {
                entry.copy = Some(outcome);
            }
        }
        Ok(())
    }

    /// Marks the device as mounted again with its new files indexed
    ///
    /// Also accepted straight after `scan` to rewrite catalog records for
    /// files that are already on the device.
    pub fn confirm_device_ready(&mut self) -> SyncResult<()> {
        self.expect_state(
            &[SyncState::Scanning, SyncState::AwaitingDeviceReady],
            "confirm the device",
        )?;
        debug!("Sync state: {} -> {}", self.state, SyncState::Updating);
        self.state = SyncState::Updating;
        Ok(())
    }

    /// Writes the document into the catalog in a single transaction
    ///
    /// Changes are committed only if every volume went through; any fatal
    /// error rolls the whole update back.
    pub async fn update(&mut self, store: &mut CatalogStore) -> SyncResult<&SyncReport> {
        self.expect_state(&[SyncState::Updating], "update the catalog")?;

        let result = match self.apply_updates(store).await {
            Ok(()) => store.disconnect().await.map_err(SyncError::from),
            Err(e) => {
                if store.is_connected() {
                    if let Err(abort) = store.abort().await {
                        warn!("Rolling back the catalog failed: {}", abort);
                    }
                }
                Err(e)
            }
        };

        self.settle(result, SyncState::Done)?;
        self.report.finished_at = Some(Local::now());
        Ok(&self.report)
    }

    async fn apply_updates(&mut self, store: &mut CatalogStore) -> SyncResult<()> {
        let Self {
            document,
            selected,
            report,
            layout,
            options,
            ..
        } = self;
        let doc = document.as_ref().ok_or(SyncError::InvalidState {
            operation: "update the catalog",
            state: SyncState::Idle,
        })?;

        store.connect().await?;
        let conn = store.connection()?;
        let series = doc.name.as_str();

        if options.mode == SyncMode::Series {
            let previous = delete_collection(conn, series).await?;
            create_collection(conn, series).await?;
            report.collection_replaced = true;
            info!("Replaced collection '{}' ({} previous members)", series, previous);
        }

        for (index, volume) in selected.iter() {
            let content_id = layout.content_id(&volume.file);

            let outcome = if content_exists(conn, &content_id).await? {
                info!("Treating {}", volume.file);
                let changes = mapping::content_edit(doc, *index, volume, options.mode)?;
                edit(conn, &content_id, &changes).await?;
                if options.mode == SyncMode::Series {
                    add_membership(conn, series, &content_id).await?;
                }
                VolumeOutcome::Updated
            } else {
                skip_volume(
                    *index,
                    AppError::RecordNotFound {
                        entity: "content".to_string(),
                        identifier: content_id.clone(),
                    },
                )?
            };

            if let Some(entry) = report.volume_mut(*index) {
                entry.update = Some(outcome);
            }
        }

        Ok(())
    }

    /// Runs every step in order
    pub async fn run(
        &mut self,
        copier: &dyn FileCopier,
        signal: &mut dyn DeviceReadySignal,
        store: &mut CatalogStore,
    ) -> SyncResult<SyncReport> {
        self.scan()?;
        self.copy(copier)?;

        info!("All files copied. Unplug the device, let it import them, then plug it back");
        let ready = signal.wait_until_ready();
        self.settle(ready, SyncState::AwaitingDeviceReady)?;
        self.confirm_device_ready()?;

        self.update(store).await.cloned()
    }
}

/// Logs a recoverable per-volume condition and returns its report outcome
///
/// Anything else is fatal and ends the run.
fn skip_volume(index: u32, condition: AppError) -> SyncResult<VolumeOutcome> {
    match VolumeOutcome::for_skip(&condition) {
        Some(outcome) if condition.is_recoverable() => {
            warn!("Skipping volume {}: {}", index, condition.user_message());
            Ok(outcome)
        }
        _ => Err(condition.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copier::FsCopier;
    use kobosync_library::save_document;
    use std::fs;
    use tempfile::TempDir;

    fn series_dir(dir: &TempDir) -> PathBuf {
        let source = dir.path().join("Oh-Roh");
        fs::create_dir_all(&source).unwrap();

        let mut doc = MetadataDocument::new("Oh-Roh");
        doc.volumes
            .insert(1, VolumeRecord::new("Oh-Roh", "Oh-Roh.cbz").with_date("12-1989"));
        doc.volumes
            .insert(2, VolumeRecord::new("Oh-Roh-Den", "Oh-Roh-Den.cbz").with_date("TODO"));
        save_document(&doc, &metadata_path(&source, DEFAULT_METADATA_FILE)).unwrap();

        fs::write(source.join("Oh-Roh.cbz"), b"PK").unwrap();
        source
    }

    #[test]
    fn test_steps_must_run_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let source = series_dir(&temp_dir);
        let layout = DeviceLayout::new(temp_dir.path().join("device"));
        let mut sync = SyncOrchestrator::new(source, layout, SyncOptions::default());

        let err = sync.copy(&FsCopier).unwrap_err();
        assert!(matches!(err, SyncError::InvalidState { state: SyncState::Idle, .. }));
        assert!(sync.confirm_device_ready().is_err());
        assert_eq!(sync.state(), SyncState::Idle);

        sync.scan().unwrap();
        assert_eq!(sync.state(), SyncState::Scanning);
        assert!(sync.scan().is_err());

        sync.copy(&FsCopier).unwrap();
        assert_eq!(sync.state(), SyncState::AwaitingDeviceReady);
        assert_eq!(
            sync.report().volume(2).and_then(|v| v.copy),
            Some(VolumeOutcome::SourceMissing)
        );

        sync.confirm_device_ready().unwrap();
        assert_eq!(sync.state(), SyncState::Updating);
    }

    #[test]
    fn test_unknown_volume_fails_scan() {
        let temp_dir = TempDir::new().unwrap();
        let source = series_dir(&temp_dir);
        let layout = DeviceLayout::new(temp_dir.path().join("device"));
        let options = SyncOptions::default().with_volumes([1, 7]);
        let mut sync = SyncOrchestrator::new(source, layout, options);

        let err = sync.scan().unwrap_err();
        assert!(matches!(err.app_error(), Some(AppError::KeyNotFound { path }) if path == "vol.7"));
        assert_eq!(sync.state(), SyncState::Failed);
        assert!(sync.copy(&FsCopier).is_err());
    }

    #[test]
    fn test_malformed_date_fails_before_copy() {
        let temp_dir = TempDir::new().unwrap();
        let source = series_dir(&temp_dir);
        let path = metadata_path(&source, DEFAULT_METADATA_FILE);
        let text = fs::read_to_string(&path).unwrap().replace("12-1989", "1989");
        fs::write(&path, text).unwrap();

        let layout = DeviceLayout::new(temp_dir.path().join("device"));
        let mut sync = SyncOrchestrator::new(source, layout.clone(), SyncOptions::default());

        let err = sync.scan().unwrap_err();
        assert!(matches!(err.app_error(), Some(AppError::Schema { .. })));
        assert!(!layout.books_path().exists());
    }

    #[test]
    fn test_oneshot_selects_first_volume() {
        let temp_dir = TempDir::new().unwrap();
        let source = series_dir(&temp_dir);
        let layout = DeviceLayout::new(temp_dir.path().join("device"));
        let mut sync =
            SyncOrchestrator::new(source, layout, SyncOptions::new(SyncMode::Oneshot));

        sync.scan().unwrap();
        assert_eq!(sync.selected_volumes(), vec![1]);
        assert_eq!(sync.report().mode, SyncMode::Oneshot);
    }

    #[test]
    fn test_skip_volume_only_absorbs_per_volume_conditions() {
        let exists = AppError::AlreadyExists {
            path: PathBuf::from("Oh-Roh.cbz"),
        };
        assert_eq!(skip_volume(1, exists).unwrap(), VolumeOutcome::AlreadyOnDevice);

        let unindexed = AppError::RecordNotFound {
            entity: "content".to_string(),
            identifier: "file:///mnt/onboard/Mangas/Oh-Roh.cbz".to_string(),
        };
        assert_eq!(skip_volume(1, unindexed).unwrap(), VolumeOutcome::NotInCatalog);

        let err = skip_volume(1, AppError::NotConnected).unwrap_err();
        assert!(matches!(err.app_error(), Some(AppError::NotConnected)));
    }
}
