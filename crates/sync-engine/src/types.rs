//! Sync options, device layout and run report

use chrono::{DateTime, Local};
use kobosync_config::{ConfigResult, DeviceConfig};
use kobosync_core::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Scanning,
    Copying,
    AwaitingDeviceReady,
    Updating,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Copying => "copying",
            Self::AwaitingDeviceReady => "awaiting device",
            Self::Updating => "updating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How a series maps onto catalog records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Every volume is a numbered member of a series collection
    #[default]
    Series,
    /// A single standalone book: titled after the series, no series columns, no collection
    Oneshot,
}

/// Caller choices for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Volume indices to sync; every volume when `None`
    pub volumes: Option<BTreeSet<u32>>,
}

impl SyncOptions {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            volumes: None,
        }
    }

    /// Restricts the run to the given volume indices
    pub fn with_volumes(mut self, volumes: impl IntoIterator<Item = u32>) -> Self {
        self.volumes = Some(volumes.into_iter().collect());
        self
    }
}

/// Where things live on a mounted device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    /// Mount point of the device on the host
    pub mount: PathBuf,
    /// Directory under the mount that receives the archives
    pub books_dir: String,
    /// Prefix of content identifiers, as seen by the device
    pub onboard_root: String,
    /// Catalog path relative to the mount
    pub database_file: PathBuf,
}

impl DeviceLayout {
    /// Creates a layout with the stock directory names under `mount`
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        let defaults = DeviceConfig::default();
        Self {
            mount: mount.into(),
            books_dir: defaults.books_dir,
            onboard_root: defaults.onboard_root,
            database_file: defaults.database_file,
        }
    }

    /// Resolves the mount point and directory names from configuration
    pub fn from_config(config: &DeviceConfig) -> ConfigResult<Self> {
        Ok(Self {
            mount: config.mount_point()?,
            books_dir: config.books_dir.clone(),
            onboard_root: config.onboard_root.clone(),
            database_file: config.database_file.clone(),
        })
    }

    /// Directory on the host that receives the archives
    pub fn books_path(&self) -> PathBuf {
        self.mount.join(&self.books_dir)
    }

    /// Host path of a volume file once copied
    pub fn destination(&self, file: &str) -> PathBuf {
        self.books_path().join(file)
    }

    /// Catalog identifier the device assigns to a copied file
    pub fn content_id(&self, file: &str) -> String {
        format!(
            "{}/{}/{}",
            self.onboard_root.trim_end_matches('/'),
            self.books_dir,
            file
        )
    }

    /// Host path of the catalog database
    pub fn database_path(&self) -> PathBuf {
        self.mount.join(&self.database_file)
    }

    pub fn mount(&self) -> &Path {
        &self.mount
    }
}

/// What happened to one volume in one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeOutcome {
    Copied,
    AlreadyOnDevice,
    SourceMissing,
    Updated,
    NotInCatalog,
}

impl VolumeOutcome {
    /// Report outcome for a per-volume condition that skips the volume
    pub fn for_skip(condition: &AppError) -> Option<Self> {
        match condition {
            AppError::AlreadyExists { .. } => Some(Self::AlreadyOnDevice),
            AppError::SourceMissing { .. } => Some(Self::SourceMissing),
            AppError::RecordNotFound { .. } => Some(Self::NotInCatalog),
            _ => None,
        }
    }
}

impl fmt::Display for VolumeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Copied => "copied",
            Self::AlreadyOnDevice => "already on device",
            Self::SourceMissing => "source missing",
            Self::Updated => "updated",
            Self::NotInCatalog => "not in catalog",
        };
        f.write_str(label)
    }
}

/// Per-volume line of a [`SyncReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeReport {
    pub index: u32,
    pub file: String,
    pub content_id: String,
    pub copy: Option<VolumeOutcome>,
    pub update: Option<VolumeOutcome>,
}

/// Summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub series: String,
    pub mode: SyncMode,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub volumes: Vec<VolumeReport>,
    /// The series collection was deleted and recreated
    pub collection_replaced: bool,
}

impl SyncReport {
    pub fn new(series: impl Into<String>, mode: SyncMode) -> Self {
        Self {
            series: series.into(),
            mode,
            started_at: Local::now(),
            finished_at: None,
            volumes: Vec::new(),
            collection_replaced: false,
        }
    }

    /// Number of volumes with this outcome in either phase
    pub fn count(&self, outcome: VolumeOutcome) -> usize {
        self.volumes
            .iter()
            .filter(|v| v.copy == Some(outcome) || v.update == Some(outcome))
            .count()
    }

    pub fn volume(&self, index: u32) -> Option<&VolumeReport> {
        self.volumes.iter().find(|v| v.index == index)
    }

    pub(crate) fn volume_mut(&mut self, index: u32) -> Option<&mut VolumeReport> {
        self.volumes.iter_mut().find(|v| v.index == index)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_matches_device_layout() {
        let layout = DeviceLayout::new("/media/reader/KOBOeReader");

        assert_eq!(
            layout.content_id("Oh-Roh.cbz"),
            "file:///mnt/onboard/Mangas/Oh-Roh.cbz"
        );
        assert_eq!(
            layout.destination("Oh-Roh.cbz"),
            PathBuf::from("/media/reader/KOBOeReader/Mangas/Oh-Roh.cbz")
        );
        assert_eq!(
            layout.database_path(),
            PathBuf::from("/media/reader/KOBOeReader/.kobo/KoboReader.sqlite")
        );
    }

    #[test]
    fn test_layout_from_config() {
        let config = DeviceConfig {
            user: Some("reader".to_string()),
            books_dir: "Comics".to_string(),
            onboard_root: "file:///mnt/onboard/".to_string(),
            ..Default::default()
        };

        let layout = DeviceLayout::from_config(&config).unwrap();
        assert_eq!(layout.mount, PathBuf::from("/media/reader/KOBOeReader"));
        assert_eq!(layout.content_id("a.cbz"), "file:///mnt/onboard/Comics/a.cbz");
    }

    #[test]
    fn test_report_counts_both_phases() {
        let mut report = SyncReport::new("Oh-Roh", SyncMode::Series);
        report.volumes.push(VolumeReport {
            index: 1,
            file: "a.cbz".into(),
            content_id: "x/a.cbz".into(),
            copy: Some(VolumeOutcome::Copied),
            update: Some(VolumeOutcome::Updated),
        });
        report.volumes.push(VolumeReport {
            index: 2,
            file: "b.cbz".into(),
            content_id: "x/b.cbz".into(),
            copy: Some(VolumeOutcome::AlreadyOnDevice),
            update: Some(VolumeOutcome::Updated),
        });

        assert_eq!(report.count(VolumeOutcome::Updated), 2);
        assert_eq!(report.count(VolumeOutcome::Copied), 1);
        assert_eq!(report.volume(2).map(|v| v.file.as_str()), Some("b.cbz"));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"already_on_device\""));
        assert!(json.contains("\"mode\": \"series\""));
    }

    #[test]
    fn test_options_volume_subset() {
        let options = SyncOptions::new(SyncMode::Series).with_volumes([3, 1, 3]);
        assert_eq!(options.volumes, Some(BTreeSet::from([1, 3])));
    }
}
