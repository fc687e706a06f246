//! Series to device synchronization
//!
//! Copies the volumes of a series directory onto a mounted e-reader and
//! rewrites their catalog records (title, authors, publisher, language,
//! description, date, series numbering) from the series metadata, then
//! rebuilds the series collection.
//!
//! # Example
//!
//! ```rust,no_run
//! use kobosync_sync_engine::{DeviceLayout, FsCopier, SyncOptions, SyncOrchestrator, SyncResult};
//!
//! # async fn demo() -> SyncResult<()> {
//! let layout = DeviceLayout::new("/media/reader/KOBOeReader");
//! let mut sync = SyncOrchestrator::new("Oh-Roh", layout, SyncOptions::default());
//! let mut store = sync.catalog();
//!
//! let mut ready = || -> SyncResult<()> { Ok(()) };
//! let report = sync.run(&FsCopier, &mut ready, &mut store).await?;
//! println!("{} volumes updated", report.volumes.len());
//! # Ok(())
//! # }
//! ```

mod copier;
mod engine;
mod error;
pub mod mapping;
mod types;

pub use copier::{CopyOutcome, FileCopier, FsCopier};
pub use engine::{DeviceReadySignal, SyncOrchestrator};
pub use error::{SyncError, SyncResult};
pub use types::{
    DeviceLayout, SyncMode, SyncOptions, SyncReport, SyncState, VolumeOutcome, VolumeReport,
};
