//! Metadata document to catalog field mapping
//!
//! Fields still holding the `TODO` placeholder are never written to the
//! catalog; a volume date of `TODO` leaves `DateCreated` untouched.

use crate::types::SyncMode;
use kobosync_core::types::{is_todo, KoboTimestamp, MetadataDocument, VolumeRecord};
use kobosync_core::AppError;
use kobosync_database::queries::{ContentEdit, SeriesSlot};
use log::warn;

const DESCRIPTION_OPEN: &str = "<div style=\"text-align: justify;\">";
const DESCRIPTION_CLOSE: &str = "</div>";

/// Appends ` (original)` to a title when an original title is known
pub fn compose_title(name: &str, original: Option<&str>) -> String {
    match original.filter(|o| !o.trim().is_empty() && !is_todo(o)) {
        Some(original) => format!("{} ({})", name, original),
        None => name.to_string(),
    }
}

/// Wraps a synopsis in the justified block the device renders
pub fn wrap_description(synopsis: &str) -> String {
    format!("{}{}{}", DESCRIPTION_OPEN, synopsis, DESCRIPTION_CLOSE)
}

/// Title written for a volume in the given mode
pub fn volume_title(doc: &MetadataDocument, volume: &VolumeRecord, mode: SyncMode) -> String {
    match mode {
        SyncMode::Series => compose_title(&volume.name, volume.original.as_deref()),
        SyncMode::Oneshot => compose_title(&doc.name, doc.original.as_deref()),
    }
}

/// Parses a volume date, treating the placeholder as absent
pub fn volume_date(index: u32, volume: &VolumeRecord) -> Result<Option<KoboTimestamp>, AppError> {
    match volume.date.as_deref() {
        None => Ok(None),
        Some(raw) if is_todo(raw) => Ok(None),
        Some(raw) => KoboTimestamp::from_volume_date(raw, &format!("vol.{}.date", index)).map(Some),
    }
}

fn known(value: Option<&str>, field: &str, title: &str) -> Option<String> {
    match value {
        Some(v) if is_todo(v) => {
            warn!("'{}' is still TODO, not writing it for {}", field, title);
            None
        }
        Some(v) => Some(v.to_string()),
        None => None,
    }
}

/// Builds the catalog update for one volume
pub fn content_edit(
    doc: &MetadataDocument,
    index: u32,
    volume: &VolumeRecord,
    mode: SyncMode,
) -> Result<ContentEdit, AppError> {
    let title = volume_title(doc, volume, mode);

    let attribution = [
        known(doc.author.as_deref(), "author", &title),
        known(doc.artist.as_deref(), "artist", &title),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

    let date_created = volume_date(index, volume)?;
    if date_created.is_none() && volume.date.as_deref().is_some_and(is_todo) {
        warn!("Date of volume {} is still TODO, leaving it unchanged", index);
    }

    Ok(ContentEdit {
        attribution: (!attribution.is_empty()).then(|| attribution.join(", ")),
        publisher: known(doc.editor.as_deref(), "editor", &title),
        language: known(doc.language.as_deref(), "lang", &title),
        description: known(doc.synopsis.as_deref(), "synopsis", &title)
            .map(|s| wrap_description(&s)),
        date_created,
        series: match mode {
            SyncMode::Series => Some(SeriesSlot::new(doc.name.clone(), index)),
            SyncMode::Oneshot => None,
        },
        title: Some(title),
    })
}
