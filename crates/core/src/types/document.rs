//! Series metadata document
//!
//! A `MetadataDocument` describes one series: shared fields (author,
//! editor, synopsis...), an ordered map of volumes keyed by their positive
//! index, and optional credits. Fields are read and written either directly
//! or through dotted paths (see [`FieldPath`]).

use super::common::{is_todo, KoboTimestamp, Validator, TODO_SENTINEL};
use super::path::{CreditField, FieldPath, RootField, VolumeField};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// One installment of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub name: String,
    /// `DD-MM-YYYY` or `MM-YYYY`; `None` means unknown
    pub date: Option<String>,
    /// File name relative to the series directory
    pub file: String,
    pub original: Option<String>,
    pub romanized: Option<String>,
}

impl VolumeRecord {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: None,
            file: file.into(),
            original: None,
            romanized: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self
    }

    /// Returns a field value, `None` when absent
    pub fn field(&self, field: VolumeField) -> Option<&str> {
        match field {
            VolumeField::Name => Some(&self.name),
            VolumeField::Date => self.date.as_deref(),
            VolumeField::File => Some(&self.file),
            VolumeField::Original => self.original.as_deref(),
            VolumeField::Romanized => self.romanized.as_deref(),
        }
    }

    fn set_field(&mut self, field: VolumeField, value: Option<String>) {
        match field {
            VolumeField::Name => self.name = value.unwrap_or_default(),
            VolumeField::Date => self.date = value,
            VolumeField::File => self.file = value.unwrap_or_default(),
            VolumeField::Original => self.original = value,
            VolumeField::Romanized => self.romanized = value,
        }
    }
}

/// Who worked on which part of a series; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRecord {
    pub chapters: Option<String>,
    pub volumes: Option<String>,
    pub from: Option<String>,
    pub team: Option<String>,
    pub site: Option<String>,
    pub role: Option<String>,
    pub editor: Option<String>,
    pub cleaner: Option<String>,
    pub raw: Option<String>,
    pub translate: Option<String>,
}

impl CreditRecord {
    pub fn field(&self, field: CreditField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set_field(&mut self, field: CreditField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    /// Returns true if no field is set
    pub fn is_empty(&self) -> bool {
        CreditField::ALL.iter().all(|f| self.field(*f).is_none())
    }

    fn slot(&self, field: CreditField) -> &Option<String> {
        match field {
            CreditField::Chapters => &self.chapters,
            CreditField::Volumes => &self.volumes,
            CreditField::From => &self.from,
            CreditField::Team => &self.team,
            CreditField::Site => &self.site,
            CreditField::Role => &self.role,
            CreditField::Editor => &self.editor,
            CreditField::Cleaner => &self.cleaner,
            CreditField::Raw => &self.raw,
            CreditField::Translate => &self.translate,
        }
    }

    fn slot_mut(&mut self, field: CreditField) -> &mut Option<String> {
        match field {
            CreditField::Chapters => &mut self.chapters,
            CreditField::Volumes => &mut self.volumes,
            CreditField::From => &mut self.from,
            CreditField::Team => &mut self.team,
            CreditField::Site => &mut self.site,
            CreditField::Role => &mut self.role,
            CreditField::Editor => &mut self.editor,
            CreditField::Cleaner => &mut self.cleaner,
            CreditField::Raw => &mut self.raw,
            CreditField::Translate => &mut self.translate,
        }
    }
}

/// Value read from or written to a dotted path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Clears an optional field
    Unset,
    Text(String),
    Volume(VolumeRecord),
    Volumes(BTreeMap<u32, VolumeRecord>),
    Credits(Vec<CreditRecord>),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Unset => "nothing",
            Self::Text(_) => "text",
            Self::Volume(_) => "a volume",
            Self::Volumes(_) => "a volume map",
            Self::Credits(_) => "a credit list",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => Ok(()),
            Self::Text(text) => write!(f, "{}", text),
            Self::Volume(volume) => write!(f, "{} ({})", volume.name, volume.file),
            Self::Volumes(volumes) => {
                for (index, volume) in volumes {
                    writeln!(f, "{}: {} ({})", index, volume.name, volume.file)?;
                }
                Ok(())
            }
            Self::Credits(credits) => {
                for (position, credit) in credits.iter().enumerate() {
                    let parts: Vec<String> = CreditField::ALL
                        .iter()
                        .filter_map(|field| {
                            credit
                                .field(*field)
                                .map(|value| format!("{}={}", field.key(), value))
                        })
                        .collect();
                    writeln!(f, "{}: {}", position, parts.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Metadata for one series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Series title, never empty
    pub name: String,
    pub original: Option<String>,
    pub romanized: Option<String>,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub editor: Option<String>,
    pub language: Option<String>,
    pub synopsis: Option<String>,
    /// Empty when the document has no credit section
    pub credits: Vec<CreditRecord>,
    pub volumes: BTreeMap<u32, VolumeRecord>,
}

impl Default for MetadataDocument {
    fn default() -> Self {
        Self::new(TODO_SENTINEL)
    }
}

impl MetadataDocument {
    /// Creates a document with schema defaults: required fields hold the `TODO` placeholder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            original: None,
            romanized: None,
            author: Some(TODO_SENTINEL.to_string()),
            artist: None,
            editor: Some(TODO_SENTINEL.to_string()),
            language: Some(TODO_SENTINEL.to_string()),
            synopsis: Some(TODO_SENTINEL.to_string()),
            credits: Vec::new(),
            volumes: BTreeMap::new(),
        }
    }

    /// Returns a top-level text field, `None` when absent or not a text field
    pub fn text(&self, field: RootField) -> Option<&str> {
        match field {
            RootField::Name => Some(&self.name),
            RootField::Original => self.original.as_deref(),
            RootField::Romanized => self.romanized.as_deref(),
            RootField::Author => self.author.as_deref(),
            RootField::Artist => self.artist.as_deref(),
            RootField::Editor => self.editor.as_deref(),
            RootField::Language => self.language.as_deref(),
            RootField::Synopsis => self.synopsis.as_deref(),
            RootField::Credits | RootField::Volumes => None,
        }
    }

    fn text_slot_mut(&mut self, field: RootField) -> Option<&mut Option<String>> {
        match field {
            RootField::Original => Some(&mut self.original),
            RootField::Romanized => Some(&mut self.romanized),
            RootField::Author => Some(&mut self.author),
            RootField::Artist => Some(&mut self.artist),
            RootField::Editor => Some(&mut self.editor),
            RootField::Language => Some(&mut self.language),
            RootField::Synopsis => Some(&mut self.synopsis),
            RootField::Name | RootField::Credits | RootField::Volumes => None,
        }
    }

    /// Reads the value at a dotted path such as `vol.2.date`
    pub fn get(&self, path: &str) -> Result<FieldValue> {
        self.get_path(path.parse()?)
    }

    /// Writes the value at a dotted path
    ///
    /// Only top-level fields and whole volume entries can be created; every
    /// other path must already resolve to an existing volume or credit entry.
    pub fn set(&mut self, path: &str, value: impl Into<FieldValue>) -> Result<()> {
        self.set_path(path.parse()?, value.into())
    }

    pub fn get_path(&self, path: FieldPath) -> Result<FieldValue> {
        let not_found = || AppError::KeyNotFound {
            path: path.to_string(),
        };

        match path {
            FieldPath::Root(RootField::Volumes) => Ok(FieldValue::Volumes(self.volumes.clone())),
            FieldPath::Root(RootField::Credits) => {
                if self.credits.is_empty() {
                    Err(not_found())
                } else {
                    Ok(FieldValue::Credits(self.credits.clone()))
                }
            }
            FieldPath::Root(field) => self
                .text(field)
                .map(|text| FieldValue::Text(text.to_string()))
                .ok_or_else(not_found),
            FieldPath::Volume(index) => self
                .volumes
                .get(&index)
                .cloned()
                .map(FieldValue::Volume)
                .ok_or_else(not_found),
            FieldPath::VolumeField(index, field) => self
                .volumes
                .get(&index)
                .and_then(|volume| volume.field(field))
                .map(|text| FieldValue::Text(text.to_string()))
                .ok_or_else(not_found),
            FieldPath::Credit(position, field) => self
                .credits
                .get(position)
                .and_then(|credit| credit.field(field))
                .map(|text| FieldValue::Text(text.to_string()))
                .ok_or_else(not_found),
        }
    }

    pub fn set_path(&mut self, path: FieldPath, value: FieldValue) -> Result<()> {
        let mismatch = |value: &FieldValue, expected: &str| {
            AppError::schema(
                path.to_string(),
                format!("expected {}, got {}", expected, value.kind()),
            )
        };

        match (path, value) {
            (FieldPath::Root(RootField::Name), FieldValue::Text(name)) => {
                if name.trim().is_empty() {
                    return Err(AppError::schema("name", "must not be empty"));
                }
                self.name = name;
            }
            (FieldPath::Root(RootField::Name), other) => {
                return Err(mismatch(&other, "non-empty text"));
            }
            (FieldPath::Root(RootField::Volumes), FieldValue::Volumes(volumes)) => {
                check_volume_map(&volumes)?;
                self.volumes = volumes;
            }
            (FieldPath::Root(RootField::Volumes), FieldValue::Unset) => self.volumes.clear(),
            (FieldPath::Root(RootField::Credits), FieldValue::Credits(credits)) => {
                self.credits = credits;
            }
            (FieldPath::Root(RootField::Credits), FieldValue::Unset) => self.credits.clear(),
            (FieldPath::Root(field), value) => {
                let slot = match self.text_slot_mut(field) {
                    Some(slot) => slot,
                    None => return Err(mismatch(&value, "a volume map or credit list")),
                };
                match value {
                    FieldValue::Text(text) => *slot = Some(text),
                    FieldValue::Unset => *slot = None,
                    other => return Err(mismatch(&other, "text")),
                }
            }
            (FieldPath::Volume(index), FieldValue::Volume(volume)) => {
                if index == 0 {
                    return Err(AppError::schema(path.to_string(), "indices start at 1"));
                }
                self.check_file_unique(index, &volume.file)?;
                self.volumes.insert(index, volume);
            }
            (FieldPath::Volume(index), FieldValue::Unset) => {
                self.volumes.remove(&index).ok_or_else(|| AppError::KeyNotFound {
                    path: path.to_string(),
                })?;
            }
            (FieldPath::Volume(_), other) => return Err(mismatch(&other, "a volume")),
            (FieldPath::VolumeField(index, field), value) => {
                let text = match value {
                    FieldValue::Text(text) => Some(text),
                    FieldValue::Unset if field.is_required() => {
                        return Err(AppError::schema(path.to_string(), "field is required"));
                    }
                    FieldValue::Unset => None,
                    other => return Err(mismatch(&other, "text")),
                };
                if !self.volumes.contains_key(&index) {
                    return Err(AppError::KeyNotFound {
                        path: path.to_string(),
                    });
                }
                if let (VolumeField::File, Some(file)) = (field, text.as_deref()) {
                    self.check_file_unique(index, file)?;
                }
                if let Some(volume) = self.volumes.get_mut(&index) {
                    volume.set_field(field, text);
                }
            }
            (FieldPath::Credit(position, field), value) => {
                let text = match value {
                    FieldValue::Text(text) => Some(text),
                    FieldValue::Unset => None,
                    other => return Err(mismatch(&other, "text")),
                };
                let credit = self
                    .credits
                    .get_mut(position)
                    .ok_or_else(|| AppError::KeyNotFound {
                        path: path.to_string(),
                    })?;
                credit.set_field(field, text);
            }
        }

        Ok(())
    }

    /// Returns `author, artist`, or whichever of the two is present
    pub fn attribution(&self) -> Option<String> {
        match (self.author.as_deref(), self.artist.as_deref()) {
            (Some(author), Some(artist)) => Some(format!("{}, {}", author, artist)),
            (Some(author), None) => Some(author.to_string()),
            (None, Some(artist)) => Some(artist.to_string()),
            (None, None) => None,
        }
    }

    fn check_file_unique(&self, index: u32, file: &str) -> Result<()> {
        let clash = self
            .volumes
            .iter()
            .find(|(other, volume)| **other != index && volume.file == file);
        match clash {
            Some((other, _)) => Err(AppError::schema(
                format!("vol.{}.file", index),
                format!("'{}' is already used by volume {}", file, other),
            )),
            None => Ok(()),
        }
    }
}

fn check_volume_map(volumes: &BTreeMap<u32, VolumeRecord>) -> Result<()> {
    let mut seen: HashMap<&str, u32> = HashMap::new();
    for (index, volume) in volumes {
        if *index == 0 {
            return Err(AppError::schema("vol.0", "indices start at 1"));
        }
        if let Some(other) = seen.insert(volume.file.as_str(), *index) {
            return Err(AppError::schema(
                format!("vol.{}.file", index),
                format!("'{}' is already used by volume {}", volume.file, other),
            ));
        }
    }
    Ok(())
}

impl Validator for MetadataDocument {
    fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name: must not be empty".to_string());
        }

        let mut seen: HashMap<&str, u32> = HashMap::new();
        for (index, volume) in &self.volumes {
            if *index == 0 {
                errors.push("vol.0: indices start at 1".to_string());
            }
            if volume.name.trim().is_empty() {
                errors.push(format!("vol.{}.name: must not be empty", index));
            }
            if volume.file.trim().is_empty() {
                errors.push(format!("vol.{}.file: must not be empty", index));
            }
            if let Some(other) = seen.insert(volume.file.as_str(), *index) {
                errors.push(format!(
                    "vol.{}.file: '{}' is already used by volume {}",
                    index, volume.file, other
                ));
            }
            if let Some(date) = volume.date.as_deref().filter(|d| !is_todo(d)) {
                let field = format!("vol.{}.date", index);
                if let Err(err) = KoboTimestamp::from_volume_date(date, &field) {
                    errors.push(err.to_string());
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oh_roh() -> MetadataDocument {
        let mut doc = MetadataDocument::new("Oh-Roh");
        doc.author = Some("Buronson".to_string());
        doc.artist = Some("Kentarō Miura".to_string());
        doc.volumes.insert(
            1,
            VolumeRecord::new("Oh-Roh", "Oh-Roh.cbz")
                .with_date("12-1989")
                .with_original("王狼"),
        );
        doc.volumes.insert(
            2,
            VolumeRecord::new("Oh-Roh-Den", "Oh-Roh-Den.cbz").with_date("08-1990"),
        );
        doc
    }

    #[test]
    fn test_schema_defaults() {
        let doc = MetadataDocument::new("Berserk");
        assert_eq!(doc.name, "Berserk");
        assert_eq!(doc.author.as_deref(), Some(TODO_SENTINEL));
        assert_eq!(doc.editor.as_deref(), Some(TODO_SENTINEL));
        assert_eq!(doc.language.as_deref(), Some(TODO_SENTINEL));
        assert_eq!(doc.synopsis.as_deref(), Some(TODO_SENTINEL));
        assert!(doc.artist.is_none());
        assert!(doc.volumes.is_empty());
        assert!(doc.credits.is_empty());
    }

    #[test]
    fn test_get_top_level_and_nested() {
        let doc = oh_roh();
        assert_eq!(doc.get("author").unwrap(), FieldValue::from("Buronson"));
        assert_eq!(doc.get("vol.1.original").unwrap(), FieldValue::from("王狼"));
        assert_eq!(doc.get("vol.2.date").unwrap(), FieldValue::from("08-1990"));
        assert!(matches!(doc.get("vol.2").unwrap(), FieldValue::Volume(v) if v.file == "Oh-Roh-Den.cbz"));
    }

    #[test]
    fn test_get_absent_is_key_not_found() {
        let doc = oh_roh();
        for path in ["original", "vol.9", "vol.9.name", "vol.2.original", "credit", "credit.0.team"] {
            let err = doc.get(path).unwrap_err();
            assert!(matches!(err, AppError::KeyNotFound { .. }), "{}", path);
        }
    }

    #[test]
    fn test_set_top_level_creates_field() {
        let mut doc = oh_roh();
        doc.set("original", "王狼").unwrap();
        assert_eq!(doc.original.as_deref(), Some("王狼"));

        doc.set("artist", FieldValue::Unset).unwrap();
        assert!(doc.artist.is_none());
    }

    #[test]
    fn test_set_nested_requires_existing_parent() {
        let mut doc = oh_roh();
        doc.set("vol.2.original", "王狼伝").unwrap();
        assert_eq!(doc.volumes[&2].original.as_deref(), Some("王狼伝"));

        let err = doc.set("vol.7.date", "01-2001").unwrap_err();
        assert!(matches!(err, AppError::KeyNotFound { .. }));
        assert!(!doc.volumes.contains_key(&7));

        let err = doc.set("credit.0.team", "Scans").unwrap_err();
        assert!(matches!(err, AppError::KeyNotFound { .. }));
    }

    #[test]
    fn test_set_whole_volume() {
        let mut doc = oh_roh();
        doc.set("vol.3", FieldValue::Volume(VolumeRecord::new("Extra", "extra.cbz")))
            .unwrap();
        assert_eq!(doc.volumes.len(), 3);

        doc.set("vol.3", FieldValue::Unset).unwrap();
        assert_eq!(doc.volumes.len(), 2);
    }

    #[test]
    fn test_set_rejects_duplicate_file() {
        let mut doc = oh_roh();
        let err = doc.set("vol.2.file", "Oh-Roh.cbz").unwrap_err();
        assert!(matches!(err, AppError::Schema { .. }));

        let err = doc
            .set("vol.5", FieldValue::Volume(VolumeRecord::new("Dup", "Oh-Roh.cbz")))
            .unwrap_err();
        assert!(matches!(err, AppError::Schema { .. }));
    }

    #[test]
    fn test_set_rejects_empty_name_and_type_mismatch() {
        let mut doc = oh_roh();
        assert!(matches!(doc.set("name", ""), Err(AppError::Schema { .. })));
        assert!(matches!(
            doc.set("vol.1.file", FieldValue::Unset),
            Err(AppError::Schema { .. })
        ));
        assert!(matches!(
            doc.set("author", FieldValue::Volumes(BTreeMap::new())),
            Err(AppError::Schema { .. })
        ));
    }

    #[test]
    fn test_set_credit_field() {
        let mut doc = oh_roh();
        doc.credits.push(CreditRecord::default());
        doc.set("credit.0.team", "Scantrad").unwrap();
        assert_eq!(doc.credits[0].team.as_deref(), Some("Scantrad"));
        assert!(!doc.credits[0].is_empty());
    }

    #[test]
    fn test_attribution() {
        let mut doc = oh_roh();
        assert_eq!(doc.attribution().as_deref(), Some("Buronson, Kentarō Miura"));

        doc.artist = None;
        assert_eq!(doc.attribution().as_deref(), Some("Buronson"));

        doc.author = None;
        assert_eq!(doc.attribution(), None);
    }

    #[test]
    fn test_validate() {
        let mut doc = oh_roh();
        assert!(doc.is_valid());

        doc.volumes.get_mut(&2).unwrap().date = Some(TODO_SENTINEL.to_string());
        assert!(doc.is_valid());

        doc.volumes.get_mut(&2).unwrap().date = Some("1990".to_string());
        doc.volumes.get_mut(&2).unwrap().file = "Oh-Roh.cbz".to_string();
        let errors = doc.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
