//! Dotted field paths over a metadata document
//!
//! A path has one to three segments: `author`, `vol.3`, `vol.3.date`,
//! `credit.0.team`. Key spellings accepted by the loader are accepted here
//! too; paths always render back in canonical spelling.

use crate::error::AppError;
use std::fmt;
use std::str::FromStr;

/// Top-level document fields, in canonical write order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootField {
    Name,
    Original,
    Romanized,
    Author,
    Artist,
    Editor,
    Language,
    Synopsis,
    Credits,
    Volumes,
}

impl RootField {
    /// All fields in the order they are written
    pub const ALL: [RootField; 10] = [
        Self::Name,
        Self::Original,
        Self::Romanized,
        Self::Author,
        Self::Artist,
        Self::Editor,
        Self::Language,
        Self::Synopsis,
        Self::Credits,
        Self::Volumes,
    ];

    /// Canonical key written to the document
    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Original => "original",
            Self::Romanized => "romanized",
            Self::Author => "author",
            Self::Artist => "artist",
            Self::Editor => "editor",
            Self::Language => "lang",
            Self::Synopsis => "synopsis",
            Self::Credits => "credit",
            Self::Volumes => "vol",
        }
    }

    /// Resolves a canonical key or one of its legacy aliases
    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "name" => Self::Name,
            "original" | "original_title" => Self::Original,
            "romanized" | "romanji" | "romanized_title" => Self::Romanized,
            "author" => Self::Author,
            "artist" => Self::Artist,
            "editor" | "publisher" => Self::Editor,
            "lang" | "language" => Self::Language,
            "synopsis" => Self::Synopsis,
            "credit" | "credits" => Self::Credits,
            "vol" | "volumes" => Self::Volumes,
            _ => return None,
        };
        Some(field)
    }
}

/// Fields of a volume entry, in canonical write order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeField {
    Name,
    Date,
    File,
    Original,
    Romanized,
}

impl VolumeField {
    pub const ALL: [VolumeField; 5] = [
        Self::Name,
        Self::Date,
        Self::File,
        Self::Original,
        Self::Romanized,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Date => "date",
            Self::File => "file",
            Self::Original => "original",
            Self::Romanized => "romanized",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "name" => Self::Name,
            "date" => Self::Date,
            "file" => Self::File,
            "original" | "original_title" => Self::Original,
            "romanized" | "romanji" | "romanized_title" => Self::Romanized,
            _ => return None,
        };
        Some(field)
    }

    /// Name and file must always be present
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Name | Self::File)
    }
}

/// Fields of a credit entry, in canonical write order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreditField {
    Chapters,
    Volumes,
    From,
    Team,
    Site,
    Role,
    Editor,
    Cleaner,
    Raw,
    Translate,
}

impl CreditField {
    pub const ALL: [CreditField; 10] = [
        Self::Chapters,
        Self::Volumes,
        Self::From,
        Self::Team,
        Self::Site,
        Self::Role,
        Self::Editor,
        Self::Cleaner,
        Self::Raw,
        Self::Translate,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Chapters => "chapters",
            Self::Volumes => "volumes",
            Self::From => "from",
            Self::Team => "team",
            Self::Site => "site",
            Self::Role => "role",
            Self::Editor => "editor",
            Self::Cleaner => "cleaner",
            Self::Raw => "raw",
            Self::Translate => "translate",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "chapters" | "chap" => Self::Chapters,
            "volumes" | "vols" => Self::Volumes,
            "from" => Self::From,
            "team" => Self::Team,
            "site" => Self::Site,
            "role" => Self::Role,
            "editor" => Self::Editor,
            "cleaner" => Self::Cleaner,
            "raw" => Self::Raw,
            "translate" => Self::Translate,
            _ => return None,
        };
        Some(field)
    }
}

/// A resolved dotted path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    /// A top-level field
    Root(RootField),
    /// A whole volume entry, `vol.<index>`
    Volume(u32),
    /// A field of a volume entry, `vol.<index>.<field>`
    VolumeField(u32, VolumeField),
    /// A field of a credit entry, `credit.<position>.<field>`
    Credit(usize, CreditField),
}

impl FromStr for FieldPath {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let not_found = || AppError::KeyNotFound {
            path: s.to_string(),
        };

        let segments: Vec<&str> = s.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) || segments.len() > 3 {
            return Err(AppError::InvalidArgument {
                argument: s.to_string(),
                reason: "expected 1 to 3 non-empty segments separated by '.'".to_string(),
            });
        }

        let root = RootField::from_key(segments[0]).ok_or_else(not_found)?;
        match (root, &segments[1..]) {
            (root, []) => Ok(Self::Root(root)),
            (RootField::Volumes, [index]) => {
                let index = index.parse().map_err(|_| not_found())?;
                Ok(Self::Volume(index))
            }
            (RootField::Volumes, [index, field]) => {
                let index = index.parse().map_err(|_| not_found())?;
                let field = VolumeField::from_key(field).ok_or_else(not_found)?;
                Ok(Self::VolumeField(index, field))
            }
            (RootField::Credits, [position, field]) => {
                let position = position.parse().map_err(|_| not_found())?;
                let field = CreditField::from_key(field).ok_or_else(not_found)?;
                Ok(Self::Credit(position, field))
            }
            _ => Err(not_found()),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(field) => write!(f, "{}", field.key()),
            Self::Volume(index) => write!(f, "{}.{}", RootField::Volumes.key(), index),
            Self::VolumeField(index, field) => {
                write!(f, "{}.{}.{}", RootField::Volumes.key(), index, field.key())
            }
            Self::Credit(position, field) => {
                write!(f, "{}.{}.{}", RootField::Credits.key(), position, field.key())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root() {
        assert_eq!(
            "author".parse::<FieldPath>().unwrap(),
            FieldPath::Root(RootField::Author)
        );
        assert_eq!(
            "publisher".parse::<FieldPath>().unwrap(),
            FieldPath::Root(RootField::Editor)
        );
    }

    #[test]
    fn test_parse_volume_paths() {
        assert_eq!("vol.3".parse::<FieldPath>().unwrap(), FieldPath::Volume(3));
        assert_eq!(
            "volumes.3.date".parse::<FieldPath>().unwrap(),
            FieldPath::VolumeField(3, VolumeField::Date)
        );
        assert_eq!(
            "vol.1.romanji".parse::<FieldPath>().unwrap(),
            FieldPath::VolumeField(1, VolumeField::Romanized)
        );
    }

    #[test]
    fn test_parse_credit_path() {
        assert_eq!(
            "credit.0.team".parse::<FieldPath>().unwrap(),
            FieldPath::Credit(0, CreditField::Team)
        );
    }

    #[test]
    fn test_unknown_keys_are_not_found() {
        for path in ["colour", "vol.x", "vol.1.colour", "author.first", "credit.0"] {
            let err = path.parse::<FieldPath>().unwrap_err();
            assert!(matches!(err, AppError::KeyNotFound { .. }), "{}", path);
        }
    }

    #[test]
    fn test_malformed_paths_are_rejected() {
        for path in ["", "vol..date", "vol.1.date.extra"] {
            let err = path.parse::<FieldPath>().unwrap_err();
            assert!(matches!(err, AppError::InvalidArgument { .. }), "{}", path);
        }
    }

    #[test]
    fn test_display_is_canonical() {
        let path: FieldPath = "volumes.2.original_title".parse().unwrap();
        assert_eq!(path.to_string(), "vol.2.original");

        let path: FieldPath = "language".parse().unwrap();
        assert_eq!(path.to_string(), "lang");
    }

    #[test]
    fn test_canonical_order() {
        let keys: Vec<&str> = RootField::ALL.iter().map(|f| f.key()).collect();
        assert_eq!(
            keys,
            vec![
                "name", "original", "romanized", "author", "artist", "editor", "lang",
                "synopsis", "credit", "vol"
            ]
        );
    }
}
