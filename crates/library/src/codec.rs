//! Metadata document text format
//!
//! The writer is hand-rolled so that field order and layout stay fixed:
//!
//! ```text
//! --- # Oh-Roh Metadata
//! name:
//!     Oh-Roh
//! author:
//!     Buronson
//! synopsis: |-
//!     First paragraph.
//!
//!     Second paragraph.
//! vol:
//!     1:
//!         name:   Oh-Roh
//!         date:   12-1989
//!         file:   Oh-Roh.cbz
//! ```
//!
//! The reader parses with `serde_yaml` and merges the top-level keys onto
//! the document defaults.

use kobosync_core::error::{AppError, Result};
use kobosync_core::types::{
    CreditField, CreditRecord, FieldPath, FieldValue, MetadataDocument, RootField, VolumeField,
    VolumeRecord,
};
use log::warn;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

const INDENT: &str = "    ";

/// How a field is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    /// Key alone on its line, value one level deeper on the next
    Block,
    /// `key:   value`
    Oneliner,
    /// `key: |-` followed by the text, line breaks kept
    Literal,
}

/// Renders a document in the metadata text format
pub fn render(doc: &MetadataDocument) -> String {
    let title: String = doc
        .name
        .chars()
        .map(|c| if is_printable(c) { c } else { ' ' })
        .collect();
    let mut out = format!("--- # {} Metadata\n", title);

    for field in RootField::ALL {
        match field {
            RootField::Credits => {
                if doc.credits.is_empty() {
                    continue;
                }
                push_header(&mut out, field.key(), 0);
                for credit in &doc.credits {
                    out.push_str(INDENT);
                    out.push_str("-\n");
                    for credit_field in CreditField::ALL {
                        if let Some(value) = credit.field(credit_field) {
                            push_field(&mut out, credit_field.key(), value, 2, Style::Oneliner);
                        }
                    }
                }
            }
            RootField::Volumes => {
                push_header(&mut out, field.key(), 0);
                for (index, volume) in &doc.volumes {
                    push_header(&mut out, &index.to_string(), 1);
                    for volume_field in VolumeField::ALL {
                        if let Some(value) = volume.field(volume_field) {
                            push_field(&mut out, volume_field.key(), value, 2, Style::Oneliner);
                        }
                    }
                }
            }
            RootField::Synopsis => {
                if let Some(value) = doc.text(field) {
                    push_field(&mut out, field.key(), value, 0, Style::Literal);
                }
            }
            _ => {
                if let Some(value) = doc.text(field) {
                    push_field(&mut out, field.key(), value, 0, Style::Block);
                }
            }
        }
    }

    out
}

fn push_header(out: &mut String, key: &str, depth: usize) {
    out.push_str(&INDENT.repeat(depth));
    out.push_str(key);
    out.push_str(":\n");
}

fn push_field(out: &mut String, key: &str, value: &str, depth: usize, style: Style) {
    let indent = INDENT.repeat(depth);
    let value = value.trim_end_matches([' ', '\n', '\r']);

    match style {
        Style::Oneliner => {
            out.push_str(&format!("{}{}:   {}\n", indent, key, scalar(value)));
        }
        Style::Block => {
            push_header(out, key, depth);
            out.push_str(&format!("{}{}{}\n", indent, INDENT, scalar(value)));
        }
        Style::Literal if !fits_literal_block(value) => {
            push_header(out, key, depth);
            out.push_str(&format!("{}{}{}\n", indent, INDENT, scalar(value)));
        }
        Style::Literal => {
            let content_indent = format!("{}{}", indent, INDENT);
            let marker = if needs_indent_indicator(value) {
                format!("|{}-", INDENT.len())
            } else {
                "|-".to_string()
            };
            out.push_str(&format!("{}{}: {}\n", indent, key, marker));
            for line in value.split('\n') {
                // Blank lines stay empty; the reader drops their indentation anyway
                if !line.is_empty() {
                    out.push_str(&content_indent);
                    out.push_str(line);
                }
                out.push('\n');
            }
        }
    }
}

/// Returns the scalar as written: plain when the reader gives it back unchanged, double-quoted otherwise
fn scalar(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }

    let reads_back = value.chars().all(is_printable)
        && matches!(
            serde_yaml::from_str::<Value>(value),
            Ok(Value::String(ref parsed)) if parsed == value
        );

    if reads_back {
        value.to_string()
    } else {
        double_quoted(value)
    }
}

/// Characters the reader accepts verbatim inside a line
///
/// Tabs, line breaks (including NEL, LS and PS), controls, surrogates and the
/// byte order mark are all excluded.
fn is_printable(c: char) -> bool {
    matches!(c,
        ' '..='~'
        | '\u{A0}'..='\u{2027}'
        | '\u{202A}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FEFE}'
        | '\u{FF00}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// A literal block keeps its text only when every line survives unescaped
fn fits_literal_block(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c == '\n' || is_printable(c))
}

/// Double-quoted scalar with every non-printable character escaped
fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{B}' => out.push_str("\\v"),
            '\u{C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '\u{1B}' => out.push_str("\\e"),
            '\u{85}' => out.push_str("\\N"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            c if is_printable(c) => out.push(c),
            c => {
                let code = u32::from(c);
                if code <= 0xFF {
                    out.push_str(&format!("\\x{:02X}", code));
                } else if code <= 0xFFFF {
                    out.push_str(&format!("\\u{:04X}", code));
                } else {
                    out.push_str(&format!("\\U{:08X}", code));
                }
            }
        }
    }
    out.push('"');
    out
}

/// Literal blocks detect their indentation from the first non-blank line
fn needs_indent_indicator(value: &str) -> bool {
    value
        .split('\n')
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| line.starts_with(' '))
        || value
            .split('\n')
            .take_while(|line| line.trim().is_empty())
            .any(|line| !line.is_empty())
}

/// Parses a document; `origin` is only used in error messages
pub fn parse(text: &str, origin: &Path) -> Result<MetadataDocument> {
    let format_error = |reason: String| AppError::DocumentFormat {
        path: origin.to_path_buf(),
        reason,
    };

    let value: Value = serde_yaml::from_str(text).map_err(|e| format_error(e.to_string()))?;
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Err(format_error("document is empty".to_string())),
        _ => return Err(format_error("top level is not a mapping".to_string())),
    };

    let mut doc = MetadataDocument::default();
    let mut has_name = false;

    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            warn!("Ignoring non-text key {:?} in {}", key, origin.display());
            continue;
        };
        let Some(field) = RootField::from_key(key) else {
            warn!("Ignoring unknown key '{}' in {}", key, origin.display());
            continue;
        };

        let new_value = match field {
            RootField::Volumes => FieldValue::Volumes(parse_volumes(value)?),
            RootField::Credits => FieldValue::Credits(parse_credits(value)?),
            RootField::Name => {
                has_name = true;
                text_value(value, field.key())?.map_or(FieldValue::Unset, FieldValue::Text)
            }
            _ => text_value(value, field.key())?.map_or(FieldValue::Unset, FieldValue::Text),
        };
        doc.set_path(FieldPath::Root(field), new_value)?;
    }

    if !has_name {
        return Err(AppError::schema("name", "field is required"));
    }

    Ok(doc)
}

/// Coerces a scalar to text; null means absent
fn text_value(value: Value, field: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Tagged(tagged) => text_value(tagged.value, field),
        Value::Sequence(_) | Value::Mapping(_) => {
            Err(AppError::schema(field, "expected a single value"))
        }
    }
}

fn parse_volumes(value: Value) -> Result<BTreeMap<u32, VolumeRecord>> {
    let mapping = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Mapping(mapping) => mapping,
        _ => return Err(AppError::schema("vol", "expected a mapping of index to volume")),
    };

    let mut volumes = BTreeMap::new();
    for (key, value) in mapping {
        let index = volume_index(&key)?;
        let volume = parse_volume(index, value)?;
        volumes.insert(index, volume);
    }
    Ok(volumes)
}

fn volume_index(key: &Value) -> Result<u32> {
    let index = match key {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    index
        .filter(|index| *index > 0)
        .ok_or_else(|| AppError::schema("vol", format!("{:?} is not a positive index", key)))
}

fn parse_volume(index: u32, value: Value) -> Result<VolumeRecord> {
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(AppError::schema(
                format!("vol.{}", index),
                "expected a mapping of volume fields",
            ))
        }
    };

    let mut fields: BTreeMap<&'static str, String> = BTreeMap::new();
    for (key, value) in mapping {
        let Some(field) = key.as_str().and_then(VolumeField::from_key) else {
            warn!("Ignoring unknown key {:?} in vol.{}", key, index);
            continue;
        };
        let path = FieldPath::VolumeField(index, field).to_string();
        if let Some(text) = text_value(value, &path)? {
            fields.insert(field.key(), text);
        }
    }

    let mut take_required = |field: VolumeField| {
        fields.remove(field.key()).ok_or_else(|| {
            AppError::schema(
                FieldPath::VolumeField(index, field).to_string(),
                "field is required",
            )
        })
    };
    let name = take_required(VolumeField::Name)?;
    let file = take_required(VolumeField::File)?;

    Ok(VolumeRecord {
        name,
        file,
        date: fields.remove(VolumeField::Date.key()),
        original: fields.remove(VolumeField::Original.key()),
        romanized: fields.remove(VolumeField::Romanized.key()),
    })
}

fn parse_credits(value: Value) -> Result<Vec<CreditRecord>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items,
        _ => return Err(AppError::schema("credit", "expected a list of credits")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| parse_credit(position, item))
        .collect()
}

fn parse_credit(position: usize, item: Value) -> Result<CreditRecord> {
    let mut credit = CreditRecord::default();
    let mapping = match item {
        Value::Null => return Ok(credit),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(AppError::schema(
                format!("credit.{}", position),
                "expected a mapping of credit fields",
            ))
        }
    };

    for (key, value) in mapping {
        let Some(field) = key.as_str().and_then(CreditField::from_key) else {
            warn!("Ignoring unknown key {:?} in credit.{}", key, position);
            continue;
        };
        let path = FieldPath::Credit(position, field).to_string();
        credit.set_field(field, text_value(value, &path)?);
    }

    Ok(credit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kobosync_core::types::TODO_SENTINEL;

    fn origin() -> &'static Path {
        Path::new(".metadata.yaml")
    }

    fn oh_roh() -> MetadataDocument {
        let mut doc = MetadataDocument::new("Oh-Roh");
        doc.original = Some("王狼".to_string());
        doc.author = Some("Buronson".to_string());
        doc.artist = Some("Kentarō Miura".to_string());
        doc.editor = Some("Hakusensha".to_string());
        doc.language = Some("en".to_string());
        doc.synopsis = Some("Super synopsis.".to_string());
        doc.volumes.insert(
            1,
            VolumeRecord::new("Oh-Roh", "Oh-Roh.cbz")
                .with_date("12-1989")
                .with_original("王狼"),
        );
        doc.volumes.insert(
            2,
            VolumeRecord::new("Oh-Roh-Den", "Oh-Roh-Den.cbz")
                .with_date("08-1990")
                .with_original("王狼伝"),
        );
        doc
    }

    #[test]
    fn test_render_layout() {
        let expected = "\
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
synopsis: |-
    Super synopsis.
vol:
    1:
        name:   Oh-Roh
        date:   12-1989
        file:   Oh-Roh.cbz
        original:   王狼
    2:
        name:   Oh-Roh-Den
        date:   08-1990
        file:   Oh-Roh-Den.cbz
        original:   王狼伝
";
        assert_eq!(render(&oh_roh()), expected);
    }

    #[test]
    fn test_absent_fields_are_skipped() {
        let mut doc = oh_roh();
        doc.artist = None;
        let text = render(&doc);
        assert!(!text.contains("artist:"));
        assert!(!text.contains("credit:"));
    }

    #[test]
    fn test_volumes_written_in_ascending_order() {
        let mut doc = MetadataDocument::new("Gaps");
        doc.volumes.insert(10, VolumeRecord::new("Ten", "10.cbz"));
        doc.volumes.insert(2, VolumeRecord::new("Two", "2.cbz"));
        let text = render(&doc);
        let two = text.find("    2:\n").unwrap();
        let ten = text.find("    10:\n").unwrap();
        assert!(two < ten);
    }

    #[test]
    fn test_empty_volume_map_still_writes_header() {
        let text = render(&MetadataDocument::new("Empty"));
        assert!(text.ends_with("vol:\n"));
        let doc = parse(&text, origin()).unwrap();
        assert!(doc.volumes.is_empty());
    }

    #[test]
    fn test_synopsis_blank_lines_and_trailing_whitespace() {
        let mut doc = oh_roh();
        doc.synopsis = Some("First.\n\nSecond.  \n\n".to_string());
        let text = render(&doc);
        assert!(text.contains("synopsis: |-\n    First.\n\n    Second.\nvol:"));

        let loaded = parse(&text, origin()).unwrap();
        assert_eq!(loaded.synopsis.as_deref(), Some("First.\n\nSecond."));
    }

    #[test]
    fn test_synopsis_leading_space_gets_indicator() {
        let mut doc = oh_roh();
        doc.synopsis = Some("  indented start\nnext".to_string());
        let text = render(&doc);
        assert!(text.contains("synopsis: |4-\n"));
        let loaded = parse(&text, origin()).unwrap();
        assert_eq!(loaded.synopsis, doc.synopsis);
    }

    #[test]
    fn test_ambiguous_scalars_are_quoted() {
        let mut doc = oh_roh();
        doc.editor = Some("yes: really".to_string());
        doc.language = Some("42".to_string());
        doc.artist = Some("# not a comment".to_string());
        doc.volumes.get_mut(&1).unwrap().name = "null".to_string();

        let text = render(&doc);
        assert!(text.contains("    \"yes: really\"\n"));
        assert!(text.contains("    \"42\"\n"));

        let loaded = parse(&text, origin()).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_line_breaks_and_controls_survive_round_trip() {
        let awkward = [
            "First\u{2028}Second",
            "x\u{2029}y",
            "x\u{85}y",
            "a\u{7f}b",
            "a\r\nb",
            "tab\there",
            "bell\u{7}\u{1b}[0m",
            "\u{feff}bom",
            "quote \" and \\ slash",
        ];

        for text in awkward {
            let mut doc = oh_roh();
            doc.author = Some(text.to_string());
            doc.synopsis = Some(format!("Pasted: {}", text));
            doc.volumes.get_mut(&1).unwrap().name = text.to_string();

            let rendered = render(&doc);
            let loaded = parse(&rendered, origin())
                .unwrap_or_else(|e| panic!("{:?} did not read back: {}", text, e));
            assert_eq!(loaded, doc, "{:?}", text);
            assert_eq!(render(&loaded), rendered);
        }
    }

    #[test]
    fn test_synopsis_with_breaks_falls_back_to_quoted() {
        let mut doc = oh_roh();
        doc.synopsis = Some("One\r\nTwo\u{2029}Three".to_string());
        let text = render(&doc);
        assert!(text.contains("synopsis:\n    \"One\\r\\nTwo\\PThree\"\n"));
        assert_eq!(parse(&text, origin()).unwrap().synopsis, doc.synopsis);
    }

    #[test]
    fn test_header_comment_drops_line_breaks() {
        let mut doc = oh_roh();
        doc.name = "Oh\u{2028}Roh\u{7f}".to_string();
        let text = render(&doc);
        assert!(text.starts_with("--- # Oh Roh  Metadata\n"));
        assert_eq!(parse(&text, origin()).unwrap().name, doc.name);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let mut doc = oh_roh();
        doc.credits.push(CreditRecord {
            chapters: Some("1-12".to_string()),
            team: Some("Scantrad".to_string()),
            ..Default::default()
        });

        let first = render(&doc);
        let loaded = parse(&first, origin()).unwrap();
        assert_eq!(loaded, doc);

        let second = render(&loaded);
        let third = render(&parse(&second, origin()).unwrap());
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn test_credit_layout() {
        let mut doc = MetadataDocument::new("Credits");
        doc.credits.push(CreditRecord {
            volumes: Some("1-3".to_string()),
            from: Some("jp".to_string()),
            ..Default::default()
        });
        let text = render(&doc);
        assert!(text.contains("credit:\n    -\n        volumes:   1-3\n        from:   jp\nvol:\n"));
    }

    #[test]
    fn test_parse_merges_onto_defaults() {
        let text = "name: Berserk\nauthor: Kentarō Miura\nvol:\n  1: {name: Vol 1, file: v1.cbz}\n";
        let doc = parse(text, origin()).unwrap();
        assert_eq!(doc.name, "Berserk");
        assert_eq!(doc.author.as_deref(), Some("Kentarō Miura"));
        assert_eq!(doc.editor.as_deref(), Some(TODO_SENTINEL));
        assert_eq!(doc.synopsis.as_deref(), Some(TODO_SENTINEL));
        assert_eq!(doc.volumes[&1].file, "v1.cbz");
        assert!(doc.volumes[&1].date.is_none());
    }

    #[test]
    fn test_parse_accepts_aliases_and_coerces_scalars() {
        let text = "\
name: Oh-Roh
original_title: 王狼
romanji: Ōrō
publisher: Hakusensha
language: fr
credits:
  - chap: 12
    team: Scans
volumes:
  '3':
    name: Three
    file: 3.cbz
    romanized_title: San
";
        let doc = parse(text, origin()).unwrap();
        assert_eq!(doc.original.as_deref(), Some("王狼"));
        assert_eq!(doc.romanized.as_deref(), Some("Ōrō"));
        assert_eq!(doc.editor.as_deref(), Some("Hakusensha"));
        assert_eq!(doc.language.as_deref(), Some("fr"));
        assert_eq!(doc.credits[0].chapters.as_deref(), Some("12"));
        assert_eq!(doc.volumes[&3].romanized.as_deref(), Some("San"));
    }

    #[test]
    fn test_null_means_absent() {
        let doc = parse("name: X\nsynopsis:\nvol:\n", origin()).unwrap();
        assert!(doc.synopsis.is_none());
        assert!(doc.volumes.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let doc = parse("name: X\ncolour: blue\n", origin()).unwrap();
        assert_eq!(doc.name, "X");
    }

    #[test]
    fn test_invalid_text_is_format_error() {
        for text in ["name: [unclosed", "", "- just\n- a list\n"] {
            let err = parse(text, origin()).unwrap_err();
            assert!(matches!(err, AppError::DocumentFormat { .. }), "{:?}", text);
        }
    }

    #[test]
    fn test_schema_errors() {
        let cases = [
            ("author: A\n", "name"),
            ("name: X\nvol:\n  1: {name: One}\n", "vol.1.file"),
            ("name: X\nvol:\n  0: {name: Zero, file: z.cbz}\n", "vol"),
            ("name: X\nauthor: [a, b]\n", "author"),
            ("name: X\nvol:\n  1: {name: A, file: same.cbz}\n  2: {name: B, file: same.cbz}\n", "vol.2.file"),
        ];
        for (text, expected_field) in cases {
            match parse(text, origin()) {
                Err(AppError::Schema { field, .. }) => assert_eq!(field, expected_field, "{}", text),
                other => panic!("expected schema error for {:?}, got {:?}", text, other),
            }
        }
    }
}
