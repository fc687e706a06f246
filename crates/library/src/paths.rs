//! Directory listing in natural ("alphanumeric") order
//!
//! File names are split into alternating text and digit runs. Digit runs
//! compare as integers and text runs compare case-insensitively, so
//! `vol2.cbz` sorts before `vol10.cbz`. Listing never recurses.

use crate::error::{LibraryError, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("digit run pattern is a valid regex"));

/// One run of a natural sort key
///
/// Keys always alternate `Text`, `Number`, `Text`... starting with a
/// (possibly empty) text run, so tokens at the same position share a variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortToken {
    Text(String),
    /// Digits without leading zeros; ordered by length first, so values of any size compare numerically
    Number { len: usize, digits: String },
}

impl SortToken {
    fn number(run: &str) -> Self {
        let trimmed = run.trim_start_matches('0');
        Self::Number {
            len: trimmed.len(),
            digits: trimmed.to_string(),
        }
    }
}

/// Splits a name into its natural sort key
pub fn natural_key(name: &str) -> Vec<SortToken> {
    let mut key = Vec::new();
    let mut last = 0;

    for run in DIGIT_RUN.find_iter(name) {
        key.push(SortToken::Text(name[last..run.start()].to_lowercase()));
        key.push(SortToken::number(run.as_str()));
        last = run.end();
    }
    key.push(SortToken::Text(name[last..].to_lowercase()));

    key
}

/// Compares two names in natural order
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Sorts names in place in natural order
pub fn sort_alphanumeric(names: &mut [String]) {
    names.sort_by_cached_key(|name| natural_key(name));
}

/// Returns the lowercased extension with its leading dot, or an empty string
pub fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Returns the file name without its extension
pub fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Lowercases an extension and adds the leading dot if missing
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Which kind of directory entry to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    #[default]
    Files,
    Directories,
}

/// Filters applied by [`sorted_alphanumeric`]
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Allowed extensions, normalized; empty allows everything
    pub extensions: HashSet<String>,
    /// Exact names to skip
    pub ignore: HashSet<String>,
    pub kind: EntryKind,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    pub fn with_ignore<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn directories(mut self) -> Self {
        self.kind = EntryKind::Directories;
        self
    }

    fn accepts(&self, name: &str) -> bool {
        !self.ignore.contains(name)
            && (self.extensions.is_empty() || self.extensions.contains(&extension(name)))
    }
}

/// Lists the entries of `dir` matching `options`, in natural order
pub fn sorted_alphanumeric(dir: &Path, options: &ListOptions) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = entry.map_err(|e| LibraryError::Listing {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let file_type = entry.file_type();
        let kind_matches = match options.kind {
            EntryKind::Files => file_type.is_file(),
            EntryKind::Directories => file_type.is_dir(),
        };
        if !kind_matches {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if options.accepts(&name) {
            names.push(name);
        }
    }

    sort_alphanumeric(&mut names);
    debug!("Listed {} entries in {}", names.len(), dir.display());
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        sort_alphanumeric(&mut names);
        names
    }

    #[test]
    fn test_digit_runs_compare_numerically() {
        assert_eq!(
            sorted(&["vol2.cbz", "vol10.cbz", "vol1.cbz"]),
            vec!["vol1.cbz", "vol2.cbz", "vol10.cbz"]
        );
    }

    #[test]
    fn test_text_runs_ignore_case() {
        assert_eq!(
            sorted(&["b1", "A2", "a1"]),
            vec!["a1", "A2", "b1"]
        );
    }

    #[test]
    fn test_leading_zeros_and_large_numbers() {
        assert_eq!(
            sorted(&["x100000000000000000000000", "x007", "x8"]),
            vec!["x007", "x8", "x100000000000000000000000"]
        );
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(sorted(&["vol1b", "vol1"]), vec!["vol1", "vol1b"]);
        assert_eq!(natural_cmp("Vol 3", "vol 3"), Ordering::Equal);
    }

    #[test]
    fn test_key_alternates_text_and_number() {
        let key = natural_key("12abc");
        assert_eq!(key.len(), 3);
        assert_eq!(key[0], SortToken::Text(String::new()));
        assert!(matches!(key[1], SortToken::Number { len: 2, .. }));
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(extension("Oh-Roh.CBZ"), ".cbz");
        assert_eq!(extension("README"), "");
        assert_eq!(normalize_extension("CBZ"), ".cbz");
        assert_eq!(normalize_extension(".cbz"), ".cbz");
        assert_eq!(file_stem("Oh-Roh-Den.cbz"), "Oh-Roh-Den");
    }

    #[test]
    fn test_listing_filters() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["vol10.cbz", "vol2.CBZ", "vol1.cbz", "notes.txt", "skip.cbz"] {
            fs::write(temp_dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(temp_dir.path().join("extra.cbz")).unwrap();
        fs::create_dir(temp_dir.path().join("covers")).unwrap();

        let options = ListOptions::new()
            .with_extensions(["cbz"])
            .with_ignore(["skip.cbz"]);
        let files = sorted_alphanumeric(temp_dir.path(), &options).unwrap();
        assert_eq!(files, vec!["vol1.cbz", "vol2.CBZ", "vol10.cbz"]);

        let dirs = sorted_alphanumeric(temp_dir.path(), &ListOptions::new().directories()).unwrap();
        assert_eq!(dirs, vec!["covers", "extra.cbz"]);
    }

    #[test]
    fn test_listing_does_not_recurse() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested").join("deep.cbz"), b"x").unwrap();

        let files = sorted_alphanumeric(temp_dir.path(), &ListOptions::new()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = sorted_alphanumeric(&temp_dir.path().join("absent"), &ListOptions::new());
        assert!(matches!(result, Err(LibraryError::Listing { .. })));
    }
}
