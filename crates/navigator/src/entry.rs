//! File entry descriptors shared by sessions, pin lists and search results.
//!
//! A [`FileEntry`] is built once from a single filesystem stat and never
//! re-reads the disk afterwards. Its identity is its canonical `full_path`;
//! collections own their entries outright, so a pin and a listing entry for
//! the same path are independent copies.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{classify_io_error, malformed, NavigatorError, Result};

/// Suffix given to directories so they sort ahead of files.
pub const DIRECTORY_SUFFIX: &str = "0";

/// RGBA colour with components in `[0.0, 1.0]`.
pub type Color = [f32; 4];

/// Opaque white.
pub const DEFAULT_COLOR: Color = [1.0, 1.0, 1.0, 1.0];

/// Key an entry is ordered by when its owning collection is sorted.
///
/// Numeric tokens order before text tokens; a single sort pass only ever
/// produces one kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortToken {
    Number(u64),
    Text(String),
}

/// Criteria a pin list can be re-sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCriterion {
    Name,
    FileType,
    Usage,
    Size,
    DateAdded,
}

impl SortCriterion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::FileType => "file-type",
            Self::Usage => "usage",
            Self::Size => "size",
            Self::DateAdded => "date-added",
        }
    }
}

impl fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortCriterion {
    type Err = NavigatorError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "name" => Ok(Self::Name),
            "file-type" | "type" => Ok(Self::FileType),
            "usage" => Ok(Self::Usage),
            "size" => Ok(Self::Size),
            "date-added" | "added" => Ok(Self::DateAdded),
            other => Err(NavigatorError::InvalidArgument(format!(
                "unknown sort criterion: {other}"
            ))),
        }
    }
}

/// Descriptor of one filesystem path.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    full_path: String,
    name: String,
    is_directory: bool,
    suffix: String,
    sort_token: SortToken,
    click_count: u32,
    color: Color,
    display_name: Option<String>,
    size: Option<u64>,
    added_at: u64,
}

impl FileEntry {
    /// Stats `path` once and builds an entry for it.
    ///
    /// Fails with `NotFound` when the path does not exist and `AccessDenied`
    /// when it cannot be inspected.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|error| classify_io_error(path, error))?;
        let size = (!metadata.is_dir()).then(|| metadata.len());
        Ok(Self::with_kind(normalize_path(path), metadata.is_dir(), size))
    }

    /// Builds an entry from already-known facts without touching the disk.
    pub fn with_kind(full_path: impl Into<String>, is_directory: bool, size: Option<u64>) -> Self {
        let full_path = full_path.into();
        let name = leaf_name(&full_path);
        let suffix = derive_suffix(&name, is_directory);
        let sort_token = SortToken::Text(format!("{suffix}{name}"));
        Self {
            full_path,
            name,
            is_directory,
            suffix,
            sort_token,
            click_count: 0,
            color: DEFAULT_COLOR,
            display_name: None,
            size,
            added_at: 0,
        }
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// User-facing label: the pin label when one was set, the base name otherwise.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_dir(&self) -> bool {
        self.is_directory
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn sort_key(&self) -> &SortToken {
        &self.sort_token
    }

    pub fn click_count(&self) -> u32 {
        self.click_count
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Unix millis at which the entry was pinned, 0 for listing entries.
    pub fn added_at(&self) -> u64 {
        self.added_at
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_display_name(&mut self, label: Option<String>) {
        self.display_name = label.filter(|label| !label.trim().is_empty());
    }

    pub fn record_click(&mut self) {
        self.click_count = self.click_count.saturating_add(1);
    }

    pub(crate) fn set_added_at(&mut self, added_at: u64) {
        self.added_at = added_at;
    }

    /// Recomputes the sort token for `criterion`. This is the only place the
    /// token changes after construction.
    pub fn resort(&mut self, criterion: SortCriterion) {
        self.sort_token = match criterion {
            SortCriterion::Name => SortToken::Text(self.display_name().to_string()),
            SortCriterion::FileType => {
                SortToken::Text(format!("{}{}", self.suffix, self.display_name()))
            }
            SortCriterion::Usage => SortToken::Number(u64::from(self.click_count)),
            SortCriterion::Size => SortToken::Number(self.size.unwrap_or(0)),
            SortCriterion::DateAdded => SortToken::Number(self.added_at),
        };
    }

    /// Case-insensitive substring test on the base name. `token` must already
    /// be lowercase.
    pub fn name_matches(&self, token: &str) -> bool {
        self.name.to_lowercase().contains(token)
    }

    /// Flattens the primitive fields for persistence.
    pub fn to_record(&self) -> EntryRecord {
        EntryRecord {
            full_path: self.full_path.clone(),
            name: Some(self.name.clone()),
            is_directory: Some(self.is_directory),
            suffix: Some(self.suffix.clone()),
            sort_token: Some(self.sort_token.clone()),
            click_count: self.click_count,
            color: self.color.to_vec(),
            display_name: self.display_name.clone(),
            size: self.size,
            added_at: self.added_at,
        }
    }

    /// Rebuilds an entry from a persisted record, validating every field.
    ///
    /// Name and suffix are re-derived from the path. The directory flag is
    /// taken from the record; when it is absent the path is stat'ed instead.
    pub fn from_record(record: EntryRecord) -> Result<Self> {
        if record.full_path.trim().is_empty() {
            return Err(malformed("full_path", "must not be empty"));
        }
        let color = parse_color(&record.color)?;
        let full_path = normalize_path(Path::new(&record.full_path));

        let is_directory = match record.is_directory {
            Some(flag) => flag,
            None => fs::metadata(&full_path)
                .map(|metadata| metadata.is_dir())
                .map_err(|error| {
                    malformed(
                        "is_directory",
                        format!("missing and {full_path} cannot be inspected: {error}"),
                    )
                })?,
        };

        let mut entry = Self::with_kind(full_path, is_directory, record.size);
        if let Some(token) = record.sort_token {
            entry.sort_token = token;
        }
        entry.click_count = record.click_count;
        entry.color = color;
        entry.set_display_name(record.display_name);
        entry.added_at = record.added_at;
        Ok(entry)
    }
}

/// Persisted form of a [`FileEntry`]: only primitive-typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub full_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_directory: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_token: Option<SortToken>,
    #[serde(default)]
    pub click_count: u32,
    #[serde(default = "default_color_components")]
    pub color: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub added_at: u64,
}

fn default_color_components() -> Vec<f32> {
    DEFAULT_COLOR.to_vec()
}

fn parse_color(components: &[f32]) -> Result<Color> {
    let color: Color = components.try_into().map_err(|_| {
        malformed(
            "color",
            format!("expected 4 components, found {}", components.len()),
        )
    })?;
    if color.iter().any(|c| !(0.0..=1.0).contains(c)) {
        return Err(malformed("color", "components must lie in [0.0, 1.0]"));
    }
    Ok(color)
}

/// Canonical string form of a path: forward slashes, no trailing separator
/// except on a root.
pub fn normalize_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    if raw.len() <= 1 || raw.ends_with(":/") {
        return raw;
    }
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.ends_with(':') {
        format!("{trimmed}/")
    } else {
        trimmed.to_string()
    }
}

/// Joins a canonical directory path and a child name.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Canonical parent of a canonical path, `None` at a root.
pub fn parent_path(path: &str) -> Option<String> {
    Path::new(path).parent().map(normalize_path)
}

/// Last component of a canonical path, or the path itself at a root.
pub fn leaf_name(full_path: &str) -> String {
    let trimmed = full_path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, leaf)) if !leaf.is_empty() => leaf.to_string(),
        _ if trimmed.is_empty() => full_path.to_string(),
        _ => trimmed.to_string(),
    }
}

fn derive_suffix(name: &str, is_directory: bool) -> String {
    if is_directory {
        return DIRECTORY_SUFFIX.to_string();
    }
    name.split_once('.')
        .map(|(_, suffix)| suffix.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn from_path_stats_once() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.tar.gz"), b"abc").unwrap();
        fs::create_dir(temp.path().join("src")).unwrap();

        let file = FileEntry::from_path(temp.path().join("notes.tar.gz")).unwrap();
        assert_eq!(file.name(), "notes.tar.gz");
        assert_eq!(file.suffix(), "tar.gz");
        assert!(!file.is_dir());
        assert_eq!(file.size(), Some(3));
        assert_eq!(file.sort_key(), &SortToken::Text("tar.gznotes.tar.gz".into()));
        assert!(!file.full_path().contains('\\'));

        let dir = FileEntry::from_path(temp.path().join("src")).unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir.suffix(), DIRECTORY_SUFFIX);
        assert!(dir.sort_key() < file.sort_key());
    }

    #[test]
    fn from_path_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = FileEntry::from_path(temp.path().join("ghost")).unwrap_err();
        assert!(matches!(err, NavigatorError::NotFound(_)));
    }

    #[test]
    fn mutation_does_not_touch_sort_token() {
        let mut entry = FileEntry::with_kind("/tmp/a.txt", false, Some(10));
        let before = entry.sort_key().clone();
        entry.record_click();
        entry.set_color([0.5, 0.5, 0.5, 1.0]);
        entry.set_display_name(Some("Alpha".into()));
        assert_eq!(entry.sort_key(), &before);

        entry.resort(SortCriterion::Usage);
        assert_eq!(entry.sort_key(), &SortToken::Number(1));
        entry.resort(SortCriterion::Name);
        assert_eq!(entry.sort_key(), &SortToken::Text("Alpha".into()));
    }

    #[test]
    fn name_match_ignores_case_and_directories() {
        let entry = FileEntry::with_kind("/Foo/Readme.MD", false, None);
        assert!(entry.name_matches("readme"));
        assert!(!entry.name_matches("foo"));
    }

    #[test]
    fn record_restores_fields() {
        let mut entry = FileEntry::with_kind("/data/report.pdf", false, Some(42));
        entry.record_click();
        entry.set_color([0.2, 0.4, 0.6, 1.0]);
        entry.set_display_name(Some("Q3".into()));

        let json = serde_json::to_string(&entry.to_record()).unwrap();
        let record: EntryRecord = serde_json::from_str(&json).unwrap();
        let restored = FileEntry::from_record(record).unwrap();
        assert_eq!(restored, entry);
    }

    #[test]
    fn record_rejects_bad_color_and_empty_path() {
        let record: EntryRecord =
            serde_json::from_str(r#"{"full_path": "/x", "is_directory": false, "color": [1, 1, 1]}"#)
                .unwrap();
        let err = FileEntry::from_record(record).unwrap_err();
        assert!(matches!(err, NavigatorError::Malformed { field: "color", .. }));

        let record: EntryRecord =
            serde_json::from_str(r#"{"full_path": " ", "is_directory": true}"#).unwrap();
        let err = FileEntry::from_record(record).unwrap_err();
        assert!(matches!(err, NavigatorError::Malformed { field: "full_path", .. }));

        assert!(serde_json::from_str::<EntryRecord>(r#"{"click_count": 3}"#).is_err());
    }

    #[test]
    fn record_without_kind_stats_the_path() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.txt")).unwrap();
        let record = EntryRecord {
            full_path: normalize_path(&temp.path().join("a.txt")),
            name: None,
            is_directory: None,
            suffix: None,
            sort_token: None,
            click_count: 0,
            color: DEFAULT_COLOR.to_vec(),
            display_name: None,
            size: None,
            added_at: 0,
        };
        let entry = FileEntry::from_record(record.clone()).unwrap();
        assert!(!entry.is_dir());

        let missing = EntryRecord {
            full_path: normalize_path(&temp.path().join("gone")),
            ..record
        };
        let err = FileEntry::from_record(missing).unwrap_err();
        assert!(matches!(err, NavigatorError::Malformed { field: "is_directory", .. }));
    }

    #[test]
    fn path_helpers() {
        assert_eq!(normalize_path(Path::new("/a/b/")), "/a/b");
        assert_eq!(normalize_path(Path::new("/")), "/");
        assert_eq!(normalize_path(Path::new("C:\\Users\\me")), "C:/Users/me");
        assert_eq!(join_path("/", "etc"), "/etc");
        assert_eq!(join_path("/a", "b"), "/a/b");
        assert_eq!(parent_path("/a/b").as_deref(), Some("/a"));
        assert_eq!(parent_path("/a").as_deref(), Some("/"));
        assert_eq!(parent_path("/"), None);
        assert_eq!(leaf_name("/a/b"), "b");
        assert_eq!(leaf_name("/"), "/");
    }

    #[test]
    fn sort_criterion_parses() {
        assert_eq!("File Type".parse::<SortCriterion>().unwrap(), SortCriterion::FileType);
        assert_eq!("date_added".parse::<SortCriterion>().unwrap(), SortCriterion::DateAdded);
        assert!("colour".parse::<SortCriterion>().is_err());
    }
}
