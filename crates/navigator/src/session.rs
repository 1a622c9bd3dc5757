//! Browser sessions: one navigable directory view each.
//!
//! Navigation is atomic. The new directory is listed first and the session
//! only commits path, listing and history once the listing succeeded, so a
//! failed `navigate` leaves everything exactly as it was.

mod history;

pub use history::History;

use std::fmt;
use std::fs;
use std::path::Path;

use crate::entry::{join_path, leaf_name, normalize_path, parent_path, FileEntry};
use crate::error::{classify_io_error, NavigatorError, Result};

/// Title of the session that receives search matches.
pub const RESULTS_TITLE: &str = "Search Results";

/// Opaque handle to a session owned by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// A regular directory browser.
    Directory,
    /// The sink that search generations stream matches into.
    SearchResults,
}

/// What `open` did with the selected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    /// The entry was a directory and the session moved into it.
    Navigated,
    /// The entry is a file; launching it is up to the caller.
    File(String),
}

#[derive(Debug, Clone)]
pub struct BrowserSession {
    id: SessionId,
    kind: SessionKind,
    current_path: Option<String>,
    history: History,
    entries: Vec<FileEntry>,
}

impl BrowserSession {
    pub(crate) fn new(id: SessionId, kind: SessionKind) -> Self {
        Self {
            id,
            kind,
            current_path: None,
            history: History::new(),
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn is_results(&self) -> bool {
        self.kind == SessionKind::SearchResults
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_index(&self) -> usize {
        self.history.index()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn title(&self) -> String {
        match (&self.kind, &self.current_path) {
            (SessionKind::SearchResults, _) => RESULTS_TITLE.to_string(),
            (SessionKind::Directory, Some(path)) => leaf_name(path),
            (SessionKind::Directory, None) => String::new(),
        }
    }

    /// Lists `path` and makes it the current directory.
    ///
    /// With `record_history` the path is appended to the history unless it
    /// repeats the last entry, and the cursor moves to the tail.
    pub fn navigate(&mut self, path: impl AsRef<Path>, record_history: bool) -> Result<()> {
        self.ensure_navigable()?;
        let path = normalize_path(path.as_ref());
        let entries = list_directory(&path)?;

        log::debug!(
            "{} navigated to {} ({} entries, record_history={})",
            self.id,
            path,
            entries.len(),
            record_history
        );
        if record_history {
            self.history.record(&path);
        }
        self.current_path = Some(path);
        self.entries = entries;
        Ok(())
    }

    /// Moves the history cursor one step back. Returns `false` at the start
    /// of the history.
    pub fn back(&mut self) -> Result<bool> {
        let Some(target) = self.history.peek_back().map(str::to_string) else {
            return Ok(false);
        };
        self.navigate(&target, false)?;
        self.history.step_back();
        Ok(true)
    }

    /// Moves the history cursor one step forward. Returns `false` at the tail.
    pub fn forward(&mut self) -> Result<bool> {
        let Some(target) = self.history.peek_forward().map(str::to_string) else {
            return Ok(false);
        };
        self.navigate(&target, false)?;
        self.history.step_forward();
        Ok(true)
    }

    /// Navigates to the parent directory, recording history. Returns `false`
    /// at a filesystem root or before the first navigation.
    pub fn up(&mut self) -> Result<bool> {
        let Some(parent) = self.current_path.as_deref().and_then(parent_path) else {
            return Ok(false);
        };
        self.navigate(&parent, true)?;
        Ok(true)
    }

    /// Re-lists the current directory without touching history.
    pub fn refresh(&mut self) -> Result<()> {
        if let Some(path) = self.current_path.clone() {
            self.navigate(&path, false)?;
        }
        Ok(())
    }

    /// Opens one of the listed entries by path.
    pub fn open(&mut self, full_path: &str) -> Result<OpenTarget> {
        let id = self.id;
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.full_path() == full_path)
            .ok_or_else(|| {
                NavigatorError::InvalidArgument(format!("{full_path} is not listed in {id}"))
            })?;

        if entry.is_dir() {
            // The listing is replaced on success, so there is no click to keep.
            let target = entry.full_path().to_string();
            self.navigate(&target, true)?;
            Ok(OpenTarget::Navigated)
        } else {
            entry.record_click();
            Ok(OpenTarget::File(entry.full_path().to_string()))
        }
    }

    pub(crate) fn restore_history(&mut self, history: History) {
        self.history = history;
    }

    pub(crate) fn clear_entries(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn push_entry(&mut self, entry: FileEntry) {
        self.entries.push(entry);
    }

    fn ensure_navigable(&self) -> Result<()> {
        if self.is_results() {
            return Err(NavigatorError::InvalidArgument(format!(
                "{} holds search results and cannot navigate",
                self.id
            )));
        }
        Ok(())
    }
}

/// Lists one directory level, ordered by the default sort token
/// (directories first, then by extension, then by name).
pub fn list_directory(path: &str) -> Result<Vec<FileEntry>> {
    let dir = Path::new(path);
    let metadata = fs::metadata(dir).map_err(|error| classify_io_error(dir, error))?;
    if !metadata.is_dir() {
        return Err(NavigatorError::InvalidArgument(format!(
            "{path} is not a directory"
        )));
    }

    let read_dir = fs::read_dir(dir).map_err(|error| classify_io_error(dir, error))?;
    let mut entries = Vec::new();
    for item in read_dir {
        let item = match item {
            Ok(item) => item,
            Err(error) => {
                log::debug!("skipping unreadable entry in {path}: {error}");
                continue;
            }
        };
        let child_path = item.path();
        // Follow symlinks for the kind, fall back to the link itself when dangling.
        let metadata = match fs::metadata(&child_path).or_else(|_| item.metadata()) {
            Ok(metadata) => metadata,
            Err(error) => {
                log::debug!("skipping {}: {error}", child_path.display());
                continue;
            }
        };
        let name = item.file_name().to_string_lossy().into_owned();
        let size = (!metadata.is_dir()).then(|| metadata.len());
        entries.push(FileEntry::with_kind(
            join_path(path, &name),
            metadata.is_dir(),
            size,
        ));
    }

    entries.sort_by(|a, b| {
        a.sort_key()
            .cmp(b.sort_key())
            .then_with(|| a.name().cmp(b.name()))
    });
    Ok(entries)
}
