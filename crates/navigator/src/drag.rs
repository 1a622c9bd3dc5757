//! Drag-and-drop message passed explicitly from a drag source to a drop target.

use crate::entry::FileEntry;
use crate::error::{NavigatorError, Result};
use crate::session::SessionId;

/// Where a drag started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragSource {
    Session(SessionId),
    /// Index of a list on the pin shelf.
    PinList(usize),
}

/// Entries carried by one drag operation. Owned copies, so the source can
/// change while the drag is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPayload {
    source: DragSource,
    entries: Vec<FileEntry>,
}

impl DragPayload {
    pub fn new(source: DragSource, entries: Vec<FileEntry>) -> Self {
        Self { source, entries }
    }

    /// Copies the entries of `available` whose paths appear in `selected`,
    /// keeping the order of `available`.
    pub fn from_selection<S: AsRef<str>>(
        source: DragSource,
        available: &[FileEntry],
        selected: &[S],
    ) -> Result<Self> {
        let entries: Vec<FileEntry> = available
            .iter()
            .filter(|entry| {
                selected
                    .iter()
                    .any(|path| path.as_ref() == entry.full_path())
            })
            .cloned()
            .collect();
        if entries.is_empty() {
            return Err(NavigatorError::InvalidArgument(
                "drag selection matched no entries".to_string(),
            ));
        }
        Ok(Self { source, entries })
    }

    pub fn source(&self) -> DragSource {
        self.source
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn first_directory(&self) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.is_dir())
    }
}
