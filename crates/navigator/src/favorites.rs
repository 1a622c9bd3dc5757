//! Pinned-item lists and the shelf that holds them.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::drag::{DragPayload, DragSource};
use crate::entry::{Color, FileEntry, SortCriterion};
use crate::error::{NavigatorError, Result};

/// A named, ordered collection of pins.
///
/// Insertion order is kept until an explicit [`FavoritesList::sort`].
#[derive(Debug, Clone, PartialEq)]
pub struct FavoritesList {
    name: String,
    pins: Vec<FileEntry>,
    last_added_at: u64,
}

impl FavoritesList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: Vec::new(),
            last_added_at: 0,
        }
    }

    /// Rebuilds a list from persisted pins, keeping their stored order and
    /// timestamps.
    pub fn with_pins(name: impl Into<String>, pins: Vec<FileEntry>) -> Self {
        let last_added_at = pins.iter().map(FileEntry::added_at).max().unwrap_or(0);
        Self {
            name: name.into(),
            pins,
            last_added_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pins(&self) -> &[FileEntry] {
        &self.pins
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn contains(&self, full_path: &str) -> bool {
        self.pins.iter().any(|pin| pin.full_path() == full_path)
    }

    /// Appends a pin. Returns `false` when the path is already pinned here.
    pub fn add_pin(&mut self, mut entry: FileEntry) -> bool {
        if self.contains(entry.full_path()) {
            return false;
        }
        // Strictly increasing so `DateAdded` keeps insertion order.
        let added_at = unix_now_millis().max(self.last_added_at + 1);
        self.last_added_at = added_at;
        entry.set_added_at(added_at);
        self.pins.push(entry);
        true
    }

    /// Removes every pin whose path is in `selected`. Returns how many went.
    pub fn remove_pins<S: AsRef<str>>(&mut self, selected: &[S]) -> usize {
        let before = self.pins.len();
        self.pins.retain(|pin| {
            !selected
                .iter()
                .any(|path| path.as_ref() == pin.full_path())
        });
        before - self.pins.len()
    }

    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
    }

    /// Recomputes every sort token for `criterion` and stably reorders.
    pub fn sort(&mut self, criterion: SortCriterion) {
        for pin in &mut self.pins {
            pin.resort(criterion);
        }
        self.pins.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
    }

    /// Sets or clears the user label of one pin.
    pub fn rename_pin(&mut self, full_path: &str, label: Option<String>) -> Result<()> {
        self.pin_mut(full_path)?.set_display_name(label);
        Ok(())
    }

    /// Colours every pin whose path is in `selected`. Returns how many changed.
    pub fn set_pin_color<S: AsRef<str>>(&mut self, selected: &[S], color: Color) -> usize {
        let mut changed = 0;
        for pin in &mut self.pins {
            if selected.iter().any(|path| path.as_ref() == pin.full_path()) {
                pin.set_color(color);
                changed += 1;
            }
        }
        changed
    }

    pub fn record_click(&mut self, full_path: &str) -> Result<()> {
        self.pin_mut(full_path)?.record_click();
        Ok(())
    }

    /// Pins copies of the dropped entries, skipping paths already pinned.
    pub fn accept_drop(&mut self, payload: &DragPayload) -> usize {
        payload
            .entries()
            .iter()
            .filter(|entry| self.add_pin((*entry).clone()))
            .count()
    }

    fn pin_mut(&mut self, full_path: &str) -> Result<&mut FileEntry> {
        let name = &self.name;
        self.pins
            .iter_mut()
            .find(|pin| pin.full_path() == full_path)
            .ok_or_else(|| {
                NavigatorError::InvalidArgument(format!("{full_path} is not pinned in {name}"))
            })
    }
}

/// Ordered set of pin lists with one active list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinShelf {
    lists: Vec<FavoritesList>,
    active: usize,
}

impl PinShelf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lists(&self) -> &[FavoritesList] {
        &self.lists
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&FavoritesList> {
        self.lists.get(index).ok_or_else(|| out_of_range(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut FavoritesList> {
        self.lists.get_mut(index).ok_or_else(|| out_of_range(index))
    }

    pub fn active_index(&self) -> Option<usize> {
        (!self.lists.is_empty()).then_some(self.active)
    }

    pub fn active(&self) -> Option<&FavoritesList> {
        self.lists.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut FavoritesList> {
        self.lists.get_mut(self.active)
    }

    /// Appends a list and makes it active. Without a name it is called
    /// `Pin List {n}`. Names need not be unique.
    pub fn add_list(&mut self, name: Option<String>) -> usize {
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Pin List {}", self.lists.len()));
        self.lists.push(FavoritesList::new(name));
        self.active = self.lists.len() - 1;
        self.active
    }

    pub(crate) fn push_list(&mut self, list: FavoritesList) {
        self.lists.push(list);
    }

    pub fn remove_list(&mut self, index: usize) -> Result<FavoritesList> {
        if index >= self.lists.len() {
            return Err(out_of_range(index));
        }
        let removed = self.lists.remove(index);
        if self.active > index || self.active >= self.lists.len() {
            self.active = self.active.saturating_sub(1);
        }
        Ok(removed)
    }

    pub fn rename_list(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
        self.get_mut(index)?.rename(name);
        Ok(())
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        if index >= self.lists.len() {
            return Err(out_of_range(index));
        }
        self.active = index;
        Ok(())
    }

    /// Makes sure at least one list exists. Returns `true` if one was created.
    pub fn ensure_default(&mut self) -> bool {
        if self.lists.is_empty() {
            self.add_list(None);
            return true;
        }
        false
    }

    /// Builds a drag payload from pins of list `index`.
    pub fn drag_from_list<S: AsRef<str>>(&self, index: usize, selected: &[S]) -> Result<DragPayload> {
        let list = self.get(index)?;
        DragPayload::from_selection(DragSource::PinList(index), list.pins(), selected)
    }

    /// Every pin of every list, list by list.
    pub fn all_pins(&self) -> impl Iterator<Item = &FileEntry> {
        self.lists.iter().flat_map(|list| list.pins.iter())
    }
}

fn out_of_range(index: usize) -> NavigatorError {
    NavigatorError::InvalidArgument(format!("no pin list at index {index}"))
}

fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_millis() as u64)
        .unwrap_or(0)
}
