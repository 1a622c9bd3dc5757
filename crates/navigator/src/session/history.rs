//! Visit history with a movable cursor.

/// Ordered visit history of one session.
///
/// New visits are appended at the tail. Moving the cursor back and forth
/// never drops entries, so forward history survives a fresh navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    paths: Vec<String>,
    index: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a history from persisted parts, clamping the cursor.
    pub fn from_parts(paths: Vec<String>, index: usize) -> Self {
        let index = index.min(paths.len().saturating_sub(1));
        Self { paths, index }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn current(&self) -> Option<&str> {
        self.paths.get(self.index).map(String::as_str)
    }

    /// Appends `path` unless it repeats the last entry, and moves the cursor
    /// to the tail either way.
    pub fn record(&mut self, path: &str) {
        if self.paths.last().map(String::as_str) != Some(path) {
            self.paths.push(path.to_string());
        }
        self.index = self.paths.len() - 1;
    }

    /// Path one step back, if any. Does not move the cursor.
    pub fn peek_back(&self) -> Option<&str> {
        self.index
            .checked_sub(1)
            .and_then(|index| self.paths.get(index))
            .map(String::as_str)
    }

    /// Path one step forward, if any. Does not move the cursor.
    pub fn peek_forward(&self) -> Option<&str> {
        self.paths.get(self.index + 1).map(String::as_str)
    }

    pub(crate) fn step_back(&mut self) {
        if self.index > 0 {
            self.index -= 1;
        }
    }

    pub(crate) fn step_forward(&mut self) {
        if self.index + 1 < self.paths.len() {
            self.index += 1;
        }
    }
}
