//! Persisted workspace state: pin lists and open browsers.
//!
//! Written on close, read on show. The file holds two top-level fields:
//! `pin_lists`, in shelf order, and `browsers`, keyed `browser_<n>`. Pins are
//! restored strictly (a malformed pin fails the load) while browsers are
//! best-effort (a directory that vanished is logged and skipped).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entry::{EntryRecord, FileEntry};
use crate::error::{NavigatorError, Result};
use crate::favorites::{FavoritesList, PinShelf};
use crate::registry::BrowserRegistry;
use crate::session::{History, SessionId};

pub const STATE_FILENAME: &str = "workspace.json";

const BROWSER_KEY_PREFIX: &str = "browser_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    #[serde(default)]
    pub pin_lists: Vec<PinListRecord>,
    #[serde(default)]
    pub browsers: BTreeMap<String, BrowserRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinListRecord {
    pub name: String,
    #[serde(default)]
    pub pins: Vec<EntryRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserRecord {
    pub current_path: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub history_index: usize,
}

/// Outcome of [`WorkspaceState::restore_into`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub pin_lists: usize,
    pub browsers: Vec<SessionId>,
    pub skipped_browsers: usize,
}

impl WorkspaceState {
    /// Snapshots the registry. The results session is never persisted.
    pub fn capture(registry: &BrowserRegistry) -> Self {
        let pin_lists = registry
            .pins()
            .lists()
            .iter()
            .map(|list| PinListRecord {
                name: list.name().to_string(),
                pins: list.pins().iter().map(FileEntry::to_record).collect(),
            })
            .collect();

        let browsers = registry
            .sessions()
            .iter()
            .filter(|session| !session.is_results() && session.current_path().is_some())
            .enumerate()
            .map(|(index, session)| {
                let record = BrowserRecord {
                    current_path: session.current_path().map(str::to_string),
                    title: session.title(),
                    history: session.history().paths().to_vec(),
                    history_index: session.history_index(),
                };
                (format!("{BROWSER_KEY_PREFIX}{index}"), record)
            })
            .collect();

        Self {
            pin_lists,
            browsers,
        }
    }

    /// Rebuilds pin lists and browsers inside `registry`.
    ///
    /// The shelf is replaced only when every pin validates. Browsers are
    /// reopened in key order; the first restored one ends up active.
    pub fn restore_into(self, registry: &mut BrowserRegistry) -> Result<RestoreReport> {
        let mut shelf = PinShelf::new();
        for list in self.pin_lists {
            let pins = list
                .pins
                .into_iter()
                .map(FileEntry::from_record)
                .collect::<Result<Vec<_>>>()?;
            shelf.push_list(FavoritesList::with_pins(list.name, pins));
        }
        let mut report = RestoreReport {
            pin_lists: shelf.len(),
            ..RestoreReport::default()
        };
        registry.update_shelf(move |current| {
            *current = shelf;
            current.ensure_default();
        });

        let mut browsers: Vec<(String, BrowserRecord)> = self.browsers.into_iter().collect();
        browsers.sort_by_key(|(key, _)| browser_ordinal(key));

        for (key, record) in browsers {
            let Some(path) = record.current_path.as_deref() else {
                report.skipped_browsers += 1;
                continue;
            };
            let id = match registry.add_session(path) {
                Ok(id) => id,
                Err(error) => {
                    log::warn!("not restoring {key} at {path}: {error}");
                    report.skipped_browsers += 1;
                    continue;
                }
            };
            if !record.history.is_empty() {
                registry
                    .session_mut(id)?
                    .restore_history(History::from_parts(record.history, record.history_index));
            }
            report.browsers.push(id);
        }

        if let Some(first) = report.browsers.first() {
            registry.set_active(*first)?;
        }
        log::info!(
            "restored {} pin lists and {} browsers ({} skipped)",
            report.pin_lists,
            report.browsers.len(),
            report.skipped_browsers
        );
        Ok(report)
    }
}

fn browser_ordinal(key: &str) -> (usize, String) {
    let ordinal = key
        .strip_prefix(BROWSER_KEY_PREFIX)
        .and_then(|rest| rest.parse().ok())
        .unwrap_or(usize::MAX);
    (ordinal, key.to_string())
}

pub fn state_path(dir: &Path) -> PathBuf {
    dir.join(STATE_FILENAME)
}

/// Reads the saved state, `None` when nothing was saved yet.
pub fn load_workspace_state(dir: &Path) -> Result<Option<WorkspaceState>> {
    let path = state_path(dir);
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(&path)?;
    let state = serde_json::from_str(&data).map_err(|error| {
        NavigatorError::Serialization(format!(
            "failed to parse workspace state {}: {error}",
            path.display()
        ))
    })?;
    Ok(Some(state))
}

/// Writes the state through a temp file and a rename, so a crash mid-write
/// keeps the previous file intact.
pub fn save_workspace_state(dir: &Path, state: &WorkspaceState) -> Result<()> {
    fs::create_dir_all(dir).map_err(|error| {
        NavigatorError::Internal(format!(
            "failed to create data directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = state_path(dir);
    let tmp_path = path.with_extension("tmp");
    {
        let mut output = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer_pretty(&mut output, state).map_err(|error| {
            NavigatorError::Serialization(format!("failed to serialize workspace state: {error}"))
        })?;
        output.flush()?;
    }
    fs::rename(&tmp_path, &path).map_err(|error| {
        NavigatorError::Internal(format!(
            "failed to finalize workspace state {}: {error}",
            path.display()
        ))
    })?;

    log::debug!(
        "saved workspace state to {} ({} pin lists, {} browsers)",
        path.display(),
        state.pin_lists.len(),
        state.browsers.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::normalize_path;
    use crate::events::EventBus;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> BrowserRegistry {
        BrowserRegistry::new(EventBus::new(64))
    }

    #[test]
    fn missing_file_loads_as_none() {
        let temp = TempDir::new().unwrap();
        assert!(load_workspace_state(temp.path()).unwrap().is_none());
    }

    #[test]
    fn save_then_load_keeps_document() {
        let temp = TempDir::new().unwrap();
        let mut state = WorkspaceState::default();
        state.pin_lists.push(PinListRecord {
            name: "Work".to_string(),
            pins: vec![FileEntry::with_kind("/srv/work", true, None).to_record()],
        });
        save_workspace_state(temp.path(), &state).unwrap();

        assert!(!temp.path().join("workspace.tmp").exists());
        assert_eq!(load_workspace_state(temp.path()).unwrap(), Some(state));
    }

    #[test]
    fn captures_browsers_but_not_results() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("inner")).unwrap();
        let mut registry = registry();
        let id = registry.add_session(temp.path()).unwrap();
        registry.navigate(id, temp.path().join("inner")).unwrap();
        registry.ensure_results_session();

        let state = WorkspaceState::capture(&registry);
        assert_eq!(state.browsers.len(), 1);
        let record = &state.browsers["browser_0"];
        assert_eq!(
            record.current_path.as_deref(),
            Some(normalize_path(&temp.path().join("inner")).as_str())
        );
        assert_eq!(record.title, "inner");
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.history_index, 1);
    }

    #[test]
    fn restore_skips_missing_directories() {
        let temp = TempDir::new().unwrap();
        let live = normalize_path(temp.path());
        let mut state = WorkspaceState::default();
        for (key, path) in [("browser_0", format!("{live}/gone")), ("browser_1", live.clone())] {
            state.browsers.insert(
                key.to_string(),
                BrowserRecord {
                    current_path: Some(path.clone()),
                    title: String::new(),
                    history: vec![path],
                    history_index: 0,
                },
            );
        }

        let mut registry = registry();
        let report = state.restore_into(&mut registry).unwrap();
        assert_eq!(report.browsers.len(), 1);
        assert_eq!(report.skipped_browsers, 1);
        assert_eq!(registry.get_active(), Some(report.browsers[0]));
        // An empty pin section still yields one default list.
        assert_eq!(registry.pins().len(), 1);
    }

    #[test]
    fn malformed_pin_fails_restore_and_keeps_shelf() {
        let mut state = WorkspaceState::default();
        let mut record = FileEntry::with_kind("/srv/a", true, None).to_record();
        record.color = vec![1.0, 0.5];
        state.pin_lists.push(PinListRecord {
            name: "Broken".to_string(),
            pins: vec![record],
        });

        let mut registry = registry();
        let result = state.restore_into(&mut registry);
        assert!(matches!(
            result,
            Err(NavigatorError::Malformed { field: "color", .. })
        ));
        assert!(registry.pins().is_empty());
    }

    #[test]
    fn browser_keys_restore_in_numeric_order() {
        let mut keys = vec!["browser_10", "browser_2", "browser_0"];
        keys.sort_by_key(|key| browser_ordinal(key));
        assert_eq!(keys, vec!["browser_0", "browser_2", "browser_10"]);
    }
}
