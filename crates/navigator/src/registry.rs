//! Registry of open browser sessions.
//!
//! The registry owns every [`BrowserSession`], the pin shelf and the event bus.
//! It lives on the control thread; search workers never touch it; their
//! output is applied through [`BrowserRegistry::apply_search_update`].

use std::path::Path;

use crate::drag::{DragPayload, DragSource};
use crate::entry::FileEntry;
use crate::error::{NavigatorError, Result};
use crate::events::{EventBus, NavigatorEvent};
use crate::favorites::{FavoritesList, PinShelf};
use crate::search::SearchUpdate;
use crate::session::{BrowserSession, OpenTarget, SessionId, SessionKind};

#[derive(Debug)]
pub struct BrowserRegistry {
    sessions: Vec<BrowserSession>,
    active: Option<SessionId>,
    results: Option<SessionId>,
    shelf: PinShelf,
    bus: EventBus,
    next_id: u64,
}

impl BrowserRegistry {
    pub fn new(bus: EventBus) -> Self {
        Self {
            sessions: Vec::new(),
            active: None,
            results: None,
            shelf: PinShelf::new(),
            bus,
            next_id: 1,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Sessions in creation order, the results session included.
    pub fn sessions(&self) -> &[BrowserSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session(&self, id: SessionId) -> Result<&BrowserSession> {
        self.sessions
            .iter()
            .find(|session| session.id() == id)
            .ok_or_else(|| unknown_session(id))
    }

    pub(crate) fn session_mut(&mut self, id: SessionId) -> Result<&mut BrowserSession> {
        self.sessions
            .iter_mut()
            .find(|session| session.id() == id)
            .ok_or_else(|| unknown_session(id))
    }

    /// Opens a new directory session on `path` and makes it active.
    ///
    /// The directory is listed before the session is registered, so a bad
    /// path leaves the registry untouched.
    pub fn add_session(&mut self, path: impl AsRef<Path>) -> Result<SessionId> {
        let id = SessionId::new(self.next_id);
        let mut session = BrowserSession::new(id, SessionKind::Directory);
        session.navigate(path, true)?;
        self.next_id += 1;

        log::info!("opened {id} at {}", session.current_path().unwrap_or_default());
        self.sessions.push(session);
        self.bus.publish(NavigatorEvent::SessionAdded { session: id });
        self.publish_entries(id);
        self.set_active(id)?;
        Ok(id)
    }

    /// Closes a session. When it was active, the first remaining session (in
    /// creation order) becomes active, or none if it was the last one.
    pub fn remove_session(&mut self, id: SessionId) -> Result<BrowserSession> {
        let position = self
            .sessions
            .iter()
            .position(|session| session.id() == id)
            .ok_or_else(|| unknown_session(id))?;
        let removed = self.sessions.remove(position);
        if self.results == Some(id) {
            self.results = None;
        }
        log::info!("closed {id}");
        self.bus.publish(NavigatorEvent::SessionRemoved { session: id });

        if self.active == Some(id) {
            let next = self.sessions.first().map(BrowserSession::id);
            self.change_active(next);
        }
        Ok(removed)
    }

    /// Makes `id` the active session. Fails with `InvalidArgument` for a
    /// handle this registry does not own.
    pub fn set_active(&mut self, id: SessionId) -> Result<()> {
        self.session(id)?;
        if self.active != Some(id) {
            self.change_active(Some(id));
        }
        Ok(())
    }

    pub fn get_active(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active_session(&self) -> Option<&BrowserSession> {
        self.active.and_then(|id| self.session(id).ok())
    }

    pub fn navigate(&mut self, id: SessionId, path: impl AsRef<Path>) -> Result<()> {
        self.session_mut(id)?.navigate(path, true)?;
        self.publish_entries(id);
        Ok(())
    }

    pub fn back(&mut self, id: SessionId) -> Result<bool> {
        let moved = self.session_mut(id)?.back()?;
        if moved {
            self.publish_entries(id);
        }
        Ok(moved)
    }

    pub fn forward(&mut self, id: SessionId) -> Result<bool> {
        let moved = self.session_mut(id)?.forward()?;
        if moved {
            self.publish_entries(id);
        }
        Ok(moved)
    }

    pub fn up(&mut self, id: SessionId) -> Result<bool> {
        let moved = self.session_mut(id)?.up()?;
        if moved {
            self.publish_entries(id);
        }
        Ok(moved)
    }

    pub fn refresh(&mut self, id: SessionId) -> Result<()> {
        self.session_mut(id)?.refresh()?;
        self.publish_entries(id);
        Ok(())
    }

    pub fn open(&mut self, id: SessionId, full_path: &str) -> Result<OpenTarget> {
        let target = self.session_mut(id)?.open(full_path)?;
        if target == OpenTarget::Navigated {
            self.publish_entries(id);
        }
        Ok(target)
    }

    /// Returns the results session, creating it on first use. Creating it
    /// does not change the active session.
    pub fn ensure_results_session(&mut self) -> SessionId {
        if let Some(id) = self.results {
            return id;
        }
        let id = SessionId::new(self.next_id);
        self.next_id += 1;
        self.sessions
            .push(BrowserSession::new(id, SessionKind::SearchResults));
        self.results = Some(id);
        log::debug!("created results session {id}");
        self.bus.publish(NavigatorEvent::SessionAdded { session: id });
        id
    }

    pub fn results_session(&self) -> Option<SessionId> {
        self.results
    }

    /// Entries of every session except `exclude`, followed by every pin of
    /// every list. The result is a copy; later changes do not affect it.
    pub fn snapshot_entries(&self, exclude: Option<SessionId>) -> Vec<FileEntry> {
        self.sessions
            .iter()
            .filter(|session| Some(session.id()) != exclude)
            .flat_map(|session| session.entries().iter())
            .chain(self.shelf.all_pins())
            .cloned()
            .collect()
    }

    pub fn pins(&self) -> &PinShelf {
        &self.shelf
    }

    /// Runs `update` against pin list `index` and announces the change.
    pub fn update_pins<T>(
        &mut self,
        index: usize,
        update: impl FnOnce(&mut FavoritesList) -> T,
    ) -> Result<T> {
        let value = update(self.shelf.get_mut(index)?);
        self.bus.publish(NavigatorEvent::PinsChanged { list: index });
        Ok(value)
    }

    /// Runs `update` against the whole shelf (adding, removing or switching
    /// lists) and announces the change for the then-active list.
    pub fn update_shelf<T>(&mut self, update: impl FnOnce(&mut PinShelf) -> T) -> T {
        let value = update(&mut self.shelf);
        if let Some(list) = self.shelf.active_index() {
            self.bus.publish(NavigatorEvent::PinsChanged { list });
        }
        value
    }

    /// Builds a drag payload from entries listed in session `id`.
    pub fn drag_from_session<S: AsRef<str>>(
        &self,
        id: SessionId,
        selected: &[S],
    ) -> Result<DragPayload> {
        let session = self.session(id)?;
        DragPayload::from_selection(DragSource::Session(id), session.entries(), selected)
    }

    /// Drops `payload` onto session `target`: it navigates into the first
    /// dropped directory. Returns `false` when the payload holds no directory.
    pub fn accept_drop(&mut self, target: SessionId, payload: &DragPayload) -> Result<bool> {
        let Some(directory) = payload.first_directory() else {
            return Ok(false);
        };
        let path = directory.full_path().to_string();
        self.navigate(target, &path)?;
        Ok(true)
    }

    /// Applies one worker update to the results session. Updates whose
    /// generation is not `current_generation` are dropped; returns whether
    /// the update was applied.
    pub fn apply_search_update(&mut self, update: SearchUpdate, current_generation: u64) -> bool {
        let generation = match &update {
            SearchUpdate::Cleared { generation } | SearchUpdate::Match { generation, .. } => {
                *generation
            }
            SearchUpdate::Finished(summary) => summary.generation,
        };
        if generation != current_generation {
            log::trace!("dropping update from stale generation {generation}");
            return false;
        }

        let results = self.ensure_results_session();
        match update {
            SearchUpdate::Cleared { .. } => {
                if let Ok(session) = self.session_mut(results) {
                    session.clear_entries();
                }
                self.publish_entries(results);
            }
            SearchUpdate::Match { entry, .. } => {
                if let Ok(session) = self.session_mut(results) {
                    session.push_entry(entry.clone());
                }
                self.bus.publish(NavigatorEvent::SearchResultEmitted {
                    generation,
                    session: results,
                    entry,
                });
            }
            SearchUpdate::Finished(summary) => {
                self.bus
                    .publish(NavigatorEvent::SearchCompleted { generation, summary });
            }
        }
        true
    }

    fn change_active(&mut self, next: Option<SessionId>) {
        let previous = std::mem::replace(&mut self.active, next);
        log::debug!("active session {previous:?} -> {next:?}");
        self.bus.publish(NavigatorEvent::ActiveSessionChanged {
            previous,
            current: next,
        });
    }

    fn publish_entries(&self, id: SessionId) {
        if let Ok(session) = self.session(id) {
            self.bus.publish(NavigatorEvent::SessionEntriesChanged {
                session: id,
                path: session.current_path().map(str::to_string),
                count: session.entries().len(),
            });
        }
    }
}

fn unknown_session(id: SessionId) -> NavigatorError {
    NavigatorError::InvalidArgument(format!("{id} is not registered"))
}
