//! The assembled navigator: configuration, registry, pins and search.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::config::{load_or_create_config, NavigatorConfig};
use crate::entry::FileEntry;
use crate::error::Result;
use crate::events::{EventBus, NavigatorEvent};
use crate::registry::BrowserRegistry;
use crate::search::{ChannelSink, SearchController, SearchEngine, SearchUpdate};
use crate::session::SessionId;
use crate::state::{load_workspace_state, save_workspace_state, RestoreReport, WorkspaceState};

/// Owns every piece of navigator state for one window.
///
/// Construct it once and pass it by reference; all methods run on the
/// control thread. Search output arrives on a channel and is applied by
/// [`Workspace::pump_search_updates`].
#[derive(Debug)]
pub struct Workspace {
    config: NavigatorConfig,
    data_dir: PathBuf,
    registry: BrowserRegistry,
    controller: SearchController,
    updates: mpsc::UnboundedReceiver<SearchUpdate>,
}

impl Workspace {
    pub fn new(config: NavigatorConfig, data_dir: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let bus = EventBus::new(config.event_capacity);
        let engine = Arc::new(SearchEngine::new(config.search_workers)?);
        let (sink, updates) = ChannelSink::channel();
        let controller = SearchController::new(engine, Arc::new(sink), config.search_settings());

        Ok(Self {
            registry: BrowserRegistry::new(bus),
            controller,
            updates,
            data_dir: data_dir.into(),
            config,
        })
    }

    /// Loads (or creates) the config in `data_dir` and restores saved state.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let config = load_or_create_config(&data_dir)?;
        let mut workspace = Self::new(config, data_dir)?;
        workspace.load_state()?;
        Ok(workspace)
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn registry(&self) -> &BrowserRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BrowserRegistry {
        &mut self.registry
    }

    pub fn controller(&self) -> &SearchController {
        &self.controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigatorEvent> {
        self.registry.bus().subscribe()
    }

    /// Restores pins and browsers from disk. Without saved state the shelf
    /// gets its default list and `None` is returned.
    pub fn load_state(&mut self) -> Result<Option<RestoreReport>> {
        match load_workspace_state(&self.data_dir)? {
            Some(state) => state.restore_into(&mut self.registry).map(Some),
            None => {
                self.registry.update_shelf(|shelf| shelf.ensure_default());
                Ok(None)
            }
        }
    }

    pub fn save_state(&self) -> Result<()> {
        save_workspace_state(&self.data_dir, &WorkspaceState::capture(&self.registry))
    }

    /// Opens a browser on the configured start directory when no directory
    /// session exists yet.
    pub fn ensure_start_session(&mut self) -> Result<Option<SessionId>> {
        if self.registry.sessions().iter().any(|session| !session.is_results()) {
            return Ok(None);
        }
        match self.config.start_dir() {
            Some(dir) => self.registry.add_session(dir).map(Some),
            None => Ok(None),
        }
    }

    /// Starts a search over every open listing and every pin.
    ///
    /// The previous generation is stopped before the corpus snapshot is taken.
    /// A blank token clears the results session and starts nothing.
    pub fn request_search(&mut self, token: &str) -> Result<Option<u64>> {
        self.controller.stop_previous()?;
        let results = self.registry.ensure_results_session();
        let corpus = self.registry.snapshot_entries(Some(results));
        let generation = self.controller.request_search(token, corpus)?;
        self.pump_search_updates();
        Ok(generation)
    }

    /// Non-blocking; the worker stops at its next directory boundary.
    pub fn cancel_search(&self) -> bool {
        self.controller.cancel()
    }

    pub fn is_searching(&self) -> bool {
        self.controller.is_searching()
    }

    /// Applies every queued worker update to the results session. Returns
    /// how many were applied; stale ones are dropped.
    pub fn pump_search_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates.try_recv() {
            if self
                .registry
                .apply_search_update(update, self.controller.current_generation())
            {
                applied += 1;
            }
        }
        applied
    }

    /// Waits up to `timeout` for the running search, then applies its
    /// output. Returns whether the engine went idle.
    pub fn wait_for_search(&mut self, timeout: Duration) -> bool {
        let idle = self.controller.wait_idle(timeout);
        self.pump_search_updates();
        idle
    }

    /// Current content of the results session.
    pub fn results(&self) -> &[FileEntry] {
        self.registry
            .results_session()
            .and_then(|id| self.registry.session(id).ok())
            .map(|session| session.entries())
            .unwrap_or_default()
    }
}
