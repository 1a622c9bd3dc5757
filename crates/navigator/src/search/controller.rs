use std::sync::Arc;
use std::time::{Duration, Instant};

use super::engine::{SearchEngine, SearchRequest, DEFAULT_MAX_RESULTS};
use super::sink::ResultSink;
use crate::cancel::{CancelFlag, GenerationCounter};
use crate::entry::FileEntry;
use crate::error::{NavigatorError, Result};

/// Tuning for [`SearchController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub max_results: usize,
    /// How often `request_search` re-checks the engine while waiting for the
    /// previous generation to stop.
    pub poll_interval: Duration,
    /// Upper bound on that wait.
    pub wait_timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            poll_interval: Duration::from_millis(10),
            wait_timeout: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug)]
struct ActiveGeneration {
    generation: u64,
    cancelled: CancelFlag,
}

/// Owns the engine and makes sure at most one generation runs at a time.
///
/// Starting a new search cancels the previous one, waits until the engine is
/// idle, clears the sink and only then starts the new scan. All methods are
/// meant to be called from one control thread.
pub struct SearchController {
    engine: Arc<SearchEngine>,
    sink: Arc<dyn ResultSink>,
    generations: GenerationCounter,
    active: Option<ActiveGeneration>,
    settings: SearchSettings,
}

impl SearchController {
    pub fn new(engine: Arc<SearchEngine>, sink: Arc<dyn ResultSink>, settings: SearchSettings) -> Self {
        Self {
            engine,
            sink,
            generations: GenerationCounter::new(),
            active: None,
            settings,
        }
    }

    pub fn settings(&self) -> SearchSettings {
        self.settings
    }

    pub fn engine(&self) -> &Arc<SearchEngine> {
        &self.engine
    }

    /// Most recently issued generation, 0 before the first request.
    pub fn current_generation(&self) -> u64 {
        self.generations.current()
    }

    pub fn is_searching(&self) -> bool {
        !self.engine.is_idle()
    }

    /// Starts a new generation searching `corpus` for `token`.
    ///
    /// Returns the generation number, or `None` for a blank token, in which
    /// case the sink is cleared and nothing runs. Fails with `AlreadyRunning`
    /// if the previous generation does not stop within the configured wait.
    pub fn request_search(&mut self, token: &str, corpus: Vec<FileEntry>) -> Result<Option<u64>> {
        self.stop_previous()?;

        let generation = self.generations.next_generation();
        self.sink.clear(generation);

        let token = token.trim();
        if token.is_empty() {
            log::debug!("blank search token, generation {generation} cleared results only");
            return Ok(None);
        }

        let cancelled = CancelFlag::new();
        let request = SearchRequest::new(generation, token, corpus, self.settings.max_results)
            .with_cancel_flag(cancelled.clone());
        self.engine.start(request, Arc::clone(&self.sink))?;
        self.active = Some(ActiveGeneration {
            generation,
            cancelled,
        });
        Ok(Some(generation))
    }

    /// Asks the running generation to stop. Never blocks; returns whether a
    /// generation was asked to stop.
    pub fn cancel(&self) -> bool {
        match &self.active {
            Some(active) if !self.engine.is_idle() => {
                log::debug!("cancelling search generation {}", active.generation);
                active.cancelled.cancel();
                true
            }
            _ => false,
        }
    }

    /// Blocks until the current generation finished, up to `timeout`.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.engine.wait_idle(timeout)
    }

    /// Cancels the running generation and waits, bounded by the configured
    /// timeout, until the engine is idle again.
    pub fn stop_previous(&mut self) -> Result<()> {
        if let Some(active) = &self.active {
            active.cancelled.cancel();
        }

        let deadline = Instant::now() + self.settings.wait_timeout;
        while !self.engine.wait_idle(self.settings.poll_interval) {
            if Instant::now() >= deadline {
                log::warn!(
                    "previous search did not stop within {:?}",
                    self.settings.wait_timeout
                );
                return Err(NavigatorError::AlreadyRunning);
            }
        }
        self.active = None;
        Ok(())
    }
}

impl std::fmt::Debug for SearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController")
            .field("engine", &self.engine)
            .field("generation", &self.current_generation())
            .field("settings", &self.settings)
            .finish()
    }
}
