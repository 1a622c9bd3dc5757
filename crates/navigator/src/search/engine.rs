//! Single-run search engine.
//!
//! An engine owns a small worker pool and runs at most one scan at a time.
//! The scan walks a snapshot of entries taken on the control thread, matches
//! base names case-insensitively and streams every new match into a
//! [`ResultSink`]. Cancellation is cooperative: the flag is polled before each
//! top-level entry and at every directory boundary.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::sink::ResultSink;
use super::walk::read_children;
use crate::cancel::CancelFlag;
use crate::entry::FileEntry;
use crate::error::{NavigatorError, Result};

/// Matches emitted per generation before the scan stops itself.
pub const DEFAULT_MAX_RESULTS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Completed,
    /// Stopped early, either by request or because the result cap was hit.
    Cancelled,
}

/// What one finished generation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub generation: u64,
    pub outcome: SearchOutcome,
    pub emitted: usize,
    /// True when the run ended because it reached `max_results`.
    pub capped: bool,
    pub scanned_dirs: usize,
    pub errors: usize,
    pub elapsed_ms: u64,
}

impl SearchSummary {
    fn aborted(generation: u64) -> Self {
        Self {
            generation,
            outcome: SearchOutcome::Cancelled,
            emitted: 0,
            capped: false,
            scanned_dirs: 0,
            errors: 1,
            elapsed_ms: 0,
        }
    }
}

/// Everything one scan needs, moved onto the worker thread.
#[derive(Debug)]
pub struct SearchRequest {
    pub generation: u64,
    /// Lowercased search token.
    pub token: String,
    pub max_results: usize,
    /// Snapshot of the entries to scan, in order.
    pub corpus: Vec<FileEntry>,
    /// Paths already emitted in this generation.
    pub seen_paths: HashSet<String>,
    pub cancelled: CancelFlag,
}

impl SearchRequest {
    pub fn new(generation: u64, token: &str, corpus: Vec<FileEntry>, max_results: usize) -> Self {
        Self {
            generation,
            token: token.to_lowercase(),
            max_results,
            corpus,
            seen_paths: HashSet::new(),
            cancelled: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancelled = flag;
        self
    }
}

/// Runs cancellable scans on a dedicated thread pool.
pub struct SearchEngine {
    pool: rayon::ThreadPool,
    state: Mutex<EngineState>,
    idle: Condvar,
    last_summary: Mutex<Option<SearchSummary>>,
}

impl SearchEngine {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|index| format!("navigator-search-{index}"))
            .build()
            .map_err(|error| {
                NavigatorError::Internal(format!("failed to build search pool: {error}"))
            })?;
        Ok(Self {
            pool,
            state: Mutex::new(EngineState::Idle),
            idle: Condvar::new(),
            last_summary: Mutex::new(None),
        })
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.state() == EngineState::Idle
    }

    pub fn last_summary(&self) -> Option<SearchSummary> {
        self.last_summary.lock().clone()
    }

    /// Starts `request` in the background.
    ///
    /// Fails with `AlreadyRunning` unless the engine is idle. The sink's
    /// `finish` is always called, even if the scan panics, and the engine is
    /// back to `Idle` right after.
    pub fn start(self: &Arc<Self>, request: SearchRequest, sink: Arc<dyn ResultSink>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != EngineState::Idle {
                return Err(NavigatorError::AlreadyRunning);
            }
            *state = EngineState::Running;
        }

        log::info!(
            "starting search generation {} for {:?} over {} entries",
            request.generation,
            request.token,
            request.corpus.len()
        );
        let engine = Arc::clone(self);
        self.pool.spawn(move || engine.execute(request, sink));
        Ok(())
    }

    /// Blocks until the engine is idle or `timeout` elapses. Returns whether
    /// it is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while *state != EngineState::Idle {
            if self.idle.wait_until(&mut state, deadline).timed_out() {
                return *state == EngineState::Idle;
            }
        }
        true
    }

    fn execute(&self, request: SearchRequest, sink: Arc<dyn ResultSink>) {
        let generation = request.generation;
        let summary = match catch_unwind(AssertUnwindSafe(|| run_scan(request, sink.as_ref()))) {
            Ok(summary) => summary,
            Err(_) => {
                log::error!("search generation {generation} panicked");
                SearchSummary::aborted(generation)
            }
        };
        self.finish(summary, sink.as_ref());
    }

    fn finish(&self, summary: SearchSummary, sink: &dyn ResultSink) {
        *self.state.lock() = match summary.outcome {
            SearchOutcome::Completed => EngineState::Completed,
            SearchOutcome::Cancelled => EngineState::Cancelled,
        };
        log::info!(
            "search generation {} {:?}: {} matches, {} dirs, {} errors in {}ms",
            summary.generation,
            summary.outcome,
            summary.emitted,
            summary.scanned_dirs,
            summary.errors,
            summary.elapsed_ms
        );
        sink.finish(&summary);
        *self.last_summary.lock() = Some(summary);

        let mut state = self.state.lock();
        *state = EngineState::Idle;
        self.idle.notify_all();
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("state", &self.state().as_str())
            .field("workers", &self.pool.current_num_threads())
            .finish()
    }
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Stop,
}

struct Scan<'a> {
    generation: u64,
    token: String,
    max_results: usize,
    seen: HashSet<String>,
    walked: HashSet<String>,
    cancelled: CancelFlag,
    sink: &'a dyn ResultSink,
    emitted: usize,
    capped: bool,
    scanned_dirs: usize,
    errors: usize,
}

/// Runs one scan to completion on the calling thread.
pub(crate) fn run_scan(request: SearchRequest, sink: &dyn ResultSink) -> SearchSummary {
    let started = Instant::now();
    let SearchRequest {
        generation,
        token,
        max_results,
        corpus,
        seen_paths,
        cancelled,
    } = request;

    let mut scan = Scan {
        generation,
        token,
        max_results,
        seen: seen_paths,
        walked: HashSet::new(),
        cancelled,
        sink,
        emitted: 0,
        capped: false,
        scanned_dirs: 0,
        errors: 0,
    };

    for entry in &corpus {
        if scan.cancelled.is_cancelled() || scan.at_cap() {
            break;
        }
        if entry.name_matches(&scan.token)
            && scan.offer(entry.full_path(), || entry.clone()) == Flow::Stop
        {
            break;
        }
        if entry.is_dir()
            && scan.walked.insert(entry.full_path().to_string())
            && scan.walk(entry.full_path()) == Flow::Stop
        {
            break;
        }
    }

    let outcome = if scan.cancelled.is_cancelled() {
        SearchOutcome::Cancelled
    } else {
        SearchOutcome::Completed
    };
    SearchSummary {
        generation,
        outcome,
        emitted: scan.emitted,
        capped: scan.capped,
        scanned_dirs: scan.scanned_dirs,
        errors: scan.errors,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

impl Scan<'_> {
    /// Sets the cancel flag once the cap is reached.
    fn at_cap(&mut self) -> bool {
        if self.seen.len() >= self.max_results {
            self.capped = true;
            self.cancelled.cancel();
        }
        self.capped
    }

    fn offer(&mut self, path: &str, entry: impl FnOnce() -> FileEntry) -> Flow {
        if self.seen.contains(path) {
            return Flow::Continue;
        }
        if self.at_cap() {
            return Flow::Stop;
        }
        self.seen.insert(path.to_string());
        self.sink.emit(self.generation, entry());
        self.emitted += 1;
        if self.at_cap() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn walk(&mut self, dir: &str) -> Flow {
        // Directory boundary: the only point inside a walk that observes cancellation.
        if self.cancelled.is_cancelled() {
            return Flow::Stop;
        }
        self.scanned_dirs += 1;

        let children = match read_children(dir) {
            Ok(children) => children,
            Err(error) => {
                self.errors += 1;
                log::warn!("search skipped {dir}: {error}");
                return Flow::Continue;
            }
        };

        for child in &children {
            if child.name.to_lowercase().contains(&self.token)
                && self.offer(&child.path, || child.to_file_entry()) == Flow::Stop
            {
                return Flow::Stop;
            }
            if child.descend && self.walk(&child.path) == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::normalize_path;
    use crate::search::CollectingSink;
    use std::fs;
    use tempfile::TempDir;

    fn entry(path: &std::path::Path) -> FileEntry {
        FileEntry::from_path(path).unwrap()
    }

    fn scan(token: &str, corpus: Vec<FileEntry>, max: usize) -> (SearchSummary, CollectingSink) {
        let sink = CollectingSink::new();
        sink.clear(1);
        let summary = run_scan(SearchRequest::new(1, token, corpus, max), &sink);
        (summary, sink)
    }

    #[test]
    fn top_level_then_nested_matches_in_walk_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("foo.txt"), "").unwrap();
        fs::write(root.join("bar.txt"), "").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/foo2.txt"), "").unwrap();

        let corpus = vec![
            entry(&root.join("foo.txt")),
            entry(&root.join("bar.txt")),
            entry(&root.join("sub")),
        ];
        let (summary, sink) = scan("FOO", corpus, DEFAULT_MAX_RESULTS);

        let base = normalize_path(root);
        assert_eq!(
            sink.paths(),
            vec![format!("{base}/foo.txt"), format!("{base}/sub/foo2.txt")]
        );
        assert_eq!(summary.outcome, SearchOutcome::Completed);
        assert_eq!(summary.emitted, 2);
        assert!(!summary.capped);
    }

    #[test]
    fn cap_stops_with_exactly_max_results() {
        let temp = TempDir::new().unwrap();
        for index in 0..10 {
            fs::write(temp.path().join(format!("match-{index}.log")), "").unwrap();
        }
        let (summary, sink) = scan("match", vec![entry(temp.path())], 4);

        assert_eq!(sink.entries().len(), 4);
        assert_eq!(summary.emitted, 4);
        assert!(summary.capped);
        assert_eq!(summary.outcome, SearchOutcome::Cancelled);
    }

    #[test]
    fn paths_reached_twice_are_emitted_once() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("docs")).unwrap();
        fs::write(temp.path().join("docs/note.md"), "").unwrap();

        let docs = entry(&temp.path().join("docs"));
        let note = entry(&temp.path().join("docs/note.md"));
        let corpus = vec![note.clone(), docs.clone(), docs];
        let (summary, sink) = scan("note", corpus, DEFAULT_MAX_RESULTS);

        assert_eq!(sink.paths(), vec![note.full_path().to_string()]);
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.scanned_dirs, 1);
    }

    #[cfg(unix)]
    #[test]
    fn linked_directory_matches_as_directory_without_walking_it() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("real")).unwrap();
        fs::write(temp.path().join("real/linkdir-inner.txt"), "").unwrap();
        fs::create_dir(temp.path().join("root")).unwrap();
        std::os::unix::fs::symlink("../real", temp.path().join("root/linkdir")).unwrap();

        let (summary, sink) = scan(
            "linkdir",
            vec![entry(&temp.path().join("root"))],
            DEFAULT_MAX_RESULTS,
        );

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "linkdir");
        assert!(entries[0].is_dir());
        assert_eq!(summary.scanned_dirs, 1);
    }

    #[test]
    fn pre_seen_paths_are_not_emitted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("seen.txt"), "").unwrap();
        let seen = entry(&temp.path().join("seen.txt"));

        let sink = CollectingSink::new();
        let mut request = SearchRequest::new(1, "seen", vec![seen.clone()], 10);
        request.seen_paths.insert(seen.full_path().to_string());
        let summary = run_scan(request, &sink);
        assert!(sink.entries().is_empty());
        assert_eq!(summary.outcome, SearchOutcome::Completed);
    }

    #[test]
    fn cancelled_before_start_emits_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "").unwrap();

        let flag = CancelFlag::new();
        flag.cancel();
        let sink = CollectingSink::new();
        let request = SearchRequest::new(1, "a", vec![entry(&temp.path().join("a.txt"))], 10)
            .with_cancel_flag(flag);
        let summary = run_scan(request, &sink);
        assert!(sink.entries().is_empty());
        assert_eq!(summary.outcome, SearchOutcome::Cancelled);
        assert!(!summary.capped);
    }

    /// Cancels the scan from inside the sink on the first match.
    struct CancelOnEmit {
        flag: CancelFlag,
        inner: CollectingSink,
    }

    impl ResultSink for CancelOnEmit {
        fn clear(&self, generation: u64) {
            self.inner.clear(generation);
        }
        fn emit(&self, generation: u64, entry: FileEntry) {
            self.flag.cancel();
            self.inner.emit(generation, entry);
        }
        fn finish(&self, summary: &SearchSummary) {
            self.inner.finish(summary);
        }
    }

    #[test]
    fn cancellation_observed_at_next_directory_boundary() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tree");
        let root = root.as_path();
        fs::create_dir(root).unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a/hit-1"), "").unwrap();
        fs::write(root.join("a/hit-2"), "").unwrap();
        fs::create_dir(root.join("a/nested")).unwrap();
        fs::write(root.join("a/nested/hit-3"), "").unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::write(root.join("b/hit-4"), "").unwrap();

        let flag = CancelFlag::new();
        let sink = CancelOnEmit {
            flag: flag.clone(),
            inner: CollectingSink::new(),
        };
        let request = SearchRequest::new(1, "hit", vec![entry(root)], 100).with_cancel_flag(flag);
        let summary = run_scan(request, &sink);

        // The loop over `a` finishes its own matches but never enters `nested` or `b`.
        let base = normalize_path(root);
        assert_eq!(
            sink.inner.paths(),
            vec![format!("{base}/a/hit-1"), format!("{base}/a/hit-2")]
        );
        assert_eq!(summary.outcome, SearchOutcome::Cancelled);
        assert_eq!(summary.scanned_dirs, 2);
    }

    #[test]
    fn unreadable_root_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("gone")).unwrap();
        let gone = entry(&temp.path().join("gone"));
        fs::remove_dir(temp.path().join("gone")).unwrap();
        fs::write(temp.path().join("gone-file.txt"), "").unwrap();

        let corpus = vec![gone, entry(&temp.path().join("gone-file.txt"))];
        let (summary, sink) = scan("gone", corpus, 10);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.outcome, SearchOutcome::Completed);
        // The missing directory still matches by name; the file does too.
        assert_eq!(sink.entries().len(), 2);
    }

    #[test]
    fn engine_rejects_overlapping_runs() {
        let temp = TempDir::new().unwrap();
        let engine = Arc::new(SearchEngine::new(1).unwrap());
        let sink: Arc<dyn ResultSink> = Arc::new(CollectingSink::new());

        // Pretend a run is in flight.
        *engine.state.lock() = EngineState::Running;
        let request = SearchRequest::new(1, "x", vec![entry(temp.path())], 10);
        assert!(matches!(
            engine.start(request, Arc::clone(&sink)),
            Err(NavigatorError::AlreadyRunning)
        ));
        *engine.state.lock() = EngineState::Idle;

        let request = SearchRequest::new(2, "x", vec![entry(temp.path())], 10);
        engine.start(request, sink).unwrap();
        assert!(engine.wait_idle(Duration::from_secs(5)));
        let summary = engine.last_summary().unwrap();
        assert_eq!(summary.generation, 2);
        assert_eq!(summary.outcome, SearchOutcome::Completed);
    }

    #[test]
    fn wait_idle_times_out_while_running() {
        let engine = SearchEngine::new(1).unwrap();
        *engine.state.lock() = EngineState::Running;
        assert!(!engine.wait_idle(Duration::from_millis(20)));
        assert_eq!(engine.state().as_str(), "running");
    }
}
