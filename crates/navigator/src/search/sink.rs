//! Destinations for streamed search matches.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::engine::SearchSummary;
use crate::entry::FileEntry;

/// Receives the output of search generations.
///
/// `emit` is called from the worker thread while the scan runs; `clear` is
/// called by the controller on the control thread before a generation starts.
pub trait ResultSink: Send + Sync {
    fn clear(&self, generation: u64);
    fn emit(&self, generation: u64, entry: FileEntry);
    fn finish(&self, summary: &SearchSummary);
}

/// Message carried from the worker thread back to the control thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchUpdate {
    Cleared { generation: u64 },
    Match { generation: u64, entry: FileEntry },
    Finished(SearchSummary),
}

/// Forwards everything over an unbounded channel; the control thread drains
/// the receiver and applies updates to the results session.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<SearchUpdate>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SearchUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, update: SearchUpdate) {
        if self.sender.send(update).is_err() {
            log::debug!("search update dropped, receiver closed");
        }
    }
}

impl ResultSink for ChannelSink {
    fn clear(&self, generation: u64) {
        self.send(SearchUpdate::Cleared { generation });
    }

    fn emit(&self, generation: u64, entry: FileEntry) {
        self.send(SearchUpdate::Match { generation, entry });
    }

    fn finish(&self, summary: &SearchSummary) {
        self.send(SearchUpdate::Finished(summary.clone()));
    }
}

#[derive(Debug, Default)]
struct Collected {
    generation: u64,
    entries: Vec<FileEntry>,
    summaries: Vec<SearchSummary>,
}

/// Keeps matches in memory. `clear` drops earlier output.
#[derive(Debug, Default)]
pub struct CollectingSink {
    inner: Mutex<Collected>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<FileEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|entry| entry.full_path().to_string())
            .collect()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn summaries(&self) -> Vec<SearchSummary> {
        self.inner.lock().summaries.clone()
    }
}

impl ResultSink for CollectingSink {
    fn clear(&self, generation: u64) {
        let mut inner = self.inner.lock();
        inner.generation = generation;
        inner.entries.clear();
    }

    fn emit(&self, generation: u64, entry: FileEntry) {
        let mut inner = self.inner.lock();
        if generation != inner.generation {
            log::warn!(
                "match from generation {generation} arrived while collecting {}",
                inner.generation
            );
        }
        inner.entries.push(entry);
    }

    fn finish(&self, summary: &SearchSummary) {
        self.inner.lock().summaries.push(summary.clone());
    }
}
