//! Cooperative cancellation for search generations.
//!
//! A scan polls its flag at the top of every corpus entry and at every
//! directory boundary of a recursive walk. Polling is never finer than one
//! directory: the matching loop over a single directory listing runs to the
//! end once it has started.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one search generation.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

/// Hands out monotonically increasing search generation numbers.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter and returns the new generation.
    pub fn next_generation(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the latest generation handed out (0 before the first search).
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}
