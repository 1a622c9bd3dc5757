//! Background substring search over a corpus snapshot.
//!
//! This module provides:
//! - The engine that runs one cancellable scan on a worker pool
//! - The controller that serializes generations so scans never overlap
//! - Result sinks that stream matches back to the control thread

mod controller;
mod engine;
mod sink;
mod walk;

pub use controller::{SearchController, SearchSettings};
pub use engine::{
    EngineState, SearchEngine, SearchOutcome, SearchRequest, SearchSummary, DEFAULT_MAX_RESULTS,
};
pub use sink::{ChannelSink, CollectingSink, ResultSink, SearchUpdate};
