//! Change notifications published to the UI layer.

use tokio::sync::broadcast;

use crate::entry::FileEntry;
use crate::search::SearchSummary;
use crate::session::SessionId;

#[derive(Debug, Clone, PartialEq)]
pub enum NavigatorEvent {
    SessionAdded {
        session: SessionId,
    },
    SessionRemoved {
        session: SessionId,
    },
    ActiveSessionChanged {
        previous: Option<SessionId>,
        current: Option<SessionId>,
    },
    SessionEntriesChanged {
        session: SessionId,
        path: Option<String>,
        count: usize,
    },
    PinsChanged {
        list: usize,
    },
    SearchResultEmitted {
        generation: u64,
        session: SessionId,
        entry: FileEntry,
    },
    SearchCompleted {
        generation: u64,
        summary: SearchSummary,
    },
}

/// Fan-out channel for [`NavigatorEvent`]s. Publishing never blocks; slow
/// subscribers lag and lose the oldest events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NavigatorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigatorEvent> {
        self.sender.subscribe()
    }

    /// Publishes to current subscribers. Returns how many received it; having
    /// none is not an error.
    pub fn publish(&self, event: NavigatorEvent) -> usize {
        log::trace!("publishing {event:?}");
        self.sender.send(event).unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

/// Drains everything currently queued on `receiver` without blocking.
pub fn drain_events(receiver: &mut broadcast::Receiver<NavigatorEvent>) -> Vec<NavigatorEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                log::warn!("event subscriber lagged, {skipped} events dropped");
            }
            Err(_) => break,
        }
    }
    events
}
