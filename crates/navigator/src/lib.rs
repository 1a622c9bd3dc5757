//! Desktop file-navigation workspace core.
//!
//! This crate provides:
//! - Browser sessions with a movable visit history
//! - Named pin lists that sort by name, type, usage, size or date added
//! - A registry of open sessions with active-session notifications
//! - A cancellable background substring search streaming into a results session
//! - Persisted workspace state and a JSON configuration layer

pub mod cancel;
pub mod config;
pub mod drag;
pub mod entry;
pub mod error;
pub mod events;
pub mod favorites;
pub mod layout;
pub mod registry;
pub mod search;
pub mod session;
pub mod state;
pub mod workspace;

// Re-export main types
pub use cancel::{CancelFlag, GenerationCounter};
pub use config::{default_data_dir, load_or_create_config, NavigatorConfig};
pub use drag::{DragPayload, DragSource};
pub use entry::{Color, EntryRecord, FileEntry, SortCriterion, SortToken};
pub use error::{NavigatorError, Result};
pub use events::{drain_events, EventBus, NavigatorEvent};
pub use favorites::{FavoritesList, PinShelf};
pub use layout::{BrowserContainer, LayoutMode, Pane, TabbedContainer, TiledContainer};
pub use registry::BrowserRegistry;
pub use search::{
    EngineState, ResultSink, SearchController, SearchEngine, SearchOutcome, SearchRequest,
    SearchSettings, SearchSummary, SearchUpdate,
};
pub use session::{BrowserSession, History, OpenTarget, SessionId, SessionKind};
pub use state::{load_workspace_state, save_workspace_state, WorkspaceState};
pub use workspace::Workspace;
