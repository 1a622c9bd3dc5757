//! Presentation containers that mirror the registry for a UI layer.
//!
//! A container only keeps the model of what is shown: which sessions have a
//! pane, their titles, entry counts and which pane is focused. Rendering is
//! left to the caller. Containers follow the registry through its events,
//! and the core never knows which variant is in use.

use std::fmt;
use std::str::FromStr;

use crate::error::NavigatorError;
use crate::events::NavigatorEvent;
use crate::registry::BrowserRegistry;
use crate::session::SessionId;

/// One session's slot in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub session: SessionId,
    pub title: String,
    pub entry_count: usize,
}

/// Capability set shared by every container variant.
pub trait BrowserContainer {
    fn mode(&self) -> LayoutMode;
    fn panes(&self) -> &[Pane];
    fn panes_mut(&mut self) -> &mut Vec<Pane>;
    /// Moves focus to `session`, or clears it.
    fn focus(&mut self, session: Option<SessionId>);
    fn focused(&self) -> Option<SessionId>;
    /// Sessions whose panes are currently on screen.
    fn visible(&self) -> Vec<SessionId>;

    /// Adds a pane for `session` unless it already has one.
    fn add(&mut self, session: SessionId, title: &str) {
        if self.pane(session).is_none() {
            self.panes_mut().push(Pane {
                session,
                title: title.to_string(),
                entry_count: 0,
            });
        }
    }

    /// Drops the pane of `session`. Returns whether one existed.
    fn remove(&mut self, session: SessionId) -> bool {
        let panes = self.panes_mut();
        let before = panes.len();
        panes.retain(|pane| pane.session != session);
        let removed = panes.len() != before;
        if removed && self.focused() == Some(session) {
            self.focus(None);
        }
        removed
    }

    fn clear(&mut self) {
        self.panes_mut().clear();
        self.focus(None);
    }

    fn set_title(&mut self, session: SessionId, title: &str) -> bool {
        match self.pane_mut(session) {
            Some(pane) => {
                pane.title = title.to_string();
                true
            }
            None => false,
        }
    }

    fn pane(&self, session: SessionId) -> Option<&Pane> {
        self.panes().iter().find(|pane| pane.session == session)
    }

    fn pane_mut(&mut self, session: SessionId) -> Option<&mut Pane> {
        self.panes_mut()
            .iter_mut()
            .find(|pane| pane.session == session)
    }

    /// Rebuilds every pane from the registry.
    fn populate(&mut self, registry: &BrowserRegistry) {
        self.clear();
        for session in registry.sessions() {
            self.add(session.id(), &session.title());
            if let Some(pane) = self.pane_mut(session.id()) {
                pane.entry_count = session.entries().len();
            }
        }
        self.focus(registry.get_active());
    }

    /// Keeps the container in step with one registry event.
    fn apply_event(&mut self, registry: &BrowserRegistry, event: &NavigatorEvent) {
        match event {
            NavigatorEvent::SessionAdded { session } => {
                if let Ok(found) = registry.session(*session) {
                    self.add(*session, &found.title());
                }
            }
            NavigatorEvent::SessionRemoved { session } => {
                self.remove(*session);
            }
            NavigatorEvent::ActiveSessionChanged { current, .. } => self.focus(*current),
            NavigatorEvent::SessionEntriesChanged { session, count, .. } => {
                let title = registry.session(*session).map(|found| found.title());
                if let Some(pane) = self.pane_mut(*session) {
                    pane.entry_count = *count;
                    if let Ok(title) = title {
                        pane.title = title;
                    }
                }
            }
            NavigatorEvent::SearchResultEmitted { session, .. } => {
                if let Some(pane) = self.pane_mut(*session) {
                    pane.entry_count += 1;
                }
            }
            NavigatorEvent::PinsChanged { .. } | NavigatorEvent::SearchCompleted { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Tabbed,
    Tiled,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tabbed => "tabbed",
            Self::Tiled => "tiled",
        }
    }

    pub fn container(self) -> Box<dyn BrowserContainer> {
        match self {
            Self::Tabbed => Box::new(TabbedContainer::default()),
            Self::Tiled => Box::new(TiledContainer::default()),
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = NavigatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tabbed" | "tabs" => Ok(Self::Tabbed),
            "tiled" | "tiles" => Ok(Self::Tiled),
            other => Err(NavigatorError::InvalidArgument(format!(
                "unknown layout mode {other:?}"
            ))),
        }
    }
}

/// One pane on screen at a time; focus picks the current tab.
#[derive(Debug, Clone, Default)]
pub struct TabbedContainer {
    tabs: Vec<Pane>,
    current: Option<SessionId>,
}

impl BrowserContainer for TabbedContainer {
    fn mode(&self) -> LayoutMode {
        LayoutMode::Tabbed
    }

    fn panes(&self) -> &[Pane] {
        &self.tabs
    }

    fn panes_mut(&mut self) -> &mut Vec<Pane> {
        &mut self.tabs
    }

    fn focus(&mut self, session: Option<SessionId>) {
        self.current = session.filter(|id| self.tabs.iter().any(|tab| tab.session == *id));
    }

    fn focused(&self) -> Option<SessionId> {
        self.current
    }

    fn visible(&self) -> Vec<SessionId> {
        self.current.into_iter().collect()
    }
}

/// Every pane side by side, laid out row-major over `columns`.
#[derive(Debug, Clone)]
pub struct TiledContainer {
    panes: Vec<Pane>,
    focused: Option<SessionId>,
    columns: usize,
}

impl Default for TiledContainer {
    fn default() -> Self {
        Self::with_columns(2)
    }
}

impl TiledContainer {
    pub fn with_columns(columns: usize) -> Self {
        Self {
            panes: Vec::new(),
            focused: None,
            columns: columns.max(1),
        }
    }

    /// `(row, column)` of the pane showing `session`.
    pub fn grid_position(&self, session: SessionId) -> Option<(usize, usize)> {
        self.panes
            .iter()
            .position(|pane| pane.session == session)
            .map(|index| (index / self.columns, index % self.columns))
    }
}

impl BrowserContainer for TiledContainer {
    fn mode(&self) -> LayoutMode {
        LayoutMode::Tiled
    }

    fn panes(&self) -> &[Pane] {
        &self.panes
    }

    fn panes_mut(&mut self) -> &mut Vec<Pane> {
        &mut self.panes
    }

    fn focus(&mut self, session: Option<SessionId>) {
        self.focused = session.filter(|id| self.panes.iter().any(|pane| pane.session == *id));
    }

    fn focused(&self) -> Option<SessionId> {
        self.focused
    }

    fn visible(&self) -> Vec<SessionId> {
        self.panes.iter().map(|pane| pane.session).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{drain_events, EventBus};
    use std::fs;
    use tempfile::TempDir;

    fn follow(container: &mut dyn BrowserContainer, registry: &BrowserRegistry, events: &[NavigatorEvent]) {
        for event in events {
            container.apply_event(registry, event);
        }
    }

    #[test]
    fn tabbed_shows_only_the_active_session() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "").unwrap();
        let mut registry = BrowserRegistry::new(EventBus::new(64));
        let mut rx = registry.bus().subscribe();
        let first = registry.add_session(temp.path()).unwrap();
        let second = registry.add_session(temp.path()).unwrap();

        let mut tabs = TabbedContainer::default();
        follow(&mut tabs, &registry, &drain_events(&mut rx));
        assert_eq!(tabs.panes().len(), 2);
        assert_eq!(tabs.visible(), vec![second]);
        assert_eq!(tabs.pane(first).unwrap().entry_count, 1);

        registry.remove_session(second).unwrap();
        follow(&mut tabs, &registry, &drain_events(&mut rx));
        assert_eq!(tabs.panes().len(), 1);
        assert_eq!(tabs.focused(), Some(first));
    }

    #[test]
    fn tiled_shows_every_session() {
        let temp = TempDir::new().unwrap();
        let mut registry = BrowserRegistry::new(EventBus::new(64));
        let ids: Vec<_> = (0..3)
            .map(|_| registry.add_session(temp.path()).unwrap())
            .collect();

        let mut tiles = TiledContainer::with_columns(2);
        tiles.populate(&registry);
        assert_eq!(tiles.visible(), ids);
        assert_eq!(tiles.focused(), Some(ids[2]));
        assert_eq!(tiles.grid_position(ids[2]), Some((1, 0)));
    }

    #[test]
    fn navigation_retitles_pane() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("music")).unwrap();
        let mut registry = BrowserRegistry::new(EventBus::new(64));
        let id = registry.add_session(temp.path()).unwrap();

        let mut container = LayoutMode::Tiled.container();
        container.populate(&registry);
        let mut rx = registry.bus().subscribe();
        registry.navigate(id, temp.path().join("music")).unwrap();
        follow(container.as_mut(), &registry, &drain_events(&mut rx));

        let pane = container.pane(id).unwrap();
        assert_eq!(pane.title, "music");
        assert_eq!(pane.entry_count, 0);
    }

    #[test]
    fn focus_ignores_unknown_sessions() {
        let mut tabs = TabbedContainer::default();
        tabs.add(SessionId::new(1), "one");
        tabs.focus(Some(SessionId::new(9)));
        assert_eq!(tabs.focused(), None);
        assert!(tabs.set_title(SessionId::new(1), "renamed"));
        assert!(!tabs.remove(SessionId::new(9)));
    }

    #[test]
    fn layout_mode_parses() {
        assert_eq!("Tiled".parse::<LayoutMode>().unwrap(), LayoutMode::Tiled);
        assert_eq!(LayoutMode::default().to_string(), "tabbed");
        assert!("grid".parse::<LayoutMode>().is_err());
    }
}
