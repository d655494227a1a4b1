// PanelDock - core/model.rs
//
// Core data model types shared across all layers: views, panel containers,
// per-view visibility declarations and module handles.
// Pure data definitions with no I/O and no UI.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Views
// =============================================================================

/// An application view the side panels can be attached to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Lighttable,
    Darkroom,
    Tethering,
    Map,
    Slideshow,
    Print,
}

impl View {
    /// Returns all views in menu order.
    pub fn all() -> &'static [View] {
        &[
            View::Lighttable,
            View::Darkroom,
            View::Tethering,
            View::Map,
            View::Slideshow,
            View::Print,
        ]
    }

    /// Stable identifier used as a persistence key.
    pub fn name(&self) -> &'static str {
        match self {
            View::Lighttable => "lighttable",
            View::Darkroom => "darkroom",
            View::Tethering => "tethering",
            View::Map => "map",
            View::Slideshow => "slideshow",
            View::Print => "print",
        }
    }

    /// Human-readable label for menus.
    pub fn label(&self) -> &'static str {
        match self {
            View::Lighttable => "Lighttable",
            View::Darkroom => "Darkroom",
            View::Tethering => "Tethering",
            View::Map => "Map",
            View::Slideshow => "Slideshow",
            View::Print => "Print",
        }
    }

    /// Parse a view from its stable identifier (case-insensitive).
    pub fn from_name(name: &str) -> Option<View> {
        let lower = name.trim().to_lowercase();
        View::all().iter().copied().find(|v| v.name() == lower)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Panel containers
// =============================================================================

/// Which side panel a module's expander is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelContainer {
    Left,
    Right,
    Top,
    Bottom,
}

impl PanelContainer {
    pub fn all() -> &'static [PanelContainer] {
        &[
            PanelContainer::Left,
            PanelContainer::Right,
            PanelContainer::Top,
            PanelContainer::Bottom,
        ]
    }
}

// =============================================================================
// Per-view visibility declaration
// =============================================================================

/// The set of views a module declares itself visible in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSet {
    /// Visible in every view.
    All,
    /// Visible only in the listed views.
    Only(&'static [View]),
}

impl ViewSet {
    /// True when `view` is part of the declared set.
    pub fn contains(&self, view: View) -> bool {
        match self {
            ViewSet::All => true,
            ViewSet::Only(views) => views.contains(&view),
        }
    }
}

// =============================================================================
// Module handles
// =============================================================================

/// Generational index into the registry's module arena.
///
/// A handle whose slot has been freed (or reused by a later module) never
/// resolves again, so stale handles cannot reach a destroyed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleHandle {
    index: u32,
    generation: u32,
}

impl ModuleHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_from_name_round_trips_every_view() {
        for view in View::all() {
            assert_eq!(View::from_name(view.name()), Some(*view));
        }
        assert_eq!(View::from_name(" DarkRoom "), Some(View::Darkroom));
        assert_eq!(View::from_name("nonsense"), None);
    }

    #[test]
    fn test_view_set_only_excludes_undeclared_views() {
        let set = ViewSet::Only(&[View::Darkroom, View::Tethering]);
        assert!(set.contains(View::Darkroom));
        assert!(!set.contains(View::Lighttable));
        assert!(ViewSet::All.contains(View::Print));
    }

    #[test]
    fn test_view_serialises_lowercase() {
        let json = serde_json::to_string(&View::Slideshow).unwrap();
        assert_eq!(json, "\"slideshow\"");
    }
}
