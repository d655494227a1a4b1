// PanelDock - core/visibility.rs
//
// Visibility resolver: decides whether a module is shown for a given view.
//
// Two independent inputs feed the decision:
//   - the module's static per-view declaration (`ViewSet`), and
//   - the user's visibility flag for that module, persisted per view.
// A module that does not declare a view is never shown there, whatever the
// user flag says.

use crate::core::model::{View, ViewSet};

/// Visibility a module gets in a view the user has never configured.
pub const DEFAULT_USER_VISIBLE: bool = true;

/// Expansion state a module gets in a view the user has never configured.
pub const DEFAULT_EXPANDED: bool = false;

/// True when the module declares `view` in its visibility set.
///
/// Pure function of the declaration and the view identity; independent of
/// the user's visibility flag.
pub fn is_visible_in_view(declared: &ViewSet, view: View) -> bool {
    declared.contains(view)
}

/// Whether the module's widget tree should be shown in `view`.
///
/// `user_visible` is the persisted user flag for this view (None when never
/// set, which falls back to `DEFAULT_USER_VISIBLE`).
pub fn resolve_shown(declared: &ViewSet, view: View, user_visible: Option<bool>) -> bool {
    is_visible_in_view(declared, view) && user_visible.unwrap_or(DEFAULT_USER_VISIBLE)
}

/// Expander state for a module in `view`.
///
/// Non-expandable modules are always shown expanded.
pub fn resolve_expanded(expandable: bool, persisted: Option<bool>) -> bool {
    if !expandable {
        return true;
    }
    persisted.unwrap_or(DEFAULT_EXPANDED)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DARKROOM_ONLY: ViewSet = ViewSet::Only(&[View::Darkroom]);

    #[test]
    fn test_undeclared_view_is_never_visible() {
        for user in [None, Some(true), Some(false)] {
            assert!(!resolve_shown(&DARKROOM_ONLY, View::Lighttable, user));
        }
        assert!(!is_visible_in_view(&DARKROOM_ONLY, View::Map));
    }

    #[test]
    fn test_declared_view_follows_user_flag() {
        assert!(resolve_shown(&DARKROOM_ONLY, View::Darkroom, None));
        assert!(resolve_shown(&DARKROOM_ONLY, View::Darkroom, Some(true)));
        assert!(!resolve_shown(&DARKROOM_ONLY, View::Darkroom, Some(false)));
    }

    #[test]
    fn test_all_views_declaration() {
        for view in View::all() {
            assert!(is_visible_in_view(&ViewSet::All, *view));
        }
    }

    #[test]
    fn test_non_expandable_is_always_expanded() {
        assert!(resolve_expanded(false, Some(false)));
        assert!(!resolve_expanded(true, None));
        assert!(resolve_expanded(true, Some(true)));
    }
}
