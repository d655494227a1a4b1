// PanelDock - app/layout.rs
//
// Layout persistence: per-view module visibility and expander state, plus the
// last active view, saved between application restarts.
//
// Design principles:
// - Saved atomically (write temp, rename) so a crash during save never
//   corrupts the previous good layout.
// - Load errors are discarded (corrupt or incompatible files just start with
//   default visibility) rather than surfaced to the user.
// - Modules that were never configured for a view fall back to the
//   visibility resolver's defaults.

use crate::core::model::View;
use crate::util::constants::LAYOUT_FILE_NAME;
use crate::util::error::{PanelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Version stamp for forward-compatibility checks.
///
/// Version mismatches silently discard the layout.
pub const LAYOUT_VERSION: u32 = 1;

/// Persisted state of one module in one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleLayout {
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub expanded: Option<bool>,
}

/// Complete persistent layout snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutData {
    /// Schema version, must equal `LAYOUT_VERSION` to be accepted.
    pub version: u32,

    /// View that was active when the layout was saved.
    #[serde(default)]
    pub last_view: Option<View>,

    /// view name -> module name -> state.
    #[serde(default)]
    pub views: BTreeMap<String, BTreeMap<String, ModuleLayout>>,
}

impl Default for LayoutData {
    fn default() -> Self {
        Self {
            version: LAYOUT_VERSION,
            last_view: None,
            views: BTreeMap::new(),
        }
    }
}

impl LayoutData {
    pub fn get(&self, view: View, module: &str) -> ModuleLayout {
        self.views
            .get(view.name())
            .and_then(|m| m.get(module))
            .copied()
            .unwrap_or_default()
    }

    fn entry(&mut self, view: View, module: &str) -> &mut ModuleLayout {
        self.views
            .entry(view.name().to_string())
            .or_default()
            .entry(module.to_string())
            .or_default()
    }

    pub fn set_visible(&mut self, view: View, module: &str, visible: bool) {
        self.entry(view, module).visible = Some(visible);
    }

    pub fn set_expanded(&mut self, view: View, module: &str, expanded: bool) {
        self.entry(view, module).expanded = Some(expanded);
    }
}

// =============================================================================
// I/O helpers
// =============================================================================

/// Resolve the layout file path from the platform data directory.
pub fn layout_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LAYOUT_FILE_NAME)
}

/// Save `data` to `path` atomically (write temp, rename).
///
/// Callers typically log the error and carry on.
pub fn save(data: &LayoutData, path: &Path) -> Result<()> {
    let io_error = |path: &Path, operation: &'static str| {
        let path = path.to_path_buf();
        move |source: std::io::Error| PanelError::Io {
            path,
            operation,
            source,
        }
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(parent, "create layout directory"))?;
    }

    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io_error(path, "serialise layout")(std::io::Error::other(e)))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes()).map_err(io_error(&tmp, "write layout temp file"))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_error(path, "finalise layout file")(e));
    }

    tracing::debug!(path = %path.display(), "Layout saved");
    Ok(())
}

/// Load and validate a `LayoutData` from `path`.
///
/// Returns `None` on any error (file not found, JSON parse failure, version
/// mismatch). The caller should treat `None` as "start with defaults".
pub fn load(path: &Path) -> Option<LayoutData> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read layout file");
            }
        })
        .ok()?;

    let data: LayoutData = serde_json::from_str(&content)
        .map_err(|e| {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Layout file is malformed, using defaults"
            );
        })
        .ok()?;

    if data.version != LAYOUT_VERSION {
        tracing::warn!(
            found = data.version,
            expected = LAYOUT_VERSION,
            "Layout file version mismatch, using defaults"
        );
        return None;
    }

    tracing::info!(path = %path.display(), "Layout file loaded");
    Some(data)
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_data() -> LayoutData {
        let mut data = LayoutData {
            last_view: Some(View::Darkroom),
            ..Default::default()
        };
        data.set_visible(View::Darkroom, "histogram", false);
        data.set_expanded(View::Darkroom, "histogram", true);
        data.set_expanded(View::Lighttable, "image_information", true);
        data
    }

    #[test]
    fn test_layout_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        let original = sample_data();

        save(&original, &path).expect("save should succeed");
        let loaded = load(&path).expect("load should return Some after valid save");

        assert_eq!(loaded, original);
        assert_eq!(loaded.last_view, Some(View::Darkroom));
        let h = loaded.get(View::Darkroom, "histogram");
        assert_eq!(h.visible, Some(false));
        assert_eq!(h.expanded, Some(true));
    }

    #[test]
    fn test_unconfigured_module_has_no_persisted_state() {
        let data = sample_data();
        assert_eq!(data.get(View::Map, "histogram"), ModuleLayout::default());
        assert_eq!(data.get(View::Lighttable, "image_information").visible, None);
    }

    #[test]
    fn test_layout_load_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir.path().join("nonexistent.json")).is_none());
    }

    #[test]
    fn test_layout_load_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, b"not valid json {{{{").unwrap();
        assert!(load(&path).is_none());
    }

    #[test]
    fn test_layout_load_wrong_version_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        let mut data = sample_data();
        data.version = 99;
        save(&data, &path).unwrap();
        assert!(load(&path).is_none());
    }
}
