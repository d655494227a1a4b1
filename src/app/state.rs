// PanelDock - app/state.rs
//
// Application state owned by the eframe::App implementation: the module
// registry, the accelerator table, validated configuration and the small
// amount of UI state the panels share (status line, warnings, dialogs).

use crate::app::accels::{AccelMap, CommonAction};
use crate::app::layout;
use crate::app::registry::Registry;
use crate::core::model::{ModuleHandle, View};
use crate::platform::config::AppConfig;
use std::path::PathBuf;

/// Edit buffer of the preset dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetEditor {
    pub module: String,
    pub version: i32,
    /// Preset being edited; None when storing a new preset.
    pub original: Option<String>,
    pub name: String,
    pub description: String,
}

/// Top-level application state.
pub struct AppState {
    /// Every loaded module and its shared services.
    pub registry: Registry,

    /// Shortcut table filled by the registry at load.
    pub accels: AccelMap,

    /// Validated configuration from config.toml.
    pub config: AppConfig,

    /// Where the panel layout is saved on exit.
    pub layout_path: PathBuf,

    /// Status message for the status bar.
    pub status_message: String,

    /// Non-fatal warnings from startup and preset operations.
    pub warnings: Vec<String>,

    /// Whether the demo image pipeline should run.
    pub pipeline_enabled: bool,

    /// Open preset dialog, if any.
    pub preset_editor: Option<PresetEditor>,

    /// Module whose presets menu was requested through its shortcut.
    pub presets_menu_for: Option<ModuleHandle>,

    pub show_about: bool,
    pub show_options: bool,
    pub show_warnings: bool,

    /// Whether debug mode is enabled.
    pub debug_mode: bool,
}

impl AppState {
    pub fn new(
        registry: Registry,
        accels: AccelMap,
        config: AppConfig,
        layout_path: PathBuf,
        debug_mode: bool,
    ) -> Self {
        let status_message = format!(
            "Ready. {} modules loaded in {}.",
            registry.len(),
            registry.view().label()
        );
        Self {
            registry,
            accels,
            config,
            layout_path,
            status_message,
            warnings: Vec::new(),
            pipeline_enabled: true,
            preset_editor: None,
            presets_menu_for: None,
            show_about: false,
            show_options: false,
            show_warnings: false,
            debug_mode,
        }
    }

    /// Switch the active view and report it on the status line.
    pub fn switch_view(&mut self, view: View) {
        if self.registry.view() == view {
            return;
        }
        self.registry.switch_view(view);
        self.presets_menu_for = None;
        self.status_message = format!("{} view.", view.label());
    }

    /// Persist the panel layout. Failures become warnings.
    pub fn save_layout(&mut self) {
        if let Err(e) = layout::save(self.registry.layout(), &self.layout_path) {
            tracing::warn!(error = %e, "Failed to save layout");
            self.warnings.push(e.to_string());
        }
    }

    /// Run a common accelerator by its dispatcher path.
    ///
    /// Returns false when the path is not bound or its module is gone.
    pub fn dispatch_accel(&mut self, path: &str) -> bool {
        let Some((module, action)) = self
            .accels
            .resolve(path)
            .map(|(m, a)| (m.to_string(), a))
        else {
            return false;
        };
        let Some(handle) = self.registry.handle_of(&module) else {
            return false;
        };
        match action {
            CommonAction::Reset => {
                if self.registry.reset_module(handle) {
                    let label = self.registry.localized_name(&module).to_string();
                    self.status_message = format!("{label} reset to defaults.");
                }
            }
            CommonAction::Presets => {
                self.registry.set_gui_module(Some(handle));
                self.presets_menu_for = Some(handle);
            }
        }
        true
    }

    /// Run `action` on the focused module, if any.
    pub fn dispatch_focused(&mut self, action: CommonAction) -> bool {
        let Some(name) = self
            .registry
            .gui_module()
            .and_then(|h| self.registry.get(h))
            .map(|m| m.name().to_string())
        else {
            return false;
        };
        self.dispatch_accel(&AccelMap::path_for(&name, action))
    }

    /// Apply a stored preset to its module and report the outcome.
    pub fn apply_preset(&mut self, module: &str, name: &str, version: i32) {
        match self.registry.apply_preset(name, module, version) {
            Ok(()) => {
                self.status_message = format!("Preset '{name}' applied.");
            }
            Err(e) => self.report_preset_error(e),
        }
    }

    /// Open the preset dialog to store the module's current parameters.
    pub fn begin_store_preset(&mut self, handle: ModuleHandle) {
        let Some(instance) = self.registry.get(handle) else {
            return;
        };
        self.preset_editor = Some(PresetEditor {
            module: instance.name().to_string(),
            version: instance.version(),
            original: None,
            name: String::new(),
            description: String::new(),
        });
    }

    /// Open the preset dialog on an existing preset.
    pub fn begin_edit_preset(&mut self, module: &str, name: &str, version: i32) {
        let Some(preset) = self.registry.presets().get(name, module, version) else {
            return;
        };
        self.preset_editor = Some(PresetEditor {
            module: module.to_string(),
            version,
            original: Some(name.to_string()),
            name: name.to_string(),
            description: preset.description,
        });
    }

    /// Commit the preset dialog.
    ///
    /// A new preset captures the live module parameters and must not reuse
    /// a taken name; an edit keeps the stored parameters and changes only
    /// name and description. On error the dialog stays open.
    pub fn commit_preset_editor(&mut self) {
        let Some(editor) = self.preset_editor.clone() else {
            return;
        };
        let result = match &editor.original {
            None => {
                let params = self
                    .registry
                    .lookup(&editor.module)
                    .and_then(|m| m.module().params())
                    .unwrap_or_default();
                self.registry.presets_mut().create(
                    &editor.name,
                    &editor.module,
                    editor.version,
                    &editor.description,
                    &params,
                )
            }
            Some(original) => {
                let params = self
                    .registry
                    .presets()
                    .get(original, &editor.module, editor.version)
                    .map(|p| p.params)
                    .unwrap_or_default();
                self.registry.presets_mut().update(
                    original,
                    &editor.module,
                    editor.version,
                    &editor.name,
                    &editor.description,
                    &params,
                )
            }
        };

        match result {
            Ok(()) => {
                self.status_message = format!("Preset '{}' saved.", editor.name);
                self.preset_editor = None;
            }
            Err(e) => self.report_preset_error(e),
        }
    }

    /// Clone a preset under a free name.
    pub fn duplicate_preset(&mut self, module: &str, name: &str, version: i32) {
        match self.registry.presets_mut().duplicate(name, module, version) {
            Ok(copy) => self.status_message = format!("Preset duplicated as '{copy}'."),
            Err(e) => self.report_preset_error(e),
        }
    }

    pub fn remove_preset(&mut self, module: &str, name: &str, version: i32) {
        match self.registry.presets_mut().remove(name, module, version) {
            Ok(()) => self.status_message = format!("Preset '{name}' removed."),
            Err(e) => self.report_preset_error(e),
        }
    }

    pub fn set_preset_autoapply(&mut self, module: &str, name: &str, version: i32, on: bool) {
        if let Err(e) = self
            .registry
            .presets_mut()
            .set_autoapply(name, module, version, on)
        {
            self.report_preset_error(e);
        }
    }

    fn report_preset_error(&mut self, e: crate::util::error::PresetError) {
        tracing::warn!(error = %e, "Preset operation failed");
        self.status_message = format!("Preset error: {e}");
        self.warnings.push(e.to_string());
    }
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::layout::LayoutData;
    use crate::app::preset_store::MemoryPresetStore;
    use crate::app::registry::RegistryConfig;
    use crate::modules::{builtin_catalog, histogram};

    fn state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let config = RegistryConfig {
            view: View::Darkroom,
            ..RegistryConfig::default()
        };
        let mut registry = Registry::new(
            config,
            Box::new(MemoryPresetStore::new()),
            LayoutData::default(),
        );
        let mut accels = AccelMap::new();
        let errors = registry.initialize(&builtin_catalog(), &mut accels);
        assert!(errors.is_empty());
        let path = dir.path().join("layout.json");
        (
            AppState::new(registry, accels, AppConfig::default(), path, false),
            dir,
        )
    }

    #[test]
    fn test_store_new_preset_captures_live_params() {
        let (mut s, _dir) = state();
        let handle = s.registry.handle_of(histogram::NAME).unwrap();
        s.begin_store_preset(handle);
        if let Some(editor) = s.preset_editor.as_mut() {
            editor.name = "mine".to_string();
            editor.description = "my scale".to_string();
        }
        s.commit_preset_editor();
        assert!(s.preset_editor.is_none());

        let stored = s
            .registry
            .presets()
            .get("mine", histogram::NAME, histogram::VERSION)
            .unwrap();
        assert_eq!(stored.description, "my scale");
        assert!(!stored.readonly);
        let live = s.registry.lookup(histogram::NAME).unwrap().module().params();
        assert_eq!(Some(stored.params), live);
    }

    #[test]
    fn test_store_new_preset_with_taken_name_is_rejected() {
        let (mut s, _dir) = state();
        let handle = s.registry.handle_of(histogram::NAME).unwrap();
        s.registry
            .presets_mut()
            .add_or_replace("taken", histogram::NAME, histogram::VERSION, b"{}", true)
            .unwrap();

        s.begin_store_preset(handle);
        if let Some(editor) = s.preset_editor.as_mut() {
            editor.name = "taken".to_string();
            editor.description = "replacement".to_string();
        }
        s.commit_preset_editor();

        assert!(s.preset_editor.is_some());
        assert!(s.warnings.iter().any(|w| w.contains("already exists")));
        let kept = s
            .registry
            .presets()
            .get("taken", histogram::NAME, histogram::VERSION)
            .unwrap();
        assert_eq!(kept.params, b"{}".to_vec());
        assert!(kept.readonly);
        assert!(kept.description.is_empty());
    }

    #[test]
    fn test_empty_name_keeps_dialog_open() {
        let (mut s, _dir) = state();
        let handle = s.registry.handle_of(histogram::NAME).unwrap();
        s.begin_store_preset(handle);
        s.commit_preset_editor();
        assert!(s.preset_editor.is_some());
        assert!(!s.warnings.is_empty());
    }

    #[test]
    fn test_presets_accel_focuses_module() {
        let (mut s, _dir) = state();
        assert!(s.dispatch_accel("histogram/presets"));
        let handle = s.registry.handle_of(histogram::NAME);
        assert_eq!(s.registry.gui_module(), handle);
        assert_eq!(s.presets_menu_for, handle);
        assert!(s.dispatch_focused(CommonAction::Reset));
        assert!(!s.dispatch_accel("nothing/reset"));
    }

    #[test]
    fn test_save_layout_writes_last_view() {
        let (mut s, _dir) = state();
        s.switch_view(View::Lighttable);
        s.save_layout();
        let loaded = layout::load(&s.layout_path).unwrap();
        assert_eq!(loaded.last_view, Some(View::Lighttable));
    }
}
