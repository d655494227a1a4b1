// PanelDock - app/module.rs
//
// The module capability interface and the registry's per-module instance.
//
// Modules are registered statically through `ModuleFactory` entries (the
// discovery catalog) rather than loaded from shared objects at runtime. Each
// factory builds one boxed `LibModule`; the registry wraps it in a
// `ModuleInstance` that carries identity and visual state.

use crate::core::deferred::{DeferredQueue, TimerTicket};
use crate::core::model::{ModuleHandle, PanelContainer, View, ViewSet};
use crate::core::preset::BuiltinPreset;
use crate::core::proxy::ProxyContext;
use crate::util::error::ModuleError;
use std::any::Any;
use std::time::Instant;

/// A deferred update function; receives the module it was queued for.
pub type PostponedUpdate = Box<dyn FnOnce(&mut dyn LibModule)>;

/// Build a postponed update that runs against the concrete module type `M`.
///
/// If the instance is not an `M` the update is skipped with a warning.
pub fn update_as<M: LibModule + 'static>(f: impl FnOnce(&mut M) + 'static) -> PostponedUpdate {
    Box::new(move |module: &mut dyn LibModule| {
        let name = module.name().to_string();
        match module.as_any_mut().downcast_mut::<M>() {
            Some(concrete) => f(concrete),
            None => tracing::warn!(module = %name, "Postponed update type mismatch, skipped"),
        }
    })
}

// =============================================================================
// Module context
// =============================================================================

/// What a module can reach while one of its hooks runs.
pub struct ModuleContext<'a> {
    pub(crate) handle: ModuleHandle,
    pub(crate) view: View,
    pub(crate) proxy: &'a mut ProxyContext,
    pub(crate) postponed: &'a mut DeferredQueue<ModuleHandle, PostponedUpdate>,
}

impl<'a> ModuleContext<'a> {
    /// Handle of the module this context belongs to.
    pub fn handle(&self) -> ModuleHandle {
        self.handle
    }

    /// The currently active view.
    pub fn view(&self) -> View {
        self.view
    }

    pub fn proxy(&mut self) -> &mut ProxyContext {
        self.proxy
    }

    /// Queue `update` to run once after the debounce delay, replacing any
    /// update already pending for this module.
    pub fn queue_postponed_update(&mut self, update: PostponedUpdate) -> TimerTicket {
        let (ticket, replaced) = self.postponed.schedule(self.handle, update, Instant::now());
        tracing::trace!(module = %self.handle, replaced, "Postponed update queued");
        ticket
    }

    /// Cancel this module's pending update, if any.
    pub fn cancel_postponed_update(&mut self) {
        self.postponed.cancel(self.handle);
    }

    pub fn has_postponed_update(&self) -> bool {
        self.postponed.is_pending(self.handle)
    }
}

// =============================================================================
// Capability interface
// =============================================================================

/// A side-panel module.
///
/// Only identity, placement and `as_any_mut` are required; every other hook
/// has a default so small modules stay small.
pub trait LibModule {
    /// Stable plugin name, used as the persistence key (at most 127 bytes).
    fn name(&self) -> &str;

    /// Localised display name.
    fn display_name(&self) -> String {
        self.name().to_string()
    }

    /// Parameter schema version.
    fn version(&self) -> i32 {
        1
    }

    /// Views this module is declared visible in.
    fn views(&self) -> ViewSet;

    /// Side panel the module's expander lives in.
    fn container(&self) -> PanelContainer;

    /// Sort priority within the registry; higher values sort first.
    fn position(&self) -> i32 {
        0
    }

    /// Whether the module can be collapsed.
    fn expandable(&self) -> bool {
        true
    }

    /// Constructor hook. An error excludes the module from the registry.
    fn init(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Destructor hook, called before the instance is dropped.
    fn cleanup(&mut self, _ctx: &mut ModuleContext<'_>) {}

    /// Called when a view the module is declared in becomes active.
    fn view_enter(&mut self, _ctx: &mut ModuleContext<'_>, _old: Option<View>, _new: View) {}

    /// Called when a view the module is declared in is left.
    fn view_leave(&mut self, _ctx: &mut ModuleContext<'_>, _old: View, _new: View) {}

    /// Widget builder; draws the module's body inside its expander.
    fn gui(&mut self, _ui: &mut egui::Ui, _ctx: &mut ModuleContext<'_>) {}

    /// Restore default parameters (the "reset" accelerator).
    fn gui_reset(&mut self) {}

    /// Current parameter blob, if the module has parameters.
    fn params(&self) -> Option<Vec<u8>> {
        None
    }

    /// Apply a parameter blob. Must leave the module unchanged on error.
    fn set_params(&mut self, _params: &[u8]) -> Result<(), ModuleError> {
        Err(ModuleError::ParamsUnsupported {
            name: self.name().to_string(),
        })
    }

    /// Upgrade a blob saved for `old_version` by one or more steps.
    ///
    /// Returns the new blob and the version it now matches.
    fn legacy_params(&self, _old: &[u8], _old_version: i32) -> Option<(Vec<u8>, i32)> {
        None
    }

    /// Presets shipped with the module; installed read-only at load.
    fn builtin_presets(&self) -> Vec<BuiltinPreset> {
        Vec::new()
    }

    /// Whether auto-apply presets are honoured for this module.
    fn preset_autoapply(&self) -> bool {
        false
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Catalog entry used for module discovery.
#[derive(Clone, Copy)]
pub struct ModuleFactory {
    /// Name used in load diagnostics before the module exists.
    pub name: &'static str,
    pub create: fn() -> Box<dyn LibModule>,
}

impl ModuleFactory {
    pub fn new(name: &'static str, create: fn() -> Box<dyn LibModule>) -> Self {
        Self { name, create }
    }
}

// =============================================================================
// Module instance
// =============================================================================

/// Visual state of the module's expander widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Expander {
    /// Whether the widget tree is shown in the current view.
    pub shown: bool,
    /// Whether the body is expanded.
    pub expanded: bool,
}

/// One loaded module and its identity and visual state.
pub struct ModuleInstance {
    pub(crate) handle: ModuleHandle,
    pub(crate) name: String,
    pub(crate) display_name: String,
    pub(crate) version: i32,
    pub(crate) views: ViewSet,
    pub(crate) container: PanelContainer,
    pub(crate) position: i32,
    pub(crate) expandable: bool,
    pub(crate) visible: bool,
    pub(crate) expander: Expander,
    pub(crate) module: Box<dyn LibModule>,
}

impl ModuleInstance {
    /// Capture the module's static metadata once at load.
    pub(crate) fn new(handle: ModuleHandle, module: Box<dyn LibModule>) -> Self {
        Self {
            handle,
            name: module.name().to_string(),
            display_name: module.display_name(),
            version: module.version(),
            views: module.views(),
            container: module.container(),
            position: module.position(),
            expandable: module.expandable(),
            visible: false,
            expander: Expander::default(),
            module,
        }
    }

    pub fn handle(&self) -> ModuleHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn views(&self) -> ViewSet {
        self.views
    }

    pub fn container(&self) -> PanelContainer {
        self.container
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn expandable(&self) -> bool {
        self.expandable
    }

    pub fn expander(&self) -> Expander {
        self.expander
    }

    /// The module itself, for read-only queries.
    pub fn module(&self) -> &dyn LibModule {
        self.module.as_ref()
    }

    pub fn module_mut(&mut self) -> &mut dyn LibModule {
        self.module.as_mut()
    }
}

impl std::fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("position", &self.position)
            .field("visible", &self.visible)
            .field("expander", &self.expander)
            .finish()
    }
}
