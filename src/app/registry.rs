// PanelDock - app/registry.rs
//
// Module registry: owns every loaded module instance, their display order,
// the focused-module handle, the postponed-update queue, the proxy context
// and the preset adapter.
//
// Architecture:
//   - Instances live in a generational arena. `ModuleHandle`s held anywhere
//     else (gui_module, proxy owners, queued updates) stop resolving the
//     moment their slot is freed, so they can never reach a destroyed module.
//   - `order` holds handles sorted by `sort_comparator`; it is the display
//     order and the teardown order (reversed).
//   - All methods run on the UI thread. Only the proxy context is shared
//     with background producers, through `PipelineProxy`.

use crate::app::accels::AcceleratorSink;
use crate::app::layout::LayoutData;
use crate::app::module::{
    LibModule, ModuleContext, ModuleFactory, ModuleInstance, PostponedUpdate,
};
use crate::app::preset_store::PresetStore;
use crate::app::presets::PresetAdapter;
use crate::core::deferred::{DeferredQueue, TimerTicket};
use crate::core::model::{ModuleHandle, PanelContainer, View};
use crate::core::preset::{Preset, PresetKey, ReadonlyPolicy};
use crate::core::proxy::{PipelineProxy, ProxyContext};
use crate::core::visibility;
use crate::util::constants::{
    DEFAULT_POSTPONED_UPDATE_MS, MAX_LEGACY_UPGRADE_STEPS, MAX_MODULES, MAX_MODULE_NAME_LEN,
};
use crate::util::error::{ModuleError, PresetError};
use chrono::Utc;
use std::cmp::Ordering;
use std::time::{Duration, Instant};

/// Registry construction options.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// View active when the registry starts.
    pub view: View,
    /// Debounce delay of postponed updates.
    pub postponed_delay: Duration,
    /// How preset writes treat read-only presets.
    pub readonly_policy: ReadonlyPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            view: View::default(),
            postponed_delay: Duration::from_millis(DEFAULT_POSTPONED_UPDATE_MS),
            readonly_policy: ReadonlyPolicy::default(),
        }
    }
}

/// Outcome of one auto-apply pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutoApplyReport {
    /// (module, preset) pairs that were applied.
    pub applied: Vec<(String, String)>,
    /// Eligible presets saved for another parameter version; skipped.
    pub stale: Vec<PresetKey>,
    /// Presets the module refused.
    pub rejected: Vec<PresetKey>,
}

/// Total display order: higher `position` first, ties broken by name.
pub fn sort_comparator(a: &ModuleInstance, b: &ModuleInstance) -> Ordering {
    b.position()
        .cmp(&a.position())
        .then_with(|| a.name().cmp(b.name()))
}

/// Check a plugin name against the persisted key rules.
fn validate_name(name: &str) -> Result<(), ModuleError> {
    if name.is_empty() {
        return Err(ModuleError::EmptyName);
    }
    if name.len() > MAX_MODULE_NAME_LEN {
        return Err(ModuleError::NameTooLong {
            name: name.to_string(),
            length: name.len(),
            max_length: MAX_MODULE_NAME_LEN,
        });
    }
    Ok(())
}

struct Slot {
    generation: u32,
    instance: Option<ModuleInstance>,
}

fn instance_in(slots: &[Slot], handle: ModuleHandle) -> Option<&ModuleInstance> {
    slots
        .get(handle.index())
        .filter(|s| s.generation == handle.generation())
        .and_then(|s| s.instance.as_ref())
}

/// Owner of all loaded modules and their shared services.
pub struct Registry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    order: Vec<ModuleHandle>,
    gui_module: Option<ModuleHandle>,
    postponed: DeferredQueue<ModuleHandle, PostponedUpdate>,
    proxy: ProxyContext,
    presets: PresetAdapter,
    layout: LayoutData,
    view: View,
}

impl Registry {
    pub fn new(config: RegistryConfig, store: Box<dyn PresetStore>, layout: LayoutData) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            gui_module: None,
            postponed: DeferredQueue::new(config.postponed_delay),
            proxy: ProxyContext::new(),
            presets: PresetAdapter::new(store, config.readonly_policy),
            layout,
            view: config.view,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load every module of `catalog`.
    ///
    /// A module that fails validation or initialisation is logged and
    /// skipped; the rest of the catalog still loads. Returns the per-module
    /// errors encountered.
    pub fn initialize(
        &mut self,
        catalog: &[ModuleFactory],
        accels: &mut dyn AcceleratorSink,
    ) -> Vec<ModuleError> {
        let mut errors = Vec::new();

        for factory in catalog {
            let module = (factory.create)();
            match self.load_module(module, accels) {
                Ok(handle) => {
                    tracing::debug!(factory = factory.name, handle = %handle, "Module loaded");
                }
                Err(e) => {
                    tracing::warn!(factory = factory.name, error = %e, "Module skipped");
                    errors.push(e);
                }
            }
        }

        // Modules declared in the start-up view see it being entered.
        let view = self.view;
        for handle in self.order.clone() {
            if self.is_visible_in_view(handle, view) {
                self.with_module(handle, |m, ctx| m.view_enter(ctx, None, view));
            }
        }

        tracing::info!(
            loaded = self.order.len(),
            skipped = errors.len(),
            view = %view,
            "Module registry initialised"
        );
        errors
    }

    /// Load a single module instance and insert it in display order.
    pub fn load_module(
        &mut self,
        mut module: Box<dyn LibModule>,
        accels: &mut dyn AcceleratorSink,
    ) -> Result<ModuleHandle, ModuleError> {
        let name = module.name().to_string();
        validate_name(&name)?;
        if self.lookup(&name).is_some() {
            return Err(ModuleError::DuplicateName { name });
        }
        if self.order.len() >= MAX_MODULES {
            return Err(ModuleError::TooManyModules { max: MAX_MODULES });
        }

        let handle = self.allocate();
        let mut ctx = ModuleContext {
            handle,
            view: self.view,
            proxy: &mut self.proxy,
            postponed: &mut self.postponed,
        };
        if let Err(e) = module.init(&mut ctx) {
            // Undo anything the failed constructor managed to register.
            self.postponed.cancel(handle);
            self.proxy.release_all(handle);
            self.release_slot(handle);
            return Err(match e {
                ModuleError::InitFailed { .. } => e,
                other => ModuleError::InitFailed {
                    name,
                    reason: other.to_string(),
                },
            });
        }

        let mut instance = ModuleInstance::new(handle, module);
        let persisted = self.layout.get(self.view, &name);
        instance.visible = persisted.visible.unwrap_or(visibility::DEFAULT_USER_VISIBLE);
        instance.expander.shown =
            visibility::resolve_shown(&instance.views, self.view, persisted.visible);
        instance.expander.expanded =
            visibility::resolve_expanded(instance.expandable, persisted.expanded);

        let slots = &self.slots;
        let at = self.order.partition_point(|h| {
            instance_in(slots, *h)
                .map_or(true, |other| sort_comparator(other, &instance) == Ordering::Less)
        });
        self.order.insert(at, handle);
        if let Some(slot) = self.slots.get_mut(handle.index()) {
            slot.instance = Some(instance);
        }

        for e in self.init_presets(handle) {
            tracing::warn!(module = %name, error = %e, "Preset initialisation problem");
        }
        accels.connect_common_accels(&name);

        tracing::info!(module = %name, handle = %handle, position = at, "Module registered");
        Ok(handle)
    }

    /// Destroy every instance in reverse display order.
    ///
    /// The focused-module handle is cleared first; each module's pending
    /// update is cancelled before its cleanup hook runs.
    pub fn teardown(&mut self) {
        self.gui_module = None;
        let count = self.order.len();
        while let Some(handle) = self.order.pop() {
            self.destroy(handle);
        }
        self.postponed.clear();
        tracing::info!(count, "Module registry torn down");
    }

    /// Unload one module by name. Returns false when it is not loaded.
    pub fn unload(&mut self, name: &str) -> bool {
        let Some(handle) = self.handle_of(name) else {
            return false;
        };
        if self.gui_module == Some(handle) {
            self.gui_module = None;
        }
        self.order.retain(|h| *h != handle);
        self.destroy(handle);
        tracing::info!(module = name, "Module unloaded");
        true
    }

    fn destroy(&mut self, handle: ModuleHandle) {
        self.postponed.cancel(handle);
        self.with_module(handle, |m, ctx| m.cleanup(ctx));
        self.proxy.release_all(handle);
        if let Some(instance) = self.release_slot(handle) {
            tracing::debug!(module = %instance.name(), handle = %handle, "Module destroyed");
        }
    }

    fn allocate(&mut self) -> ModuleHandle {
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get(index) {
                return ModuleHandle::new(index as u32, slot.generation);
            }
        }
        self.slots.push(Slot {
            generation: 0,
            instance: None,
        });
        ModuleHandle::new((self.slots.len() - 1) as u32, 0)
    }

    fn release_slot(&mut self, handle: ModuleHandle) -> Option<ModuleInstance> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation())?;
        let instance = slot.instance.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        instance
    }

    /// Run `f` against a live module with a context borrowing the registry's
    /// shared services. None for a stale handle.
    fn with_module<R>(
        &mut self,
        handle: ModuleHandle,
        f: impl FnOnce(&mut dyn LibModule, &mut ModuleContext<'_>) -> R,
    ) -> Option<R> {
        let instance = self
            .slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation())?
            .instance
            .as_mut()?;
        let mut ctx = ModuleContext {
            handle,
            view: self.view,
            proxy: &mut self.proxy,
            postponed: &mut self.postponed,
        };
        Some(f(instance.module.as_mut(), &mut ctx))
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Find a loaded module by its stable plugin name.
    pub fn lookup(&self, name: &str) -> Option<&ModuleInstance> {
        self.modules().find(|m| m.name() == name)
    }

    pub fn handle_of(&self, name: &str) -> Option<ModuleHandle> {
        self.lookup(name).map(|m| m.handle())
    }

    pub fn get(&self, handle: ModuleHandle) -> Option<&ModuleInstance> {
        instance_in(&self.slots, handle)
    }

    pub fn get_mut(&mut self, handle: ModuleHandle) -> Option<&mut ModuleInstance> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation())?
            .instance
            .as_mut()
    }

    /// Loaded modules in display order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleInstance> + '_ {
        self.order.iter().filter_map(|h| self.get(*h))
    }

    /// Handles in display order.
    pub fn order(&self) -> &[ModuleHandle] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Display name for a plugin name; the plugin name itself when unknown.
    pub fn localized_name<'a>(&'a self, plugin_name: &'a str) -> &'a str {
        self.lookup(plugin_name)
            .map(|m| m.display_name())
            .unwrap_or(plugin_name)
    }

    // =========================================================================
    // Visibility and expansion
    // =========================================================================

    pub fn view(&self) -> View {
        self.view
    }

    /// User visibility flag of the module in the current view.
    pub fn is_visible(&self, handle: ModuleHandle) -> bool {
        self.get(handle).is_some_and(|m| m.visible)
    }

    /// Show or hide the module in the current view; persisted per view.
    pub fn set_visible(&mut self, handle: ModuleHandle, visible: bool) {
        let view = self.view;
        let Some(instance) = self.get_mut(handle) else {
            return;
        };
        if instance.visible == visible {
            return;
        }
        instance.visible = visible;
        instance.expander.shown = visibility::resolve_shown(&instance.views, view, Some(visible));
        let name = instance.name.clone();
        self.layout.set_visible(view, &name, visible);
        if !visible && self.gui_module == Some(handle) {
            self.gui_module = None;
        }
        tracing::debug!(module = %name, visible, view = %view, "Module visibility changed");
    }

    /// Whether the module declares `view`. Independent of the user flag.
    pub fn is_visible_in_view(&self, handle: ModuleHandle, view: View) -> bool {
        self.get(handle)
            .is_some_and(|m| visibility::is_visible_in_view(&m.views, view))
    }

    /// Whether the module's widget tree is currently shown.
    pub fn is_shown(&self, handle: ModuleHandle) -> bool {
        self.get(handle).is_some_and(|m| m.expander.shown)
    }

    pub fn get_expanded(&self, handle: ModuleHandle) -> bool {
        self.get(handle).is_some_and(|m| m.expander.expanded)
    }

    /// Expand or collapse the module's expander. Non-expandable modules stay
    /// expanded.
    pub fn set_expanded(&mut self, handle: ModuleHandle, expanded: bool) {
        let view = self.view;
        let Some(instance) = self.get_mut(handle) else {
            return;
        };
        if !instance.expandable || instance.expander.expanded == expanded {
            return;
        }
        instance.expander.expanded = expanded;
        let name = instance.name.clone();
        self.layout.set_expanded(view, &name, expanded);
        tracing::trace!(module = %name, expanded, "Module expander toggled");
    }

    /// Make `new` the active view and recompute every module's visual state.
    pub fn switch_view(&mut self, new: View) {
        let old = self.view;
        if old == new {
            return;
        }
        let handles = self.order.clone();

        for handle in &handles {
            if self.is_visible_in_view(*handle, old) {
                self.with_module(*handle, |m, ctx| m.view_leave(ctx, old, new));
            }
        }

        self.view = new;
        self.layout.last_view = Some(new);

        for handle in &handles {
            let Some(instance) = instance_in(&self.slots, *handle) else {
                continue;
            };
            let persisted = self.layout.get(new, instance.name());
            if let Some(instance) = self.get_mut(*handle) {
                instance.visible = persisted.visible.unwrap_or(visibility::DEFAULT_USER_VISIBLE);
                instance.expander.shown =
                    visibility::resolve_shown(&instance.views, new, persisted.visible);
                instance.expander.expanded =
                    visibility::resolve_expanded(instance.expandable, persisted.expanded);
            }
            if self.is_visible_in_view(*handle, new) {
                self.with_module(*handle, |m, ctx| m.view_enter(ctx, Some(old), new));
            }
        }

        if let Some(focused) = self.gui_module {
            if !self.is_shown(focused) {
                self.gui_module = None;
            }
        }
        tracing::info!(from = %old, to = %new, "View switched");
    }

    /// Shown modules of one side panel, in display order.
    pub fn shown_in(&self, container: PanelContainer) -> Vec<ModuleHandle> {
        self.modules()
            .filter(|m| m.container() == container && m.expander.shown)
            .map(|m| m.handle())
            .collect()
    }

    /// Persistable layout, including the last active view.
    pub fn layout(&self) -> &LayoutData {
        &self.layout
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// Module currently holding keyboard focus, if it is still loaded.
    pub fn gui_module(&self) -> Option<ModuleHandle> {
        self.gui_module.filter(|h| self.get(*h).is_some())
    }

    /// Focus a module (or clear focus). Stale handles are refused.
    pub fn set_gui_module(&mut self, handle: Option<ModuleHandle>) -> bool {
        match handle {
            Some(h) if self.get(h).is_none() => false,
            _ => {
                self.gui_module = handle;
                true
            }
        }
    }

    // =========================================================================
    // Postponed updates
    // =========================================================================

    /// Queue `update` for `handle`, replacing any pending one.
    ///
    /// None when the handle is stale.
    pub fn queue_postponed_update(
        &mut self,
        handle: ModuleHandle,
        update: PostponedUpdate,
    ) -> Option<TimerTicket> {
        self.get(handle)?;
        let (ticket, replaced) = self.postponed.schedule(handle, update, Instant::now());
        tracing::trace!(module = %handle, replaced, "Postponed update queued");
        Some(ticket)
    }

    /// Cancel a pending update. No-op when nothing is pending.
    pub fn cancel_postponed_update(&mut self, handle: ModuleHandle) -> bool {
        self.postponed.cancel(handle)
    }

    pub fn has_postponed_update(&self, handle: ModuleHandle) -> bool {
        self.postponed.is_pending(handle)
    }

    /// Fire every update whose delay has elapsed at `now`.
    ///
    /// Returns how many updates ran.
    pub fn run_postponed_updates(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        for (handle, update) in self.postponed.take_due(now) {
            if self.with_module(handle, |m, _| update(m)).is_some() {
                ran += 1;
            }
        }
        if ran > 0 {
            tracing::trace!(ran, "Postponed updates fired");
        }
        ran
    }

    /// Time until the next pending update is due.
    pub fn time_until_next_update(&self, now: Instant) -> Option<Duration> {
        self.postponed.time_until_next(now)
    }

    // =========================================================================
    // Presets
    // =========================================================================

    pub fn presets(&self) -> &PresetAdapter {
        &self.presets
    }

    pub fn presets_mut(&mut self) -> &mut PresetAdapter {
        &mut self.presets
    }

    /// Load a preset's parameters into the live module.
    ///
    /// A preset saved for another parameter version is refused with
    /// `SchemaMismatch` before the module is touched.
    pub fn apply_preset(
        &mut self,
        name: &str,
        module: &str,
        version: i32,
    ) -> Result<(), PresetError> {
        let handle = self
            .handle_of(module)
            .ok_or_else(|| PresetError::ModuleNotFound {
                module: module.to_string(),
            })?;
        let preset = self
            .presets
            .get(name, module, version)
            .ok_or_else(|| PresetError::NotFound {
                module: module.to_string(),
                version,
                name: name.to_string(),
            })?;
        let instance = self
            .get_mut(handle)
            .ok_or_else(|| PresetError::ModuleNotFound {
                module: module.to_string(),
            })?;

        if preset.key.version != instance.version {
            tracing::warn!(
                preset = name,
                module,
                preset_version = preset.key.version,
                module_version = instance.version,
                "Preset incompatible with module version"
            );
            return Err(PresetError::SchemaMismatch {
                module: module.to_string(),
                name: name.to_string(),
                preset_version: preset.key.version,
                module_version: instance.version,
            });
        }

        instance
            .module
            .set_params(&preset.params)
            .map_err(PresetError::Rejected)?;
        tracing::info!(preset = name, module, version, "Preset applied");
        Ok(())
    }

    /// Whether the module takes part in the auto-apply pass.
    pub fn can_autoapply(&self, handle: ModuleHandle) -> bool {
        self.get(handle).is_some_and(|m| m.module().preset_autoapply())
    }

    /// Apply auto-apply presets to every module that allows it.
    ///
    /// Per module the first eligible preset (by name) matching the current
    /// parameter version is applied. Eligible presets of other versions are
    /// reported as stale and left alone.
    pub fn autoapply_presets(&mut self) -> AutoApplyReport {
        let mut report = AutoApplyReport::default();

        for handle in self.order.clone() {
            if !self.can_autoapply(handle) {
                continue;
            }
            let Some((name, version)) = self.get(handle).map(|m| (m.name.clone(), m.version))
            else {
                continue;
            };

            let eligible: Vec<Preset> = self
                .presets
                .list_all_versions(&name)
                .into_iter()
                .filter(|p| p.autoapply)
                .collect();

            let mut applied = false;
            for preset in eligible {
                if preset.key.version != version {
                    tracing::warn!(
                        module = %name,
                        preset = %preset.key.name,
                        preset_version = preset.key.version,
                        module_version = version,
                        "Stale auto-apply preset skipped"
                    );
                    report.stale.push(preset.key);
                    continue;
                }
                if applied {
                    continue;
                }
                match self.apply_preset(&preset.key.name, &name, version) {
                    Ok(()) => {
                        report.applied.push((name.clone(), preset.key.name.clone()));
                        applied = true;
                    }
                    Err(e) => {
                        tracing::warn!(module = %name, error = %e, "Auto-apply preset rejected");
                        report.rejected.push(preset.key);
                    }
                }
            }
        }

        tracing::info!(
            applied = report.applied.len(),
            stale = report.stale.len(),
            rejected = report.rejected.len(),
            "Auto-apply pass complete"
        );
        report
    }

    /// Install built-in presets and upgrade stored presets of older
    /// parameter versions. Presets that cannot be upgraded stay as they are.
    fn init_presets(&mut self, handle: ModuleHandle) -> Vec<PresetError> {
        let mut errors = Vec::new();
        let Some(instance) = self.get(handle) else {
            return errors;
        };
        let name = instance.name.clone();
        let version = instance.version;
        let builtins = instance.module().builtin_presets();

        for builtin in builtins {
            if let Err(e) = self.presets.install_builtin(&name, version, builtin) {
                errors.push(e);
            }
        }

        let stale: Vec<Preset> = self
            .presets
            .list_all_versions(&name)
            .into_iter()
            .filter(|p| p.key.version < version)
            .collect();

        for preset in stale {
            let Some(instance) = self.get(handle) else {
                break;
            };
            let module = instance.module();

            let mut params = preset.params.clone();
            let mut at = preset.key.version;
            let mut steps = 0;
            while at != version && steps < MAX_LEGACY_UPGRADE_STEPS {
                match module.legacy_params(&params, at) {
                    Some((next, next_version)) if next_version > at => {
                        params = next;
                        at = next_version;
                    }
                    _ => break,
                }
                steps += 1;
            }

            if at != version {
                tracing::info!(
                    module = %name,
                    preset = %preset.key.name,
                    from = preset.key.version,
                    "Preset cannot be upgraded, kept as is"
                );
                continue;
            }

            let new_key = PresetKey::new(&preset.key.name, &name, version);
            if self.presets.get(&new_key.name, &name, version).is_some() {
                tracing::debug!(
                    module = %name,
                    preset = %preset.key.name,
                    "Upgraded preset name already taken, old version kept"
                );
                continue;
            }

            let upgraded = Preset {
                key: new_key,
                params,
                modified: Utc::now(),
                ..preset.clone()
            };
            match self.presets.put_record(upgraded) {
                Ok(()) => {
                    if let Err(e) = self.presets.delete_key(&preset.key) {
                        errors.push(e);
                    }
                    tracing::info!(
                        module = %name,
                        preset = %preset.key.name,
                        from = preset.key.version,
                        to = version,
                        "Preset upgraded"
                    );
                }
                Err(e) => errors.push(e),
            }
        }

        errors
    }

    /// Restore the module's default parameters.
    pub fn reset_module(&mut self, handle: ModuleHandle) -> bool {
        let Some(instance) = self.get_mut(handle) else {
            return false;
        };
        instance.module.gui_reset();
        tracing::info!(module = %instance.name, "Module reset to defaults");
        true
    }

    // =========================================================================
    // Proxies and rendering
    // =========================================================================

    pub fn proxy(&self) -> &ProxyContext {
        &self.proxy
    }

    pub fn proxy_mut(&mut self) -> &mut ProxyContext {
        &mut self.proxy
    }

    /// Thread-safe proxy handles for the image pipeline.
    pub fn pipeline_proxy(&self) -> PipelineProxy {
        self.proxy.pipeline()
    }

    /// Draw the module's body. False for a stale handle.
    pub fn show_module(&mut self, handle: ModuleHandle, ui: &mut egui::Ui) -> bool {
        self.with_module(handle, |m, ctx| m.gui(ui, ctx)).is_some()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if !self.order.is_empty() {
            self.teardown();
        }
    }
}

// =============================================================================
// Unit tests
// =============================================================================
