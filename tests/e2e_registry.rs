// PanelDock - tests/e2e_registry.rs
//
// End-to-end tests for the module registry through the public library API.
//
// These tests exercise real module instances, the real preset adapter over
// both the in-memory and the JSON file store, real layout files on disk and
// the proxy broker across threads. No mocks beyond small test modules.

use paneldock::app::accels::AccelMap;
use paneldock::app::layout::{self, LayoutData};
use paneldock::app::module::{update_as, LibModule, ModuleContext, ModuleFactory};
use paneldock::app::preset_store::{JsonPresetStore, MemoryPresetStore};
use paneldock::app::registry::{Registry, RegistryConfig};
use paneldock::core::model::{ModuleHandle, PanelContainer, View, ViewSet};
use paneldock::core::preset::ReadonlyPolicy;
use paneldock::core::proxy::colorpicker::{
    ColorpickerSink, LiveSample, PickedColor, SampleGeometry,
};
use paneldock::modules::{builtin_catalog, colorpicker, histogram, image_information};
use paneldock::util::error::{ModuleError, PresetError};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Helpers
// =============================================================================

const DELAY: Duration = Duration::from_millis(10);

type Journal = Rc<RefCell<Vec<String>>>;

/// Parameterised test module recording its lifecycle into a journal.
struct Knob {
    name: &'static str,
    version: i32,
    views: ViewSet,
    params: Vec<u8>,
    journal: Journal,
}

impl Knob {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            version: 1,
            views: ViewSet::Only(&[View::Darkroom]),
            params: vec![0],
            journal: Rc::clone(journal),
        }
    }

    fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }
}

impl LibModule for Knob {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn views(&self) -> ViewSet {
        self.views
    }

    fn container(&self) -> PanelContainer {
        PanelContainer::Left
    }

    fn cleanup(&mut self, _ctx: &mut ModuleContext<'_>) {
        self.journal.borrow_mut().push(format!("cleanup {}", self.name));
    }

    fn params(&self) -> Option<Vec<u8>> {
        Some(self.params.clone())
    }

    fn set_params(&mut self, params: &[u8]) -> Result<(), ModuleError> {
        if params.is_empty() {
            return Err(ModuleError::InvalidParams {
                name: self.name.to_string(),
                reason: "empty".to_string(),
            });
        }
        self.params = params.to_vec();
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Module whose constructor always fails.
struct Broken;

impl LibModule for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn views(&self) -> ViewSet {
        ViewSet::All
    }

    fn container(&self) -> PanelContainer {
        PanelContainer::Right
    }

    fn init(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        Err(ModuleError::InitFailed {
            name: "broken".to_string(),
            reason: "no device".to_string(),
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn registry(policy: ReadonlyPolicy) -> Registry {
    let config = RegistryConfig {
        view: View::Darkroom,
        postponed_delay: DELAY,
        readonly_policy: policy,
    };
    Registry::new(config, Box::new(MemoryPresetStore::new()), LayoutData::default())
}

fn load(registry: &mut Registry, knob: Knob) -> ModuleHandle {
    registry
        .load_module(Box::new(knob), &mut AccelMap::new())
        .unwrap()
}

fn params_of(registry: &Registry, name: &str) -> Option<Vec<u8>> {
    registry.lookup(name).and_then(|m| m.module().params())
}

/// Colorpicker sink counting every callback.
#[derive(Default)]
struct CountingSink {
    panel: AtomicUsize,
    samples: AtomicUsize,
    geometry: AtomicUsize,
}

impl CountingSink {
    fn total(&self) -> usize {
        self.panel.load(Ordering::SeqCst)
            + self.samples.load(Ordering::SeqCst)
            + self.geometry.load(Ordering::SeqCst)
    }
}

impl ColorpickerSink for CountingSink {
    fn update_panel(&self, _picked: &PickedColor) {
        self.panel.fetch_add(1, Ordering::SeqCst);
    }

    fn update_samples(&self, _samples: &[LiveSample]) {
        self.samples.fetch_add(1, Ordering::SeqCst);
    }

    fn set_sample_geometry(&self, _geometry: SampleGeometry) {
        self.geometry.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Visibility
// =============================================================================

#[test]
fn e2e_set_visible_last_write_wins() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let h = load(&mut r, Knob::new("knob", &journal));

    for value in [true, false, false, true, true, false] {
        r.set_visible(h, value);
        assert_eq!(r.is_visible(h), value);
    }
    assert!(!r.is_shown(h));
}

#[test]
fn e2e_undeclared_view_is_never_visible() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let h = load(&mut r, Knob::new("knob", &journal));

    r.set_visible(h, true);
    for view in View::all() {
        let expected = *view == View::Darkroom;
        assert_eq!(r.is_visible_in_view(h, *view), expected, "{view}");
    }

    r.switch_view(View::Lighttable);
    assert!(!r.is_shown(h));
    assert!(r.shown_in(PanelContainer::Left).is_empty());
}

#[test]
fn e2e_layout_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = layout::layout_path(dir.path());
    let journal = Journal::default();

    {
        let mut r = registry(ReadonlyPolicy::Overwrite);
        let h = load(&mut r, Knob::new("knob", &journal));
        r.set_visible(h, false);
        r.set_expanded(h, true);
        layout::save(r.layout(), &path).unwrap();
    }

    let restored = layout::load(&path).unwrap();
    let mut r = Registry::new(
        RegistryConfig {
            view: View::Darkroom,
            ..RegistryConfig::default()
        },
        Box::new(MemoryPresetStore::new()),
        restored,
    );
    let h = load(&mut r, Knob::new("knob", &journal));
    assert!(!r.is_visible(h));
    assert!(r.get_expanded(h));
}

// =============================================================================
// Proxy broker
// =============================================================================

#[test]
fn e2e_colorpicker_claim_transfers_all_callbacks() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let a = load(&mut r, Knob::new("a", &journal));
    let b = load(&mut r, Knob::new("b", &journal));

    let sink_a = Arc::new(CountingSink::default());
    let sink_b = Arc::new(CountingSink::default());
    let feed = r.pipeline_proxy().colorpicker;

    let picker = &mut r.proxy_mut().colorpicker;
    assert_eq!(picker.claim(a, sink_a.clone()), None);
    picker.set_point(0.5, 0.5);
    let before = sink_a.total();
    assert!(before > 0);

    assert_eq!(picker.claim(b, sink_b.clone()), Some(a));
    picker.set_area(0.2);
    picker.add_live_sample(SampleGeometry::Point { x: 0.1, y: 0.1 });

    // Producer thread delivers to the new owner only.
    std::thread::spawn(move || {
        assert!(feed.publish_picked(PickedColor::default()));
        let samples = feed.sample_geometries();
        let colours: Vec<_> = samples
            .iter()
            .map(|(id, _)| (*id, PickedColor::default()))
            .collect();
        feed.publish_samples(&colours);
    })
    .join()
    .unwrap();

    assert_eq!(sink_a.total(), before);
    assert_eq!(sink_b.geometry.load(Ordering::SeqCst), 1);
    assert_eq!(sink_b.panel.load(Ordering::SeqCst), 1);
    assert_eq!(sink_b.samples.load(Ordering::SeqCst), 1);
}

#[test]
fn e2e_unload_releases_proxy_ownership() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let a = load(&mut r, Knob::new("a", &journal));
    r.proxy_mut()
        .colorpicker
        .claim(a, Arc::new(CountingSink::default()));

    assert!(r.unload("a"));
    assert_eq!(r.proxy().colorpicker.owner(), None);
    // Setters without an owner are silent no-ops.
    r.proxy().colorpicker.set_point(0.3, 0.3);
    assert_eq!(r.proxy().colorpicker.geometry(), None);
}

// =============================================================================
// Postponed updates
// =============================================================================

#[test]
fn e2e_postponed_updates_coalesce_to_last() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let h = load(&mut r, Knob::new("knob", &journal));

    for i in 0..10u8 {
        r.queue_postponed_update(h, update_as::<Knob>(move |k| k.params = vec![i]))
            .unwrap();
    }
    assert!(r.has_postponed_update(h));
    assert_eq!(r.run_postponed_updates(Instant::now()), 0);

    let later = Instant::now() + DELAY * 4;
    assert_eq!(r.run_postponed_updates(later), 1);
    assert_eq!(r.run_postponed_updates(later), 0);
    assert_eq!(params_of(&r, "knob"), Some(vec![9]));
}

#[test]
fn e2e_cancel_without_pending_update_is_noop() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let h = load(&mut r, Knob::new("knob", &journal));
    assert!(!r.cancel_postponed_update(h));

    r.queue_postponed_update(h, update_as::<Knob>(|k| k.params = vec![7]));
    assert!(r.cancel_postponed_update(h));
    assert_eq!(r.run_postponed_updates(Instant::now() + DELAY * 4), 0);
    assert_eq!(params_of(&r, "knob"), Some(vec![0]));
}

#[test]
fn e2e_teardown_cancels_updates_and_clears_focus() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let a = load(&mut r, Knob::new("a", &journal));
    let b = load(&mut r, Knob::new("b", &journal));
    r.set_gui_module(Some(b));
    r.queue_postponed_update(a, update_as::<Knob>(|k| k.params = vec![1]));

    r.teardown();
    assert_eq!(r.gui_module(), None);
    assert!(r.is_empty());
    assert!(!r.has_postponed_update(a));
    assert_eq!(r.run_postponed_updates(Instant::now() + DELAY * 4), 0);
    // Equal positions sort by name, so teardown runs b before a.
    assert_eq!(*journal.borrow(), vec!["cleanup b", "cleanup a"]);
}

// =============================================================================
// Presets
// =============================================================================

#[test]
fn e2e_preset_round_trip_applies_exact_params() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    load(&mut r, Knob::new("mod", &journal));

    r.presets_mut()
        .add_or_replace("p", "mod", 1, &[4, 5, 6, 7], false)
        .unwrap();
    r.apply_preset("p", "mod", 1).unwrap();
    assert_eq!(params_of(&r, "mod"), Some(vec![4, 5, 6, 7]));
}

#[test]
fn e2e_stale_preset_is_refused_and_module_untouched() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    load(&mut r, Knob::new("mod", &journal).with_version(2));

    r.presets_mut()
        .add_or_replace("p", "mod", 1, &[9, 9], false)
        .unwrap();
    let err = r.apply_preset("p", "mod", 1).unwrap_err();
    assert!(matches!(
        err,
        PresetError::SchemaMismatch {
            preset_version: 1,
            module_version: 2,
            ..
        }
    ));
    assert_eq!(params_of(&r, "mod"), Some(vec![0]));
    assert!(r.presets().get("p", "mod", 1).is_some());
}

#[test]
fn e2e_apply_misses_report_without_panicking() {
    let journal = Journal::default();
    let mut r = registry(ReadonlyPolicy::Overwrite);
    load(&mut r, Knob::new("mod", &journal));

    assert!(matches!(
        r.apply_preset("p", "nope", 1),
        Err(PresetError::ModuleNotFound { .. })
    ));
    assert!(matches!(
        r.apply_preset("missing", "mod", 1),
        Err(PresetError::NotFound { .. })
    ));

    r.presets_mut()
        .add_or_replace("empty", "mod", 1, &[], false)
        .unwrap();
    assert!(matches!(
        r.apply_preset("empty", "mod", 1),
        Err(PresetError::Rejected(_))
    ));
    assert_eq!(params_of(&r, "mod"), Some(vec![0]));
}

#[test]
fn e2e_duplicate_then_remove_original_leaves_copy() {
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let presets = r.presets_mut();
    presets.add_or_replace("p", "mod", 1, &[1], false).unwrap();
    let copy = presets.duplicate("p", "mod", 1).unwrap();
    presets.remove("p", "mod", 1).unwrap();

    let left = presets.list("mod", 1);
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].key.name, copy);
    assert_eq!(left[0].params, vec![1]);

    // Removing what is already gone is a no-op.
    presets.remove("p", "mod", 1).unwrap();
}

#[test]
fn e2e_update_onto_existing_name_fails_and_keeps_both() {
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let presets = r.presets_mut();
    presets.add_or_replace("a", "mod", 1, &[1], false).unwrap();
    presets.add_or_replace("b", "mod", 1, &[2], false).unwrap();

    let err = presets
        .update("a", "mod", 1, "b", "renamed", &[3])
        .unwrap_err();
    assert!(matches!(err, PresetError::NameCollision { .. }));
    assert_eq!(presets.get("a", "mod", 1).unwrap().params, vec![1]);
    assert_eq!(presets.get("b", "mod", 1).unwrap().params, vec![2]);
}

#[test]
fn e2e_readonly_policy_is_a_configuration_choice() {
    let mut open = registry(ReadonlyPolicy::Overwrite);
    open.presets_mut()
        .add_or_replace("p", "mod", 1, &[1], true)
        .unwrap();
    open.presets_mut()
        .add_or_replace("p", "mod", 1, &[2], false)
        .unwrap();
    assert_eq!(open.presets().get("p", "mod", 1).unwrap().params, vec![2]);

    let mut strict = registry(ReadonlyPolicy::Refuse);
    strict
        .presets_mut()
        .add_or_replace("p", "mod", 1, &[1], true)
        .unwrap();
    assert!(matches!(
        strict.presets_mut().add_or_replace("p", "mod", 1, &[2], false),
        Err(PresetError::ReadOnly { .. })
    ));
    assert!(matches!(
        strict.presets_mut().remove("p", "mod", 1),
        Err(PresetError::ReadOnly { .. })
    ));
    assert_eq!(strict.presets().get("p", "mod", 1).unwrap().params, vec![1]);
}

#[test]
fn e2e_presets_persist_in_json_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("presets.json");

    {
        let (store, warning) = JsonPresetStore::open(&path);
        assert!(warning.is_none());
        let mut r = Registry::new(RegistryConfig::default(), Box::new(store), LayoutData::default());
        r.presets_mut()
            .add_or_replace("soft", "mod", 3, &[1, 2], false)
            .unwrap();
        r.presets_mut().set_autoapply("soft", "mod", 3, true).unwrap();
    }

    let (store, warning) = JsonPresetStore::open(&path);
    assert!(warning.is_none());
    let r = Registry::new(RegistryConfig::default(), Box::new(store), LayoutData::default());
    let p = r.presets().get("soft", "mod", 3).unwrap();
    assert_eq!(p.params, vec![1, 2]);
    assert!(p.autoapply);
}

#[test]
fn e2e_corrupt_preset_database_starts_empty_with_warning() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("presets.json");
    std::fs::write(&path, "{ not json").unwrap();

    let (store, warning) = JsonPresetStore::open(&path);
    assert!(warning.is_some());
    assert!(store.is_empty());
}

#[test]
fn e2e_unloadable_preset_database_survives_startup() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("presets.json");
    let original = r#"{"version":2,"presets":[{"name":"my precious","module":"histogram"}]}"#;
    std::fs::write(&path, original).unwrap();

    let (store, warning) = JsonPresetStore::open(&path);
    assert!(warning.unwrap().contains(".bak-"));

    // Startup installs built-in presets, which writes the database.
    let config = RegistryConfig {
        view: View::Darkroom,
        postponed_delay: DELAY,
        readonly_policy: ReadonlyPolicy::Overwrite,
    };
    let mut r = Registry::new(config, Box::new(store), LayoutData::default());
    assert!(r.initialize(&builtin_catalog(), &mut AccelMap::new()).is_empty());
    drop(r);

    let kept: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".bak-"))
        .map(|e| std::fs::read_to_string(e.path()).unwrap())
        .collect();
    assert_eq!(kept, vec![original.to_string()]);
    let rewritten = std::fs::read_to_string(&path).unwrap();
    assert!(!rewritten.contains("my precious"));
}

// =============================================================================
// Built-in catalog
// =============================================================================

#[test]
fn e2e_builtin_catalog_orders_and_places_modules() {
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let mut accels = AccelMap::new();
    let errors = r.initialize(&builtin_catalog(), &mut accels);
    assert!(errors.is_empty());
    assert_eq!(r.len(), 3);
    assert_eq!(accels.bindings().len(), 6);

    let names = |r: &Registry, c: PanelContainer| -> Vec<String> {
        r.shown_in(c)
            .into_iter()
            .filter_map(|h| r.get(h).map(|m| m.name().to_string()))
            .collect()
    };
    assert_eq!(
        names(&r, PanelContainer::Left),
        vec![colorpicker::NAME, image_information::NAME]
    );
    assert_eq!(names(&r, PanelContainer::Right), vec![histogram::NAME]);

    r.switch_view(View::Lighttable);
    assert_eq!(names(&r, PanelContainer::Left), vec![image_information::NAME]);
    assert_eq!(r.localized_name(histogram::NAME), "Histogram");
}

#[test]
fn e2e_failing_module_is_skipped_not_fatal() {
    let mut r = registry(ReadonlyPolicy::Overwrite);
    let mut catalog = builtin_catalog();
    catalog.insert(0, ModuleFactory::new("broken", || -> Box<dyn LibModule> { Box::new(Broken) }));

    let errors = r.initialize(&catalog, &mut AccelMap::new());
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ModuleError::InitFailed { .. }));
    assert!(r.lookup("broken").is_none());
    assert_eq!(r.len(), 3);
}

#[test]
fn e2e_autoapply_pass_restores_builtin_layout() {
    let mut r = registry(ReadonlyPolicy::Overwrite);
    r.initialize(&builtin_catalog(), &mut AccelMap::new());
    let info = r.handle_of(image_information::NAME).unwrap();
    assert!(r.can_autoapply(info));
    assert!(!r.can_autoapply(r.handle_of(histogram::NAME).unwrap()));

    let report = r.autoapply_presets();
    assert_eq!(
        report.applied,
        vec![(image_information::NAME.to_string(), "all fields".to_string())]
    );
    assert!(report.stale.is_empty());
}
