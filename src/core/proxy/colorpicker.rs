// PanelDock - core/proxy/colorpicker.rs
//
// Colorpicker proxy: brokers picked-colour data between the image pipeline,
// the active view and whichever module currently owns colorpicker output.
//
// Architecture:
//   - `ColorpickerProxy` lives on the UI thread inside the registry's proxy
//     context. It holds UI-only state (selected sample, size mode) plus an
//     `Arc<Mutex<..>>` channel shared with the pipeline. The display and
//     restrict-histogram flags live in the channel since the pipeline and the
//     view overlay read them.
//   - `ColorpickerFeed` is the pipeline-side handle (Clone + Send + Sync). It
//     publishes statistics and reads sampling geometry.
//   - Ownership is a single `Option<Owner>` inside the channel mutex, so a
//     claim replaces the previous owner's sink atomically and a publish never
//     reaches two owners.
//   - Sinks are invoked while the channel lock is held. They must only hand
//     data off (e.g. push to a channel) and must not call back into the proxy.

use crate::core::model::ModuleHandle;
use crate::util::constants::{MAX_LIVE_SAMPLES, PICKER_CHANNELS};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// =============================================================================
// Picked colour data
// =============================================================================

/// Mean/min/max of one colour representation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorStats {
    pub mean: [f32; PICKER_CHANNELS],
    pub min: [f32; PICKER_CHANNELS],
    pub max: [f32; PICKER_CHANNELS],
}

/// Picked colour in device RGB and perceptual Lab.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PickedColor {
    pub rgb: ColorStats,
    pub lab: ColorStats,
}

/// Where a sample is taken, in normalised image coordinates (0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleGeometry {
    /// Centred square area of the given relative size.
    Area(f32),
    /// Box as [x0, y0, x1, y1].
    Box([f32; 4]),
    /// Single point.
    Point { x: f32, y: f32 },
}

impl SampleGeometry {
    /// Clamp every coordinate into 0.0 - 1.0.
    pub fn clamped(self) -> Self {
        let c = |v: f32| v.clamp(0.0, 1.0);
        match self {
            SampleGeometry::Area(size) => SampleGeometry::Area(c(size)),
            SampleGeometry::Box(b) => SampleGeometry::Box([c(b[0]), c(b[1]), c(b[2]), c(b[3])]),
            SampleGeometry::Point { x, y } => SampleGeometry::Point { x: c(x), y: c(y) },
        }
    }
}

/// Picker tool mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickerSize {
    #[default]
    Point,
    Box,
}

/// Stable identifier of a live sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(u64);

/// A persistent sample the user pinned; recomputed by the pipeline each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSample {
    pub id: SampleId,
    pub geometry: SampleGeometry,
    pub picked: PickedColor,
    /// Locked samples keep their last colour instead of following new frames.
    pub locked: bool,
}

// =============================================================================
// Owner capability
// =============================================================================

/// Callbacks a module registers when it claims colorpicker output.
///
/// May be invoked from the pipeline thread. Implementations must marshal to
/// the UI thread before touching widgets.
pub trait ColorpickerSink: Send + Sync {
    /// New primary-picker statistics are available.
    fn update_panel(&self, picked: &PickedColor);

    /// Live sample colours changed.
    fn update_samples(&self, samples: &[LiveSample]);

    /// The active view moved the picker.
    fn set_sample_geometry(&self, geometry: SampleGeometry);
}

struct Owner {
    module: ModuleHandle,
    sink: Arc<dyn ColorpickerSink>,
}

#[derive(Default)]
struct PickerChannel {
    owner: Option<Owner>,
    picked: PickedColor,
    geometry: Option<SampleGeometry>,
    samples: Vec<LiveSample>,
    display_samples: bool,
    restrict_histogram: bool,
}

fn lock(channel: &Mutex<PickerChannel>) -> MutexGuard<'_, PickerChannel> {
    channel.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// UI-side proxy
// =============================================================================

/// Colorpicker proxy state, owned by the registry for the application lifetime.
pub struct ColorpickerProxy {
    channel: Arc<Mutex<PickerChannel>>,
    selected_sample: Option<SampleId>,
    next_sample_id: u64,
    /// Point or box picking.
    pub size: PickerSize,
}

impl ColorpickerProxy {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Mutex::new(PickerChannel::default())),
            selected_sample: None,
            next_sample_id: 0,
            size: PickerSize::default(),
        }
    }

    /// Pipeline-side handle sharing this proxy's channel.
    pub fn feed(&self) -> ColorpickerFeed {
        ColorpickerFeed {
            channel: Arc::clone(&self.channel),
        }
    }

    // -- Ownership --

    /// Make `module` the owner of colorpicker output.
    ///
    /// The previous owner's callbacks are dropped before the new ones are
    /// installed, under one lock. Returns the previous owner, if any.
    pub fn claim(
        &mut self,
        module: ModuleHandle,
        sink: Arc<dyn ColorpickerSink>,
    ) -> Option<ModuleHandle> {
        let mut ch = lock(&self.channel);
        let previous = ch.owner.take().map(|o| o.module);
        ch.owner = Some(Owner { module, sink });
        // The new owner samples nothing until it sets its own geometry.
        ch.geometry = None;
        drop(ch);

        tracing::debug!(
            module = %module,
            previous = ?previous,
            "Colorpicker ownership claimed"
        );
        previous
    }

    /// Release ownership if `module` is the current owner.
    pub fn release(&mut self, module: ModuleHandle) -> bool {
        let mut ch = lock(&self.channel);
        if ch.owner.as_ref().map(|o| o.module) == Some(module) {
            ch.owner = None;
            ch.geometry = None;
            drop(ch);
            tracing::debug!(module = %module, "Colorpicker ownership released");
            true
        } else {
            false
        }
    }

    pub fn owner(&self) -> Option<ModuleHandle> {
        lock(&self.channel).owner.as_ref().map(|o| o.module)
    }

    // -- Geometry setters (forwarded to the owner only) --

    /// Select the area tool with a relative size in 0.0 - 1.0.
    pub fn set_area(&self, size: f32) {
        self.forward_geometry(SampleGeometry::Area(size));
    }

    /// Select the area tool with an explicit box, each coordinate 0.0 - 1.0.
    pub fn set_box_area(&self, area: [f32; 4]) {
        self.forward_geometry(SampleGeometry::Box(area));
    }

    /// Select the point tool at (x, y).
    pub fn set_point(&self, x: f32, y: f32) {
        self.forward_geometry(SampleGeometry::Point { x, y });
    }

    fn forward_geometry(&self, geometry: SampleGeometry) {
        let geometry = geometry.clamped();
        let mut ch = lock(&self.channel);
        let Some(sink) = ch.owner.as_ref().map(|o| Arc::clone(&o.sink)) else {
            // Reachable only through already-gated UI state.
            tracing::trace!(?geometry, "Colorpicker geometry ignored: no owner");
            return;
        };
        ch.geometry = Some(geometry);
        sink.set_sample_geometry(geometry);
    }

    // -- Picked data --

    /// Latest primary-picker statistics.
    pub fn picked(&self) -> PickedColor {
        lock(&self.channel).picked
    }

    /// Geometry last forwarded to the owner.
    pub fn geometry(&self) -> Option<SampleGeometry> {
        lock(&self.channel).geometry
    }

    // -- Display flags --

    /// Whether live samples are drawn over the image.
    pub fn display_samples(&self) -> bool {
        lock(&self.channel).display_samples
    }

    pub fn set_display_samples(&self, display: bool) {
        lock(&self.channel).display_samples = display;
    }

    /// Whether the histogram only covers the primary picker area.
    pub fn restrict_histogram(&self) -> bool {
        lock(&self.channel).restrict_histogram
    }

    pub fn set_restrict_histogram(&self, restrict: bool) {
        lock(&self.channel).restrict_histogram = restrict;
        tracing::debug!(restrict, "Histogram restriction changed");
    }

    // -- Live samples --

    /// Pin a new live sample. Returns None when the sample limit is reached.
    pub fn add_live_sample(&mut self, geometry: SampleGeometry) -> Option<SampleId> {
        let mut ch = lock(&self.channel);
        if ch.samples.len() >= MAX_LIVE_SAMPLES {
            tracing::warn!(max = MAX_LIVE_SAMPLES, "Live sample limit reached");
            return None;
        }
        self.next_sample_id += 1;
        let id = SampleId(self.next_sample_id);
        ch.samples.push(LiveSample {
            id,
            geometry: geometry.clamped(),
            picked: PickedColor::default(),
            locked: false,
        });
        Some(id)
    }

    /// Remove one live sample; clears the selection if it pointed at it.
    pub fn remove_live_sample(&mut self, id: SampleId) -> bool {
        let mut ch = lock(&self.channel);
        let before = ch.samples.len();
        ch.samples.retain(|s| s.id != id);
        let removed = ch.samples.len() != before;
        if removed && self.selected_sample == Some(id) {
            self.selected_sample = None;
        }
        removed
    }

    pub fn clear_live_samples(&mut self) {
        lock(&self.channel).samples.clear();
        self.selected_sample = None;
    }

    /// Lock or unlock a sample's colour.
    pub fn set_sample_locked(&mut self, id: SampleId, locked: bool) -> bool {
        let mut ch = lock(&self.channel);
        match ch.samples.iter_mut().find(|s| s.id == id) {
            Some(sample) => {
                sample.locked = locked;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the live samples in insertion order.
    pub fn live_samples(&self) -> Vec<LiveSample> {
        lock(&self.channel).samples.clone()
    }

    /// Select a sample (or clear the selection with None).
    ///
    /// Selecting an id that is not a live sample clears the selection.
    pub fn select_sample(&mut self, id: Option<SampleId>) {
        self.selected_sample = id.filter(|id| lock(&self.channel).samples.iter().any(|s| s.id == *id));
    }

    pub fn selected_sample(&self) -> Option<SampleId> {
        self.selected_sample
    }
}

impl Default for ColorpickerProxy {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Pipeline-side feed
// =============================================================================

/// Producer handle used by the image pipeline.
#[derive(Clone)]
pub struct ColorpickerFeed {
    channel: Arc<Mutex<PickerChannel>>,
}

impl ColorpickerFeed {
    /// Geometry the pipeline should sample for the primary picker.
    ///
    /// None while no module owns the picker.
    pub fn primary_geometry(&self) -> Option<SampleGeometry> {
        let ch = lock(&self.channel);
        ch.owner.as_ref().and(ch.geometry)
    }

    /// Area the histogram should be computed over.
    ///
    /// Some only while the histogram is restricted and the owner has placed
    /// the picker; otherwise the whole frame is used.
    pub fn histogram_region(&self) -> Option<SampleGeometry> {
        let ch = lock(&self.channel);
        if !ch.restrict_histogram {
            return None;
        }
        ch.owner.as_ref().and(ch.geometry)
    }

    /// Geometries of all unlocked live samples.
    pub fn sample_geometries(&self) -> Vec<(SampleId, SampleGeometry)> {
        lock(&self.channel)
            .samples
            .iter()
            .filter(|s| !s.locked)
            .map(|s| (s.id, s.geometry))
            .collect()
    }

    /// Store new primary statistics and notify the owner's panel.
    ///
    /// Returns true when an owner was notified.
    pub fn publish_picked(&self, picked: PickedColor) -> bool {
        let mut ch = lock(&self.channel);
        ch.picked = picked;
        match ch.owner.as_ref() {
            Some(owner) => {
                owner.sink.update_panel(&picked);
                true
            }
            None => false,
        }
    }

    /// Store recomputed live-sample colours and notify the owner.
    ///
    /// Ids that no longer exist (removed meanwhile) and locked samples are
    /// skipped. Returns true when an owner was notified.
    pub fn publish_samples(&self, colours: &[(SampleId, PickedColor)]) -> bool {
        let mut ch = lock(&self.channel);
        for (id, picked) in colours {
            if let Some(sample) = ch.samples.iter_mut().find(|s| s.id == *id && !s.locked) {
                sample.picked = *picked;
            }
        }
        match ch.owner.as_ref() {
            Some(owner) => {
                owner.sink.update_samples(&ch.samples);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        panel: AtomicUsize,
        samples: AtomicUsize,
        geometry: AtomicUsize,
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

    fn handle(i: u32) -> ModuleHandle {
        ModuleHandle::new(i, 0)
    }

    #[test]
    fn test_setters_without_owner_are_silent_noops() {
        let proxy = ColorpickerProxy::new();
        proxy.set_area(0.5);
        proxy.set_box_area([0.1, 0.1, 0.2, 0.2]);
        proxy.set_point(0.3, 0.4);
        assert!(proxy.geometry().is_none());
        assert!(!proxy.feed().publish_picked(PickedColor::default()));
    }

    #[test]
    fn test_claim_transfers_all_callbacks() {
        let mut proxy = ColorpickerProxy::new();
        let a = Arc::new(CountingSink::default());
        let b = Arc::new(CountingSink::default());
        let feed = proxy.feed();

        proxy.claim(handle(1), a.clone());
        proxy.set_point(0.5, 0.5);
        feed.publish_picked(PickedColor::default());

        let previous = proxy.claim(handle(2), b.clone());
        assert_eq!(previous, Some(handle(1)));

        proxy.set_area(0.2);
        feed.publish_picked(PickedColor::default());
        feed.publish_samples(&[]);

        assert_eq!(a.geometry.load(Ordering::SeqCst), 1);
        assert_eq!(a.panel.load(Ordering::SeqCst), 1);
        assert_eq!(a.samples.load(Ordering::SeqCst), 0);
        assert_eq!(b.geometry.load(Ordering::SeqCst), 1);
        assert_eq!(b.panel.load(Ordering::SeqCst), 1);
        assert_eq!(b.samples.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_claim_drops_previous_owner_geometry() {
        let mut proxy = ColorpickerProxy::new();
        let feed = proxy.feed();
        proxy.claim(handle(1), Arc::new(CountingSink::default()));
        proxy.set_point(0.25, 0.75);
        assert!(feed.primary_geometry().is_some());

        proxy.claim(handle(2), Arc::new(CountingSink::default()));
        assert_eq!(feed.primary_geometry(), None);
        proxy.set_area(0.3);
        assert_eq!(feed.primary_geometry(), Some(SampleGeometry::Area(0.3)));
    }

    #[test]
    fn test_histogram_region_follows_restrict_flag() {
        let mut proxy = ColorpickerProxy::new();
        let feed = proxy.feed();
        proxy.claim(handle(1), Arc::new(CountingSink::default()));
        proxy.set_box_area([0.0, 0.0, 0.5, 0.5]);
        assert_eq!(feed.histogram_region(), None);

        proxy.set_restrict_histogram(true);
        assert_eq!(
            feed.histogram_region(),
            Some(SampleGeometry::Box([0.0, 0.0, 0.5, 0.5]))
        );
        assert!(proxy.restrict_histogram());

        proxy.release(handle(1));
        assert_eq!(feed.histogram_region(), None);
    }

    #[test]
    fn test_release_by_non_owner_is_ignored() {
        let mut proxy = ColorpickerProxy::new();
        proxy.claim(handle(1), Arc::new(CountingSink::default()));
        assert!(!proxy.release(handle(2)));
        assert_eq!(proxy.owner(), Some(handle(1)));
        assert!(proxy.release(handle(1)));
        assert_eq!(proxy.owner(), None);
    }

    #[test]
    fn test_geometry_is_clamped() {
        let mut proxy = ColorpickerProxy::new();
        proxy.claim(handle(1), Arc::new(CountingSink::default()));
        proxy.set_point(1.5, -0.2);
        assert_eq!(
            proxy.feed().primary_geometry(),
            Some(SampleGeometry::Point { x: 1.0, y: 0.0 })
        );
    }

    #[test]
    fn test_live_samples_are_independently_removable() {
        let mut proxy = ColorpickerProxy::new();
        let a = proxy.add_live_sample(SampleGeometry::Point { x: 0.1, y: 0.1 }).unwrap();
        let b = proxy.add_live_sample(SampleGeometry::Area(0.2)).unwrap();
        let c = proxy.add_live_sample(SampleGeometry::Point { x: 0.9, y: 0.9 }).unwrap();
        proxy.select_sample(Some(b));
        assert_eq!(proxy.selected_sample(), Some(b));

        assert!(proxy.remove_live_sample(b));
        assert!(!proxy.remove_live_sample(b));
        assert_eq!(proxy.selected_sample(), None);

        let ids: Vec<_> = proxy.live_samples().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_selecting_unknown_sample_clears_selection() {
        let mut proxy = ColorpickerProxy::new();
        let a = proxy.add_live_sample(SampleGeometry::Area(0.1)).unwrap();
        proxy.remove_live_sample(a);
        proxy.select_sample(Some(a));
        assert_eq!(proxy.selected_sample(), None);
    }

    #[test]
    fn test_locked_samples_keep_their_colour() {
        let mut proxy = ColorpickerProxy::new();
        let id = proxy.add_live_sample(SampleGeometry::Area(0.1)).unwrap();
        proxy.set_sample_locked(id, true);
        let feed = proxy.feed();
        assert!(feed.sample_geometries().is_empty());

        let mut picked = PickedColor::default();
        picked.rgb.mean = [1.0, 0.5, 0.25];
        feed.publish_samples(&[(id, picked)]);
        assert_eq!(proxy.live_samples()[0].picked, PickedColor::default());
    }

    #[test]
    fn test_publish_from_another_thread_reaches_owner() {
        let mut proxy = ColorpickerProxy::new();
        let sink = Arc::new(CountingSink::default());
        proxy.claim(handle(4), sink.clone());
        let feed = proxy.feed();
        std::thread::spawn(move || {
            feed.publish_picked(PickedColor::default());
        })
        .join()
        .unwrap();
        assert_eq!(sink.panel.load(Ordering::SeqCst), 1);
    }
}
