// PanelDock - core/proxy/histogram.rs
//
// Histogram proxy: forwards processed pipeline buffers to the module that
// currently renders the histogram, if any.
//
// The pipeline calls `process` from its own thread. The frame is lent to the
// sink for the duration of the call only; the borrow makes it impossible for
// the sink to keep the producer's buffer.
//
// `is_linear` is written by the pipeline and read by the UI redraw path, so
// it is an atomic rather than a plain field.

use crate::core::model::ModuleHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Interleaved float channels per pixel in pipeline buffers (RGBA).
pub const PIPELINE_CHANNELS: usize = 4;

/// Colour profile the incoming buffer is encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorProfileType {
    #[default]
    None,
    Srgb,
    AdobeRgb,
    LinearRec709,
    LinearRec2020,
    Xyz,
    Lab,
    /// The display profile configured in the host.
    Display,
    /// An ICC file; the path is passed alongside.
    File,
}

impl ColorProfileType {
    /// Whether pixel values in this profile are linear-light.
    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            ColorProfileType::LinearRec709 | ColorProfileType::LinearRec2020 | ColorProfileType::Xyz
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColorProfileType::None => "none",
            ColorProfileType::Srgb => "sRGB",
            ColorProfileType::AdobeRgb => "Adobe RGB",
            ColorProfileType::LinearRec709 => "linear Rec709",
            ColorProfileType::LinearRec2020 => "linear Rec2020",
            ColorProfileType::Xyz => "XYZ",
            ColorProfileType::Lab => "Lab",
            ColorProfileType::Display => "display",
            ColorProfileType::File => "ICC file",
        }
    }
}

/// A processed buffer lent to the histogram sink.
#[derive(Debug)]
pub struct HistogramFrame<'a> {
    /// `width * height * PIPELINE_CHANNELS` interleaved floats.
    pub pixels: &'a [f32],
    pub width: usize,
    pub height: usize,
    pub profile: ColorProfileType,
    pub profile_filename: &'a str,
    /// Snapshot of the proxy's linearity flag when the frame was forwarded.
    pub linear: bool,
}

/// Callback a module registers to process histogram data.
///
/// Invoked on the pipeline thread; must not retain `frame` past return.
pub trait HistogramSink: Send + Sync {
    fn process(&self, frame: &HistogramFrame<'_>);
}

struct Owner {
    module: ModuleHandle,
    sink: Arc<dyn HistogramSink>,
}

/// Single-slot histogram broker shared by the UI and the pipeline.
#[derive(Clone, Default)]
pub struct HistogramProxy {
    owner: Arc<Mutex<Option<Owner>>>,
    is_linear: Arc<AtomicBool>,
}

impl HistogramProxy {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Owner>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `module` as the histogram processor, replacing any previous one.
    pub fn claim(&self, module: ModuleHandle, sink: Arc<dyn HistogramSink>) -> Option<ModuleHandle> {
        let previous = self.slot().replace(Owner { module, sink }).map(|o| o.module);
        tracing::debug!(module = %module, previous = ?previous, "Histogram ownership claimed");
        previous
    }

    /// Unregister `module` if it is the current processor.
    pub fn release(&self, module: ModuleHandle) -> bool {
        let mut slot = self.slot();
        if slot.as_ref().map(|o| o.module) == Some(module) {
            *slot = None;
            drop(slot);
            tracing::debug!(module = %module, "Histogram ownership released");
            true
        } else {
            false
        }
    }

    pub fn owner(&self) -> Option<ModuleHandle> {
        self.slot().as_ref().map(|o| o.module)
    }

    pub fn set_linear(&self, linear: bool) {
        self.is_linear.store(linear, Ordering::Release);
    }

    pub fn is_linear(&self) -> bool {
        self.is_linear.load(Ordering::Acquire)
    }

    /// Forward a processed buffer to the registered module.
    ///
    /// No-op without a registered module. A buffer shorter than
    /// `width * height * PIPELINE_CHANNELS` is reported and skipped.
    /// Returns true when the sink was invoked.
    pub fn process(
        &self,
        input: &[f32],
        width: usize,
        height: usize,
        profile: ColorProfileType,
        profile_filename: &str,
    ) -> bool {
        let slot = self.slot();
        let Some(owner) = slot.as_ref() else {
            return false;
        };

        let needed = width.saturating_mul(height).saturating_mul(PIPELINE_CHANNELS);
        if input.len() < needed {
            tracing::warn!(
                width,
                height,
                len = input.len(),
                needed,
                "Histogram buffer too short, frame skipped"
            );
            return false;
        }

        let frame = HistogramFrame {
            pixels: &input[..needed],
            width,
            height,
            profile,
            profile_filename,
            linear: self.is_linear(),
        };
        owner.sink.process(&frame);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
        last_len: AtomicUsize,
        last_linear: AtomicBool,
    }

    impl HistogramSink for Recorder {
        fn process(&self, frame: &HistogramFrame<'_>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_len.store(frame.pixels.len(), Ordering::SeqCst);
            self.last_linear.store(frame.linear, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_process_without_owner_is_noop() {
        let proxy = HistogramProxy::new();
        assert!(!proxy.process(&[0.0; 16], 2, 2, ColorProfileType::Srgb, ""));
    }

    #[test]
    fn test_process_forwards_to_current_owner_only() {
        let proxy = HistogramProxy::new();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        proxy.claim(ModuleHandle::new(0, 0), a.clone());
        proxy.process(&[0.0; 16], 2, 2, ColorProfileType::Srgb, "");
        proxy.claim(ModuleHandle::new(1, 0), b.clone());
        proxy.process(&[0.0; 16], 2, 2, ColorProfileType::Srgb, "");
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_short_buffer_is_skipped() {
        let proxy = HistogramProxy::new();
        let rec = Arc::new(Recorder::default());
        proxy.claim(ModuleHandle::new(0, 0), rec.clone());
        assert!(!proxy.process(&[0.0; 15], 2, 2, ColorProfileType::Srgb, ""));
        assert_eq!(rec.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_frame_is_trimmed_and_carries_linear_flag() {
        let proxy = HistogramProxy::new();
        let rec = Arc::new(Recorder::default());
        proxy.claim(ModuleHandle::new(0, 0), rec.clone());
        proxy.set_linear(true);
        assert!(proxy.process(&[0.0; 20], 2, 2, ColorProfileType::LinearRec2020, ""));
        assert_eq!(rec.last_len.load(Ordering::SeqCst), 16);
        assert!(rec.last_linear.load(Ordering::SeqCst));
    }

    #[test]
    fn test_linear_flag_is_visible_across_threads() {
        let proxy = HistogramProxy::new();
        let pipeline = proxy.clone();
        std::thread::spawn(move || pipeline.set_linear(true))
            .join()
            .unwrap();
        assert!(proxy.is_linear());
    }

    #[test]
    fn test_release_only_by_owner() {
        let proxy = HistogramProxy::new();
        let h = ModuleHandle::new(3, 1);
        proxy.claim(h, Arc::new(Recorder::default()));
        assert!(!proxy.release(ModuleHandle::new(3, 2)));
        assert!(proxy.release(h));
        assert!(proxy.owner().is_none());
    }

    #[test]
    fn test_profile_linearity() {
        assert!(ColorProfileType::LinearRec709.is_linear());
        assert!(!ColorProfileType::Srgb.is_linear());
    }
}
