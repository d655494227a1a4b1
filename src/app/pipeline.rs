// PanelDock - app/pipeline.rs
//
// Synthetic image pipeline for the demo host: produces processed frames on a
// background thread and pushes them through the proxy broker exactly as a
// real processing pipeline would.
//
// Architecture:
//   - `PipelineManager` lives on the UI thread; `run_pipeline` runs on a
//     background thread producing one frame every PIPELINE_FRAME_INTERVAL_MS.
//   - An `Arc<AtomicBool>` cancel flag allows the UI to stop the pipeline.
//   - Each frame sets the histogram linearity flag, lends the buffer (or the
//     picked area of it when restricted) to the histogram owner, and computes colour statistics for the primary picker
//     and every unlocked live sample.
//   - Progress is sent over an mpsc channel that the UI polls each frame; the
//     proxy sinks themselves marshal their results to the UI thread.
//   - The sleep is split into PIPELINE_CANCEL_CHECK_INTERVAL_MS slices so
//     cancel is honoured promptly.

use crate::core::proxy::colorpicker::{ColorStats, PickedColor, SampleGeometry};
use crate::core::proxy::histogram::{ColorProfileType, PIPELINE_CHANNELS};
use crate::core::proxy::PipelineProxy;
use crate::util::constants::{
    PIPELINE_CANCEL_CHECK_INTERVAL_MS, PIPELINE_FRAME_HEIGHT, PIPELINE_FRAME_INTERVAL_MS,
    PIPELINE_FRAME_WIDTH, PIPELINE_PROFILE_SWITCH_FRAMES,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Messages from the pipeline thread to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineProgress {
    Started,
    /// One frame was produced and dispatched.
    Frame {
        index: u64,
        profile: ColorProfileType,
        /// Whether a histogram owner received the frame.
        histogram: bool,
        /// Whether a colorpicker owner received new statistics.
        picker: bool,
    },
    Stopped,
}

// =============================================================================
// PipelineManager
// =============================================================================

/// Manages the background pipeline thread.
pub struct PipelineManager {
    progress_rx: Option<mpsc::Receiver<PipelineProgress>>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl PipelineManager {
    pub fn new() -> Self {
        Self {
            progress_rx: None,
            cancel_flag: None,
        }
    }

    /// Start producing frames into `proxy`. A running pipeline is stopped first.
    pub fn start(&mut self, proxy: PipelineProxy) {
        self.stop();

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        self.progress_rx = Some(rx);
        self.cancel_flag = Some(Arc::clone(&cancel));

        std::thread::spawn(move || {
            run_pipeline(proxy, tx, cancel);
        });

        tracing::info!(
            width = PIPELINE_FRAME_WIDTH,
            height = PIPELINE_FRAME_HEIGHT,
            interval_ms = PIPELINE_FRAME_INTERVAL_MS,
            "Pipeline started"
        );
    }

    /// Request the background thread to stop.
    pub fn stop(&mut self) {
        if let Some(flag) = &self.cancel_flag {
            flag.store(true, Ordering::SeqCst);
            tracing::info!("Pipeline stop requested");
        }
        self.cancel_flag = None;
        self.progress_rx = None;
    }

    pub fn is_active(&self) -> bool {
        self.cancel_flag.is_some()
    }

    /// Drain up to `max` queued progress messages without blocking.
    pub fn poll_progress(&self, max: usize) -> Vec<PipelineProgress> {
        let mut messages = Vec::new();
        if let Some(ref rx) = self.progress_rx {
            while messages.len() < max {
                match rx.try_recv() {
                    Ok(msg) => messages.push(msg),
                    Err(_) => break,
                }
            }
        }
        messages
    }
}

impl Default for PipelineManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PipelineManager {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Background producer
// =============================================================================

fn run_pipeline(proxy: PipelineProxy, tx: mpsc::Sender<PipelineProgress>, cancel: Arc<AtomicBool>) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                // UI channel closed; exit silently.
                return;
            }
        };
    }

    send!(PipelineProgress::Started);

    let slices = (PIPELINE_FRAME_INTERVAL_MS / PIPELINE_CANCEL_CHECK_INTERVAL_MS).max(1);
    let (width, height) = (PIPELINE_FRAME_WIDTH, PIPELINE_FRAME_HEIGHT);
    let mut index: u64 = 0;

    loop {
        for _ in 0..slices {
            std::thread::sleep(Duration::from_millis(PIPELINE_CANCEL_CHECK_INTERVAL_MS));
            if cancel.load(Ordering::SeqCst) {
                tracing::debug!(frames = index, "Pipeline stopped");
                send!(PipelineProgress::Stopped);
                return;
            }
        }

        let progress = dispatch_frame(&proxy, index, width, height);
        tracing::trace!(index, ?progress, "Pipeline frame dispatched");
        send!(progress);
        index += 1;
    }
}

/// Render frame `index` and push it through every proxy channel.
///
/// While the colorpicker restricts the histogram, only the pixels under the
/// primary picker area are lent to the histogram owner.
pub fn dispatch_frame(
    proxy: &PipelineProxy,
    index: u64,
    width: usize,
    height: usize,
) -> PipelineProgress {
    let profile = if (index / PIPELINE_PROFILE_SWITCH_FRAMES) % 2 == 0 {
        ColorProfileType::Srgb
    } else {
        ColorProfileType::LinearRec709
    };
    let pixels = render_frame(index, width, height);

    proxy.histogram.set_linear(profile.is_linear());
    let histogram = match proxy.colorpicker.histogram_region() {
        Some(region) => {
            let (cropped, w, h) = crop_frame(&pixels, width, height, region);
            proxy.histogram.process(&cropped, w, h, profile, "")
        }
        None => proxy.histogram.process(&pixels, width, height, profile, ""),
    };

    let picker = match proxy.colorpicker.primary_geometry() {
        Some(geometry) => proxy
            .colorpicker
            .publish_picked(sample_stats(&pixels, width, height, geometry)),
        None => false,
    };

    let samples = proxy.colorpicker.sample_geometries();
    if !samples.is_empty() {
        let colours: Vec<_> = samples
            .iter()
            .map(|(id, geometry)| (*id, sample_stats(&pixels, width, height, *geometry)))
            .collect();
        proxy.colorpicker.publish_samples(&colours);
    }

    PipelineProgress::Frame {
        index,
        profile,
        histogram,
        picker,
    }
}

/// Render a drifting RGBA gradient, `width * height * PIPELINE_CHANNELS` floats.
pub fn render_frame(index: u64, width: usize, height: usize) -> Vec<f32> {
    let phase = (index % 64) as f32 / 64.0;
    let mut pixels = Vec::with_capacity(width * height * PIPELINE_CHANNELS);
    for y in 0..height {
        let v = y as f32 / height.max(1) as f32;
        for x in 0..width {
            let u = x as f32 / width.max(1) as f32;
            pixels.push((u + phase).fract());
            pixels.push(v);
            pixels.push(1.0 - (u * v + phase).fract());
            pixels.push(1.0);
        }
    }
    pixels
}

/// Pixel rectangle [x0, x1) x [y0, y1) covered by `geometry`.
fn sample_rect(geometry: SampleGeometry, width: usize, height: usize) -> (usize, usize, usize, usize) {
    let (bx0, by0, bx1, by1) = match geometry.clamped() {
        SampleGeometry::Area(size) => {
            let half = size / 2.0;
            (0.5 - half, 0.5 - half, 0.5 + half, 0.5 + half)
        }
        SampleGeometry::Box(b) => (b[0].min(b[2]), b[1].min(b[3]), b[0].max(b[2]), b[1].max(b[3])),
        SampleGeometry::Point { x, y } => (x, y, x, y),
    };

    let to_px = |v: f32, n: usize| ((v * n as f32).floor() as usize).min(n.saturating_sub(1));
    let x0 = to_px(bx0, width);
    let y0 = to_px(by0, height);
    let x1 = to_px(bx1, width).max(x0) + 1;
    let y1 = to_px(by1, height).max(y0) + 1;
    (x0, x1, y0, y1)
}

/// Copy the pixels under `geometry` into a new frame of their own size.
pub fn crop_frame(
    pixels: &[f32],
    width: usize,
    height: usize,
    geometry: SampleGeometry,
) -> (Vec<f32>, usize, usize) {
    if width == 0 || height == 0 || pixels.len() < width * height * PIPELINE_CHANNELS {
        return (Vec::new(), 0, 0);
    }
    let (x0, x1, y0, y1) = sample_rect(geometry, width, height);
    let row = (x1 - x0) * PIPELINE_CHANNELS;
    let mut out = Vec::with_capacity(row * (y1 - y0));
    for y in y0..y1 {
        let start = (y * width + x0) * PIPELINE_CHANNELS;
        out.extend_from_slice(&pixels[start..start + row]);
    }
    (out, x1 - x0, y1 - y0)
}

/// Mean/min/max of the RGB and Lab values of every pixel under `geometry`.
pub fn sample_stats(pixels: &[f32], width: usize, height: usize, geometry: SampleGeometry) -> PickedColor {
    if width == 0 || height == 0 || pixels.len() < width * height * PIPELINE_CHANNELS {
        return PickedColor::default();
    }
    let (x0, x1, y0, y1) = sample_rect(geometry, width, height);

    let mut rgb = Accumulator::new();
    let mut lab = Accumulator::new();
    for y in y0..y1 {
        for x in x0..x1 {
            let i = (y * width + x) * PIPELINE_CHANNELS;
            let px = [pixels[i], pixels[i + 1], pixels[i + 2]];
            rgb.add(px);
            lab.add(rgb_to_lab(px));
        }
    }

    PickedColor {
        rgb: rgb.finish(),
        lab: lab.finish(),
    }
}

struct Accumulator {
    sum: [f64; 3],
    min: [f32; 3],
    max: [f32; 3],
    count: usize,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            sum: [0.0; 3],
            min: [f32::MAX; 3],
            max: [f32::MIN; 3],
            count: 0,
        }
    }

    fn add(&mut self, v: [f32; 3]) {
        for c in 0..3 {
            self.sum[c] += f64::from(v[c]);
            self.min[c] = self.min[c].min(v[c]);
            self.max[c] = self.max[c].max(v[c]);
        }
        self.count += 1;
    }

    fn finish(self) -> ColorStats {
        if self.count == 0 {
            return ColorStats::default();
        }
        let n = self.count as f64;
        ColorStats {
            mean: self.sum.map(|s| (s / n) as f32),
            min: self.min,
            max: self.max,
        }
    }
}

/// Linear Rec.709 RGB to CIE Lab (D65).
pub fn rgb_to_lab(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b;
    let z = 0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b;

    // D65 white point.
    let f = |t: f32| {
        const DELTA: f32 = 6.0 / 29.0;
        if t > DELTA * DELTA * DELTA {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    };
    let fx = f(x / 0.950_47);
    let fy = f(y);
    let fz = f(z / 1.088_83);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}
