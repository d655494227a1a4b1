// PanelDock - modules/histogram.rs
//
// Histogram module: owns the histogram proxy while loaded and draws RGB
// histograms of the frames the pipeline hands it.
//
// Binning happens on the pipeline thread inside the proxy sink (rayon
// parallel fold over pixel chunks); the UI only reads the latest counts.
// Rebuilding the drawn curves is debounced through a postponed update.

use crate::app::module::{update_as, LibModule, ModuleContext};
use crate::core::model::{PanelContainer, View, ViewSet};
use crate::core::preset::BuiltinPreset;
use crate::core::proxy::histogram::{
    ColorProfileType, HistogramFrame, HistogramSink, PIPELINE_CHANNELS,
};
use crate::util::constants::HISTOGRAM_BINS;
use crate::util::error::ModuleError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

pub const NAME: &str = "histogram";

/// Current parameter schema version.
pub const VERSION: i32 = 2;

/// Pixels per rayon work item when binning.
const BIN_CHUNK_PIXELS: usize = 4096;

const RGB_COLOURS: [egui::Color32; 3] = [
    egui::Color32::from_rgb(230, 80, 80),
    egui::Color32::from_rgb(90, 200, 90),
    egui::Color32::from_rgb(90, 130, 240),
];

// =============================================================================
// Parameters
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramScale {
    #[default]
    Linear,
    Logarithmic,
}

/// Version 2 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramParams {
    pub scale: HistogramScale,
    /// Red, green and blue channel visibility.
    pub channels: [bool; 3],
}

impl Default for HistogramParams {
    fn default() -> Self {
        Self {
            scale: HistogramScale::Linear,
            channels: [true; 3],
        }
    }
}

/// Version 1 parameters: only a log switch, all channels always drawn.
#[derive(Debug, Deserialize)]
struct HistogramParamsV1 {
    logarithmic: bool,
}

fn encode(params: &HistogramParams) -> Vec<u8> {
    serde_json::to_vec(params).unwrap_or_default()
}

// =============================================================================
// Binning (pipeline thread)
// =============================================================================

/// Per-channel bin counts of one frame.
pub type ChannelBins = [Vec<u32>; 3];

fn empty_bins() -> ChannelBins {
    [
        vec![0; HISTOGRAM_BINS],
        vec![0; HISTOGRAM_BINS],
        vec![0; HISTOGRAM_BINS],
    ]
}

/// Bin interleaved RGBA floats (0.0 - 1.0) into `HISTOGRAM_BINS` per channel.
pub fn bin_pixels(pixels: &[f32]) -> ChannelBins {
    pixels
        .par_chunks(BIN_CHUNK_PIXELS * PIPELINE_CHANNELS)
        .fold(empty_bins, |mut acc, chunk| {
            for px in chunk.chunks_exact(PIPELINE_CHANNELS) {
                for (c, bins) in acc.iter_mut().enumerate() {
                    let v = px[c].clamp(0.0, 1.0);
                    let bin = ((v * (HISTOGRAM_BINS - 1) as f32).round() as usize)
                        .min(HISTOGRAM_BINS - 1);
                    bins[bin] += 1;
                }
            }
            acc
        })
        .reduce(empty_bins, |mut a, b| {
            for (ca, cb) in a.iter_mut().zip(b.iter()) {
                for (x, y) in ca.iter_mut().zip(cb.iter()) {
                    *x += *y;
                }
            }
            a
        })
}

/// Latest frame statistics shared with the sink.
#[derive(Debug, Clone)]
struct FrameBins {
    bins: ChannelBins,
    frames: u64,
    linear: bool,
    profile: ColorProfileType,
}

impl Default for FrameBins {
    fn default() -> Self {
        Self {
            bins: empty_bins(),
            frames: 0,
            linear: false,
            profile: ColorProfileType::None,
        }
    }
}

struct BinningSink {
    latest: Arc<Mutex<FrameBins>>,
}

impl HistogramSink for BinningSink {
    fn process(&self, frame: &HistogramFrame<'_>) {
        let bins = bin_pixels(frame.pixels);
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest.bins = bins;
        latest.frames += 1;
        latest.linear = frame.linear;
        latest.profile = frame.profile;
    }
}

/// Normalised curve heights (0.0 - 1.0) for drawing.
pub fn curve(bins: &[u32], scale: HistogramScale) -> Vec<f32> {
    let max = bins.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; bins.len()];
    }
    match scale {
        HistogramScale::Linear => bins.iter().map(|&c| c as f32 / max as f32).collect(),
        HistogramScale::Logarithmic => {
            let denom = (1.0 + max as f32).ln();
            bins.iter().map(|&c| (1.0 + c as f32).ln() / denom).collect()
        }
    }
}

// =============================================================================
// Module
// =============================================================================

pub struct HistogramModule {
    params: HistogramParams,
    latest: Arc<Mutex<FrameBins>>,
    /// Frame counter the drawn curves were built from.
    drawn_frame: u64,
    curves: [Vec<f32>; 3],
    linear: bool,
    profile: ColorProfileType,
}

impl HistogramModule {
    pub fn new() -> Self {
        Self {
            params: HistogramParams::default(),
            latest: Arc::new(Mutex::new(FrameBins::default())),
            drawn_frame: 0,
            curves: [Vec::new(), Vec::new(), Vec::new()],
            linear: false,
            profile: ColorProfileType::None,
        }
    }

    pub fn create() -> Box<dyn LibModule> {
        Box::new(Self::new())
    }

    pub fn params_value(&self) -> HistogramParams {
        self.params
    }

    /// Frames received from the pipeline so far.
    pub fn frames_seen(&self) -> u64 {
        self.snapshot().frames
    }

    fn snapshot(&self) -> FrameBins {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuild drawn curves from the latest bins.
    pub fn rebuild_curves(&mut self) {
        let snap = self.snapshot();
        for (c, bins) in snap.bins.iter().enumerate() {
            self.curves[c] = curve(bins, self.params.scale);
        }
        self.drawn_frame = snap.frames;
        self.linear = snap.linear;
        self.profile = snap.profile;
        tracing::trace!(frame = snap.frames, "Histogram curves rebuilt");
    }

    fn queue_rebuild(ctx: &mut ModuleContext<'_>) {
        ctx.queue_postponed_update(update_as::<HistogramModule>(|m| m.rebuild_curves()));
    }

    fn draw(&self, ui: &mut egui::Ui) {
        let width = ui.available_width().max(64.0);
        let (rect, _) = ui.allocate_exact_size(egui::vec2(width, 96.0), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 2.0, ui.visuals().extreme_bg_color);

        for (c, heights) in self.curves.iter().enumerate() {
            if !self.params.channels[c] || heights.len() < 2 {
                continue;
            }
            let step = rect.width() / (heights.len() - 1) as f32;
            let points: Vec<egui::Pos2> = heights
                .iter()
                .enumerate()
                .map(|(i, h)| egui::pos2(rect.left() + i as f32 * step, rect.bottom() - h * rect.height()))
                .collect();
            painter.add(egui::Shape::line(
                points,
                egui::Stroke::new(1.2, RGB_COLOURS[c]),
            ));
        }
    }
}

impl Default for HistogramModule {
    fn default() -> Self {
        Self::new()
    }
}

impl LibModule for HistogramModule {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> String {
        "Histogram".to_string()
    }

    fn version(&self) -> i32 {
        VERSION
    }

    fn views(&self) -> ViewSet {
        ViewSet::Only(&[View::Lighttable, View::Darkroom, View::Tethering, View::Print])
    }

    fn container(&self) -> PanelContainer {
        PanelContainer::Right
    }

    fn position(&self) -> i32 {
        1001
    }

    fn expandable(&self) -> bool {
        false
    }

    fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        let handle = ctx.handle();
        let sink = Arc::new(BinningSink {
            latest: Arc::clone(&self.latest),
        });
        ctx.proxy().histogram.claim(handle, sink);
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut ModuleContext<'_>) {
        let handle = ctx.handle();
        ctx.proxy().histogram.release(handle);
    }

    fn gui(&mut self, ui: &mut egui::Ui, ctx: &mut ModuleContext<'_>) {
        let frames = self.frames_seen();
        if frames != self.drawn_frame && !ctx.has_postponed_update() {
            Self::queue_rebuild(ctx);
        }

        self.draw(ui);

        ui.horizontal(|ui| {
            let mut changed = false;
            let log = self.params.scale == HistogramScale::Logarithmic;
            if ui.selectable_label(log, "log").clicked() {
                self.params.scale = if log {
                    HistogramScale::Linear
                } else {
                    HistogramScale::Logarithmic
                };
                changed = true;
            }
            for (c, label) in ["R", "G", "B"].iter().enumerate() {
                changed |= ui.toggle_value(&mut self.params.channels[c], *label).changed();
            }
            if changed {
                Self::queue_rebuild(ctx);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let mode = if self.linear { "linear" } else { "display" };
                ui.weak(format!("{} ({mode})", self.profile.label()));
            });
        });
    }

    fn gui_reset(&mut self) {
        self.params = HistogramParams::default();
        self.rebuild_curves();
    }

    fn params(&self) -> Option<Vec<u8>> {
        Some(encode(&self.params))
    }

    fn set_params(&mut self, params: &[u8]) -> Result<(), ModuleError> {
        let decoded: HistogramParams =
            serde_json::from_slice(params).map_err(|e| ModuleError::InvalidParams {
                name: NAME.to_string(),
                reason: e.to_string(),
            })?;
        self.params = decoded;
        self.rebuild_curves();
        Ok(())
    }

    fn legacy_params(&self, old: &[u8], old_version: i32) -> Option<(Vec<u8>, i32)> {
        match old_version {
            1 => {
                let v1: HistogramParamsV1 = serde_json::from_slice(old).ok()?;
                let v2 = HistogramParams {
                    scale: if v1.logarithmic {
                        HistogramScale::Logarithmic
                    } else {
                        HistogramScale::Linear
                    },
                    channels: [true; 3],
                };
                Some((encode(&v2), 2))
            }
            _ => None,
        }
    }

    fn builtin_presets(&self) -> Vec<BuiltinPreset> {
        vec![
            BuiltinPreset::new("linear", encode(&HistogramParams::default()))
                .with_description("linear scale, all channels"),
            BuiltinPreset::new(
                "logarithmic",
                encode(&HistogramParams {
                    scale: HistogramScale::Logarithmic,
                    channels: [true; 3],
                }),
            )
            .with_description("logarithmic scale, all channels"),
        ]
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_pixels_counts_every_pixel_per_channel() {
        // 10_000 pixels spans several rayon chunks.
        let mut pixels = Vec::new();
        for i in 0..10_000 {
            let v = if i % 2 == 0 { 0.0 } else { 1.0 };
            pixels.extend_from_slice(&[v, 0.5, 1.0 - v, 1.0]);
        }
        let bins = bin_pixels(&pixels);
        for channel in &bins {
            assert_eq!(channel.iter().sum::<u32>(), 10_000);
        }
        assert_eq!(bins[0][0], 5_000);
        assert_eq!(bins[0][HISTOGRAM_BINS - 1], 5_000);
        assert_eq!(bins[1][128], 10_000);
    }

    #[test]
    fn test_curve_scales() {
        let bins = [0, 1, 4, 9];
        assert_eq!(curve(&bins, HistogramScale::Linear)[2], 4.0 / 9.0);
        let log = curve(&bins, HistogramScale::Logarithmic);
        assert_eq!(log[0], 0.0);
        assert!((log[3] - 1.0).abs() < 1e-6);
        assert!(log[1] > 1.0 / 9.0);
        assert_eq!(curve(&[0, 0], HistogramScale::Linear), vec![0.0, 0.0]);
    }

    #[test]
    fn test_v1_params_upgrade_to_v2() {
        let m = HistogramModule::new();
        let (blob, version) = m.legacy_params(br#"{"logarithmic": true}"#, 1).unwrap();
        assert_eq!(version, 2);
        let upgraded: HistogramParams = serde_json::from_slice(&blob).unwrap();
        assert_eq!(upgraded.scale, HistogramScale::Logarithmic);
        assert!(m.legacy_params(b"{}", 0).is_none());
    }

    #[test]
    fn test_set_params_rejects_garbage_and_keeps_state() {
        let mut m = HistogramModule::new();
        m.params.scale = HistogramScale::Logarithmic;
        assert!(m.set_params(b"not json").is_err());
        assert_eq!(m.params_value().scale, HistogramScale::Logarithmic);
    }

    #[test]
    fn test_sink_records_frames() {
        let m = HistogramModule::new();
        let sink = BinningSink {
            latest: Arc::clone(&m.latest),
        };
        let pixels = vec![0.25; 4 * 4 * PIPELINE_CHANNELS];
        sink.process(&HistogramFrame {
            pixels: &pixels,
            width: 4,
            height: 4,
            profile: ColorProfileType::LinearRec709,
            profile_filename: "",
            linear: true,
        });
        assert_eq!(m.frames_seen(), 1);
        assert!(m.snapshot().linear);
    }
}
