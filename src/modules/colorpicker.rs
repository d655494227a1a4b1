// PanelDock - modules/colorpicker.rs
//
// Global colour picker module (darkroom only). While the picker tool is
// active the module owns the colorpicker proxy; statistics arrive from the
// pipeline thread through the sink, which only forwards them over a channel.
// The widget side drains that channel in `gui`.

use crate::app::module::{LibModule, ModuleContext};
use crate::core::model::{PanelContainer, View, ViewSet};
use crate::core::proxy::colorpicker::{
    ColorStats, ColorpickerSink, LiveSample, PickedColor, PickerSize, SampleGeometry, SampleId,
};
use crate::util::error::ModuleError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{mpsc, Arc};

pub const NAME: &str = "colorpicker";

/// Relative size of the default picker area.
const DEFAULT_AREA: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorModel {
    #[default]
    Rgb,
    Lab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Min,
    Max,
}

impl Statistic {
    fn pick(&self, stats: &ColorStats) -> [f32; 3] {
        match self {
            Statistic::Mean => stats.mean,
            Statistic::Min => stats.min,
            Statistic::Max => stats.max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColorpickerParams {
    pub model: ColorModel,
    pub statistic: Statistic,
}

/// Events marshalled from the sink to the UI thread.
#[derive(Debug, Clone)]
pub enum PickerEvent {
    Panel(PickedColor),
    Samples(Vec<LiveSample>),
    Geometry(SampleGeometry),
}

struct ChannelSink {
    tx: mpsc::Sender<PickerEvent>,
}

impl ColorpickerSink for ChannelSink {
    fn update_panel(&self, picked: &PickedColor) {
        let _ = self.tx.send(PickerEvent::Panel(*picked));
    }

    fn update_samples(&self, samples: &[LiveSample]) {
        let _ = self.tx.send(PickerEvent::Samples(samples.to_vec()));
    }

    fn set_sample_geometry(&self, geometry: SampleGeometry) {
        let _ = self.tx.send(PickerEvent::Geometry(geometry));
    }
}

/// Format one colour triple for display.
pub fn format_values(model: ColorModel, v: [f32; 3]) -> String {
    match model {
        ColorModel::Rgb => format!(
            "{:>3} {:>3} {:>3}",
            (v[0].clamp(0.0, 1.0) * 255.0).round() as u8,
            (v[1].clamp(0.0, 1.0) * 255.0).round() as u8,
            (v[2].clamp(0.0, 1.0) * 255.0).round() as u8,
        ),
        ColorModel::Lab => format!("{:>5.1} {:>6.1} {:>6.1}", v[0], v[1], v[2]),
    }
}

/// Display colour of a picked RGB mean.
pub fn swatch_colour(rgb: [f32; 3]) -> egui::Color32 {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgb(c(rgb[0]), c(rgb[1]), c(rgb[2]))
}

pub struct ColorpickerModule {
    params: ColorpickerParams,
    rx: Option<mpsc::Receiver<PickerEvent>>,
    active: bool,
    picked: PickedColor,
    samples: Vec<LiveSample>,
    geometry: Option<SampleGeometry>,
}

impl ColorpickerModule {
    pub fn new() -> Self {
        Self {
            params: ColorpickerParams::default(),
            rx: None,
            active: false,
            picked: PickedColor::default(),
            samples: Vec::new(),
            geometry: None,
        }
    }

    pub fn create() -> Box<dyn LibModule> {
        Box::new(Self::new())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn picked(&self) -> PickedColor {
        self.picked
    }

    pub fn samples(&self) -> &[LiveSample] {
        &self.samples
    }

    /// Claim the picker and place the default area.
    pub fn activate(&mut self, ctx: &mut ModuleContext<'_>) {
        let (tx, rx) = mpsc::channel();
        let handle = ctx.handle();
        let picker = &mut ctx.proxy().colorpicker;
        picker.claim(handle, Arc::new(ChannelSink { tx }));
        match picker.size {
            PickerSize::Point => picker.set_point(0.5, 0.5),
            PickerSize::Box => picker.set_area(DEFAULT_AREA),
        }
        self.rx = Some(rx);
        self.active = true;
        self.drain();
        tracing::debug!(module = NAME, "Picker activated");
    }

    pub fn deactivate(&mut self, ctx: &mut ModuleContext<'_>) {
        if !self.active {
            return;
        }
        let handle = ctx.handle();
        ctx.proxy().colorpicker.release(handle);
        self.rx = None;
        self.active = false;
        self.geometry = None;
        tracing::debug!(module = NAME, "Picker deactivated");
    }

    /// Apply every event the sink queued since the last frame.
    pub fn drain(&mut self) -> usize {
        let Some(rx) = self.rx.as_ref() else {
            return 0;
        };
        let mut count = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                PickerEvent::Panel(picked) => self.picked = picked,
                PickerEvent::Samples(samples) => self.samples = samples,
                PickerEvent::Geometry(geometry) => self.geometry = Some(geometry),
            }
            count += 1;
        }
        count
    }

    fn show_picked(&self, ui: &mut egui::Ui) {
        let stats = match self.params.model {
            ColorModel::Rgb => &self.picked.rgb,
            ColorModel::Lab => &self.picked.lab,
        };
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(28.0, 18.0), egui::Sense::hover());
            ui.painter()
                .rect_filled(rect, 2.0, swatch_colour(self.picked.rgb.mean));
            ui.monospace(format_values(
                self.params.model,
                self.params.statistic.pick(stats),
            ));
        });
    }

    fn show_samples(&mut self, ui: &mut egui::Ui, ctx: &mut ModuleContext<'_>) {
        let mut remove: Option<SampleId> = None;
        let mut lock: Option<(SampleId, bool)> = None;
        let selected = ctx.proxy().colorpicker.selected_sample();
        let mut select: Option<Option<SampleId>> = None;

        for sample in &self.samples {
            ui.horizontal(|ui| {
                let (rect, resp) =
                    ui.allocate_exact_size(egui::vec2(18.0, 14.0), egui::Sense::click());
                ui.painter()
                    .rect_filled(rect, 2.0, swatch_colour(sample.picked.rgb.mean));
                if resp.clicked() {
                    let next = if selected == Some(sample.id) { None } else { Some(sample.id) };
                    select = Some(next);
                }
                let stats = match self.params.model {
                    ColorModel::Rgb => &sample.picked.rgb,
                    ColorModel::Lab => &sample.picked.lab,
                };
                let text = format_values(self.params.model, self.params.statistic.pick(stats));
                if selected == Some(sample.id) {
                    ui.label(egui::RichText::new(text).monospace().strong());
                } else {
                    ui.monospace(text);
                }
                let lock_label = if sample.locked { "unlock" } else { "lock" };
                if ui.small_button(lock_label).clicked() {
                    lock = Some((sample.id, !sample.locked));
                }
                if ui.small_button("x").clicked() {
                    remove = Some(sample.id);
                }
            });
        }

        let picker = &mut ctx.proxy().colorpicker;
        if let Some(next) = select {
            picker.select_sample(next);
        }
        if let Some((id, locked)) = lock {
            picker.set_sample_locked(id, locked);
        }
        if let Some(id) = remove {
            picker.remove_live_sample(id);
        }
        if lock.is_some() || remove.is_some() {
            self.samples = picker.live_samples();
        }
    }
}

impl Default for ColorpickerModule {
    fn default() -> Self {
        Self::new()
    }
}

impl LibModule for ColorpickerModule {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> String {
        "Global color picker".to_string()
    }

    fn views(&self) -> ViewSet {
        ViewSet::Only(&[View::Darkroom])
    }

    fn container(&self) -> PanelContainer {
        PanelContainer::Left
    }

    fn position(&self) -> i32 {
        800
    }

    fn cleanup(&mut self, ctx: &mut ModuleContext<'_>) {
        self.deactivate(ctx);
    }

    fn view_leave(&mut self, ctx: &mut ModuleContext<'_>, _old: View, _new: View) {
        self.deactivate(ctx);
    }

    fn gui(&mut self, ui: &mut egui::Ui, ctx: &mut ModuleContext<'_>) {
        self.drain();

        ui.horizontal(|ui| {
            let mut active = self.active;
            if ui.toggle_value(&mut active, "pick").changed() {
                if active {
                    self.activate(ctx);
                } else {
                    self.deactivate(ctx);
                }
            }
            let picker = &mut ctx.proxy().colorpicker;
            let mut boxed = picker.size == PickerSize::Box;
            if ui.checkbox(&mut boxed, "area").changed() {
                picker.size = if boxed { PickerSize::Box } else { PickerSize::Point };
                if self.active {
                    match picker.size {
                        PickerSize::Point => picker.set_point(0.5, 0.5),
                        PickerSize::Box => picker.set_area(DEFAULT_AREA),
                    }
                }
            }
        });

        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("colorpicker_model")
                .selected_text(match self.params.model {
                    ColorModel::Rgb => "RGB",
                    ColorModel::Lab => "Lab",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.params.model, ColorModel::Rgb, "RGB");
                    ui.selectable_value(&mut self.params.model, ColorModel::Lab, "Lab");
                });
            egui::ComboBox::from_id_salt("colorpicker_statistic")
                .selected_text(match self.params.statistic {
                    Statistic::Mean => "mean",
                    Statistic::Min => "min",
                    Statistic::Max => "max",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.params.statistic, Statistic::Mean, "mean");
                    ui.selectable_value(&mut self.params.statistic, Statistic::Min, "min");
                    ui.selectable_value(&mut self.params.statistic, Statistic::Max, "max");
                });
        });

        if self.active {
            self.show_picked(ui);
        } else {
            ui.weak("picker off");
        }

        ui.separator();
        ui.horizontal(|ui| {
            let picker = &mut ctx.proxy().colorpicker;
            ui.add_enabled_ui(self.active, |ui| {
                if ui.button("add sample").clicked() {
                    let geometry = self.geometry.unwrap_or(SampleGeometry::Area(DEFAULT_AREA));
                    picker.add_live_sample(geometry);
                    self.samples = picker.live_samples();
                }
            });
            if ui.button("clear").clicked() {
                picker.clear_live_samples();
                self.samples.clear();
            }
            let mut display = picker.display_samples();
            if ui.checkbox(&mut display, "display").changed() {
                picker.set_display_samples(display);
            }
            let mut restrict = picker.restrict_histogram();
            if ui
                .checkbox(&mut restrict, "restrict histogram")
                .on_hover_text("compute the histogram over the picked area only")
                .changed()
            {
                picker.set_restrict_histogram(restrict);
            }
        });
        self.show_samples(ui, ctx);
    }

    fn gui_reset(&mut self) {
        self.params = ColorpickerParams::default();
    }

    fn params(&self) -> Option<Vec<u8>> {
        serde_json::to_vec(&self.params).ok()
    }

    fn set_params(&mut self, params: &[u8]) -> Result<(), ModuleError> {
        self.params = serde_json::from_slice(params).map_err(|e| ModuleError::InvalidParams {
            name: NAME.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
