// PanelDock - gui.rs
//
// Top-level eframe::App implementation.
// Wires the module containers, the view switcher and the dialogs together,
// drives postponed updates and manages the demo pipeline lifecycle.

use crate::app::accels::CommonAction;
use crate::app::pipeline::{PipelineManager, PipelineProgress};
use crate::app::state::AppState;
use crate::core::model::PanelContainer;
use crate::ui;
use crate::util::constants::{MAX_PIPELINE_MESSAGES_PER_FRAME, PIPELINE_FRAME_INTERVAL_MS};
use std::time::{Duration, Instant};

/// The PanelDock application.
pub struct PanelDockApp {
    pub state: AppState,
    pub pipeline: PipelineManager,
    /// Visuals last pushed to egui, as (dark_mode, font_size).
    applied_style: Option<(bool, f32)>,
    frames: u64,
}

impl PanelDockApp {
    /// Create a new application instance with the given state.
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            pipeline: PipelineManager::new(),
            applied_style: None,
            frames: 0,
        }
    }

    fn sync_style(&mut self, ctx: &egui::Context) {
        let wanted = (self.state.config.dark_mode, self.state.config.font_size);
        if self.applied_style != Some(wanted) {
            ui::theme::apply(ctx, wanted.0, wanted.1);
            self.applied_style = Some(wanted);
        }
    }

    fn sync_pipeline(&mut self) {
        if self.state.pipeline_enabled && !self.pipeline.is_active() {
            self.pipeline.start(self.state.registry.pipeline_proxy());
        } else if !self.state.pipeline_enabled && self.pipeline.is_active() {
            self.pipeline.stop();
            self.state.status_message = "Pipeline stopped.".to_string();
        }

        for msg in self.pipeline.poll_progress(MAX_PIPELINE_MESSAGES_PER_FRAME) {
            match msg {
                PipelineProgress::Started => {
                    tracing::info!("Pipeline active");
                }
                PipelineProgress::Frame { index, .. } => {
                    self.frames = index + 1;
                }
                PipelineProgress::Stopped => {
                    tracing::info!(frames = self.frames, "Pipeline thread exited");
                }
            }
        }
    }

    /// Module shortcuts act on the focused module.
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (reset, presets) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::R),
                i.modifiers.command && i.key_pressed(egui::Key::P),
            )
        });
        if reset {
            self.state.dispatch_focused(CommonAction::Reset);
        }
        if presets {
            self.state.dispatch_focused(CommonAction::Presets);
        }
    }
}

impl eframe::App for PanelDockApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_style(ctx);
        self.sync_pipeline();
        self.handle_shortcuts(ctx);

        // Fire debounced module updates, then wake up for the next one.
        let now = Instant::now();
        self.state.registry.run_postponed_updates(now);
        if let Some(wait) = self.state.registry.time_until_next_update(now) {
            ctx.request_repaint_after(wait);
        }
        // Keep repainting while the pipeline runs so histogram and picker
        // readouts stay current.
        if self.pipeline.is_active() {
            ctx.request_repaint_after(Duration::from_millis(PIPELINE_FRAME_INTERVAL_MS));
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Save Layout").clicked() {
                        self.state.save_layout();
                        self.state.status_message = "Layout saved.".to_string();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Edit", |ui| {
                    if ui.button("Options\u{2026}").clicked() {
                        self.state.show_options = true;
                        ui.close_menu();
                    }
                    ui.separator();
                    let focused = self.state.registry.gui_module().is_some();
                    ui.add_enabled_ui(focused, |ui| {
                        if ui.button("Reset Focused Module").clicked() {
                            self.state.dispatch_focused(CommonAction::Reset);
                            ui.close_menu();
                        }
                        if ui.button("Presets of Focused Module\u{2026}").clicked() {
                            self.state.dispatch_focused(CommonAction::Presets);
                            ui.close_menu();
                        }
                    });
                    if ui.button("Apply Auto-apply Presets").clicked() {
                        let report = self.state.registry.autoapply_presets();
                        self.state.status_message = format!(
                            "Auto-apply: {} applied, {} stale, {} rejected.",
                            report.applied.len(),
                            report.stale.len(),
                            report.rejected.len()
                        );
                        ui.close_menu();
                    }
                });
                ui.menu_button("Modules", |ui| {
                    ui::panels::views::render_visibility_menu(ui, &mut self.state);
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        self.state.show_about = true;
                        ui.close_menu();
                    }
                });

                ui.separator();
                ui::panels::views::render_switcher(ui, &mut self.state);
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.pipeline.is_active() {
                    ui.label(
                        egui::RichText::new(" \u{25cf} LIVE ")
                            .strong()
                            .color(ui::theme::PIPELINE_LIVE),
                    );
                    ui.separator();
                }
                ui.label(&self.state.status_message);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !self.state.warnings.is_empty()
                        && ui
                            .button(
                                egui::RichText::new(format!(
                                    "\u{26a0} {}",
                                    self.state.warnings.len()
                                ))
                                .color(ui::theme::STATUS_WARN),
                            )
                            .clicked()
                    {
                        self.state.show_warnings = true;
                    }
                    let focused = self
                        .state
                        .registry
                        .gui_module()
                        .and_then(|h| self.state.registry.get(h))
                        .map(|m| m.display_name().to_string());
                    if let Some(name) = focused {
                        ui.label(format!("focus: {name}"));
                    }
                    if self.state.debug_mode {
                        ui.weak(format!("frame {}", self.frames));
                    }
                });
            });
        });

        let state = &mut self.state;

        egui::TopBottomPanel::top("top_container")
            .resizable(true)
            .default_height(ui::theme::EDGE_PANEL_HEIGHT)
            .show_animated(ctx, !state.registry.shown_in(PanelContainer::Top).is_empty(), |ui| {
                ui::panels::modules::render_container(ui, state, PanelContainer::Top);
            });

        egui::TopBottomPanel::bottom("bottom_container")
            .resizable(true)
            .default_height(ui::theme::EDGE_PANEL_HEIGHT)
            .show_animated(
                ctx,
                !state.registry.shown_in(PanelContainer::Bottom).is_empty(),
                |ui| {
                    ui::panels::modules::render_container(ui, state, PanelContainer::Bottom);
                },
            );

        egui::SidePanel::left("left_container")
            .default_width(ui::theme::SIDEBAR_WIDTH)
            .resizable(true)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("left_modules")
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        ui::panels::modules::render_container(ui, state, PanelContainer::Left);
                    });
            });

        egui::SidePanel::right("right_container")
            .default_width(ui::theme::SIDEBAR_WIDTH)
            .resizable(true)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("right_modules")
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        ui::panels::modules::render_container(ui, state, PanelContainer::Right);
                    });
            });

        // Central panel: the view itself is outside this framework.
        egui::CentralPanel::default().show(ctx, |ui| {
            let frame = ui.max_rect();
            ui.centered_and_justified(|ui| {
                ui.weak(format!("{} view", state.registry.view().label()));
            });
            ui::panels::overlay::render(ui, state, frame);
            if ui.input(|i| i.pointer.primary_clicked()) && ui.ui_contains_pointer() {
                state.registry.set_gui_module(None);
            }
        });

        // Dialogs
        ui::panels::presets::render_window(ctx, state);
        ui::panels::presets::render_editor(ctx, state);
        ui::panels::options::render(ctx, state);
        ui::panels::warnings::render(ctx, state);
        ui::panels::about::render(ctx, state);
    }

    /// Called by eframe when the application window is about to close.
    ///
    /// Saves the panel layout and stops the pipeline before the registry
    /// tears the modules down.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.pipeline.stop();
        self.state.save_layout();
        self.state.registry.teardown();
    }
}
