// PanelDock - ui/panels/options.rs
//
// Options dialog: runtime-configurable application settings.
// Shown when the user opens Edit > Options... from the menu bar.
//
// Sections:
//   1. Appearance    : font size, dark mode
//   2. Presets       : read-only preset policy
//   3. Image pipeline: start/stop the demo pipeline
//
// Changes apply immediately and last for the session; config.toml is not
// rewritten.

use crate::app::state::AppState;
use crate::core::preset::ReadonlyPolicy;
use crate::util::constants::{DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE};

/// Render the Options dialog (if `state.show_options` is true).
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_options {
        return;
    }

    let mut open = true;
    egui::Window::new("Options")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .default_width(400.0)
        .show(ctx, |ui| {
            // =========================================================
            // Section 1: Appearance
            // =========================================================
            ui.heading("Appearance");
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label("Font size:");
                let mut v = state.config.font_size as f64;
                if ui
                    .add(
                        egui::Slider::new(
                            &mut v,
                            (MIN_FONT_SIZE as f64)..=(MAX_FONT_SIZE as f64),
                        )
                        .step_by(0.5)
                        .suffix(" pt"),
                    )
                    .changed()
                {
                    state.config.font_size = (v as f32).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
                }
                if (state.config.font_size - DEFAULT_FONT_SIZE).abs() > 0.1
                    && ui
                        .small_button("Reset")
                        .on_hover_text("Reset to the built-in default")
                        .clicked()
                {
                    state.config.font_size = DEFAULT_FONT_SIZE;
                }
            });
            ui.checkbox(&mut state.config.dark_mode, "Dark mode");

            ui.add_space(10.0);
            ui.separator();
            ui.add_space(6.0);

            // =========================================================
            // Section 2: Presets
            // =========================================================
            ui.heading("Presets");
            ui.add_space(2.0);
            let mut policy = state.registry.presets().policy();
            ui.radio_value(
                &mut policy,
                ReadonlyPolicy::Overwrite,
                "Writes may replace read-only presets",
            );
            ui.radio_value(
                &mut policy,
                ReadonlyPolicy::Refuse,
                "Read-only presets cannot be changed",
            );
            if policy != state.registry.presets().policy() {
                state.registry.presets_mut().set_policy(policy);
                state.config.readonly_policy = policy;
                tracing::info!(policy = ?policy, "Read-only preset policy changed");
            }
            ui.label(
                egui::RichText::new("Built-in presets are always reinstalled at startup.")
                    .small()
                    .weak(),
            );

            ui.add_space(10.0);
            ui.separator();
            ui.add_space(6.0);

            // =========================================================
            // Section 3: Image pipeline
            // =========================================================
            ui.heading("Image pipeline");
            ui.add_space(2.0);
            ui.checkbox(
                &mut state.pipeline_enabled,
                "Render demo frames for histogram and color picker",
            );
        });

    if !open {
        state.show_options = false;
    }
}
