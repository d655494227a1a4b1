// PanelDock - ui/panels/warnings.rs
//
// Warnings window: startup warnings (config, preset database, module load
// failures) and failed preset operations, newest last.

use crate::app::state::AppState;

/// Render the warnings window (if `state.show_warnings` is true).
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_warnings {
        return;
    }

    let mut open = true;
    let mut clear = false;
    egui::Window::new(format!("Warnings ({})", state.warnings.len()))
        .id(egui::Id::new("warnings_window"))
        .open(&mut open)
        .collapsible(false)
        .resizable(true)
        .min_width(420.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            if state.warnings.is_empty() {
                ui.weak("No warnings.");
                return;
            }
            egui::ScrollArea::vertical()
                .id_salt("warnings_list")
                .max_height(260.0)
                .show(ui, |ui| {
                    for w in &state.warnings {
                        ui.label(egui::RichText::new(w).color(crate::ui::theme::STATUS_WARN));
                    }
                });
            ui.add_space(6.0);
            if ui.button("Clear").clicked() {
                clear = true;
            }
        });

    if clear {
        state.warnings.clear();
    }
    if !open {
        state.show_warnings = false;
    }
}
