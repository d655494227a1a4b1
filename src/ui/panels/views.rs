// PanelDock - ui/panels/views.rs
//
// View switcher and per-module visibility menu for the top bar.

use crate::app::state::AppState;
use crate::core::model::View;

/// Render one selectable label per view; clicking switches the view.
pub fn render_switcher(ui: &mut egui::Ui, state: &mut AppState) {
    let current = state.registry.view();
    for view in View::all() {
        if ui
            .selectable_label(*view == current, view.label())
            .clicked()
        {
            state.switch_view(*view);
        }
    }
}

/// Render the "Modules" menu: a visibility checkbox per module.
///
/// Modules not declared in the current view are listed but disabled.
pub fn render_visibility_menu(ui: &mut egui::Ui, state: &mut AppState) {
    let view = state.registry.view();
    let rows: Vec<_> = state
        .registry
        .modules()
        .map(|m| (m.handle(), m.display_name().to_string()))
        .collect();

    for (handle, label) in rows {
        let declared = state.registry.is_visible_in_view(handle, view);
        let mut visible = state.registry.is_visible(handle);
        let response = ui.add_enabled(declared, egui::Checkbox::new(&mut visible, label));
        let response = if declared {
            response
        } else {
            response.on_disabled_hover_text(format!("not available in {}", view.label()))
        };
        if response.changed() {
            state.registry.set_visible(handle, visible);
        }
    }
}
