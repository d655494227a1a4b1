// PanelDock - ui/panels/modules.rs
//
// Side-panel container rendering: one expander per shown module, in
// registry order. Clicking a header focuses the module; the header toggles
// expansion for expandable modules.

use crate::app::state::AppState;
use crate::core::model::{ModuleHandle, PanelContainer};
use crate::ui::panels::presets;
use crate::ui::theme;

/// Render every shown module of `container`.
pub fn render_container(ui: &mut egui::Ui, state: &mut AppState, container: PanelContainer) {
    let handles = state.registry.shown_in(container);
    if handles.is_empty() {
        ui.weak("no modules in this view");
        return;
    }
    for handle in handles {
        render_module(ui, state, handle);
        ui.add_space(theme::MODULE_SPACING);
    }
}

fn render_module(ui: &mut egui::Ui, state: &mut AppState, handle: ModuleHandle) {
    let Some((name, title, expandable)) = state
        .registry
        .get(handle)
        .map(|m| (m.name().to_string(), m.display_name().to_string(), m.expandable()))
    else {
        return;
    };
    let expanded = state.registry.get_expanded(handle);
    let focused = state.registry.gui_module() == Some(handle);

    let mut header = egui::RichText::new(&title).strong();
    if focused {
        header = header.color(theme::FOCUS_ACCENT);
    }

    ui.push_id(&name, |ui| {
        ui.horizontal(|ui| {
            let clicked = if expandable {
                let arrow = if expanded { "\u{25be}" } else { "\u{25b8}" };
                ui.add(egui::Button::new(arrow).frame(false)).clicked()
                    | ui.add(egui::Label::new(header).sense(egui::Sense::click())).clicked()
            } else {
                ui.add(egui::Label::new(header).sense(egui::Sense::click()))
                    .clicked()
            };
            if clicked {
                state.registry.set_gui_module(Some(handle));
                if expandable {
                    state.registry.set_expanded(handle, !expanded);
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.menu_button("\u{2630}", |ui| {
                    if presets::menu_contents(ui, state, handle) {
                        ui.close_menu();
                    }
                })
                .response
                .on_hover_text("presets");
                if ui
                    .small_button("\u{27f2}")
                    .on_hover_text("reset parameters")
                    .clicked()
                {
                    state.registry.reset_module(handle);
                }
            });
        });

        if state.registry.get_expanded(handle) {
            let frame = egui::Frame::group(ui.style());
            let frame = if focused {
                frame.stroke(egui::Stroke::new(1.0, theme::FOCUS_ACCENT))
            } else {
                frame
            };
            let body = frame.show(ui, |ui| {
                ui.set_width(ui.available_width());
                state.registry.show_module(handle, ui);
            });
            if body.response.hovered() && ui.input(|i| i.pointer.primary_clicked()) {
                state.registry.set_gui_module(Some(handle));
            }
        }
    });
}
