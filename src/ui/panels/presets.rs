// PanelDock - ui/panels/presets.rs
//
// Presets menu contents, the shortcut-opened presets window and the
// store/edit preset dialog.

use crate::app::state::AppState;
use crate::core::model::ModuleHandle;
use crate::ui::theme;

/// Deferred menu action; applied after the menu closure releases `state`.
enum PresetAction {
    Apply(String),
    Edit(String),
    Duplicate(String),
    Remove(String),
    AutoApply(String, bool),
    Store,
    Reset,
}

/// Render the presets menu of one module into `ui`.
///
/// Returns true when an entry was activated (the caller closes its menu).
pub fn menu_contents(ui: &mut egui::Ui, state: &mut AppState, handle: ModuleHandle) -> bool {
    let Some((module, version)) = state
        .registry
        .get(handle)
        .map(|m| (m.name().to_string(), m.version()))
    else {
        return false;
    };
    let presets = state.registry.presets().list(&module, version);
    let autoapply = state.registry.can_autoapply(handle);

    let mut action = None;
    if presets.is_empty() {
        ui.weak("no presets");
    }
    for preset in &presets {
        let name = &preset.key.name;
        ui.horizontal(|ui| {
            let button = ui.button(name);
            let button = if preset.description.is_empty() {
                button
            } else {
                button.on_hover_text(&preset.description)
            };
            if button.clicked() {
                action = Some(PresetAction::Apply(name.clone()));
            }
            if preset.readonly {
                ui.colored_label(theme::READONLY_BADGE, "read-only");
            }

            // Read-only presets are edited through a duplicate.
            let writable = !preset.readonly;
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(writable, egui::Button::new("\u{2715}").small())
                    .on_hover_text("remove")
                    .clicked()
                {
                    action = Some(PresetAction::Remove(name.clone()));
                }
                if ui
                    .add_enabled(writable, egui::Button::new("\u{270e}").small())
                    .on_hover_text("edit")
                    .clicked()
                {
                    action = Some(PresetAction::Edit(name.clone()));
                }
                if ui
                    .small_button("\u{2398}")
                    .on_hover_text("duplicate")
                    .clicked()
                {
                    action = Some(PresetAction::Duplicate(name.clone()));
                }
                if autoapply {
                    let mut on = preset.autoapply;
                    let toggle = ui
                        .add_enabled(writable, egui::Checkbox::new(&mut on, ""))
                        .on_hover_text("auto-apply");
                    if toggle.changed() {
                        action = Some(PresetAction::AutoApply(name.clone(), on));
                    }
                    if preset.autoapply {
                        ui.colored_label(theme::AUTOAPPLY_BADGE, "auto");
                    }
                }
            });
        });
    }

    ui.separator();
    if ui.button("store new preset\u{2026}").clicked() {
        action = Some(PresetAction::Store);
    }
    if ui.button("reset parameters").clicked() {
        action = Some(PresetAction::Reset);
    }

    let Some(action) = action else {
        return false;
    };
    match action {
        PresetAction::Apply(name) => state.apply_preset(&module, &name, version),
        PresetAction::Edit(name) => state.begin_edit_preset(&module, &name, version),
        PresetAction::Duplicate(name) => state.duplicate_preset(&module, &name, version),
        PresetAction::Remove(name) => state.remove_preset(&module, &name, version),
        PresetAction::AutoApply(name, on) => {
            state.set_preset_autoapply(&module, &name, version, on)
        }
        PresetAction::Store => state.begin_store_preset(handle),
        PresetAction::Reset => {
            state.registry.reset_module(handle);
        }
    }
    true
}

/// Render the presets window opened through a module's shortcut.
pub fn render_window(ctx: &egui::Context, state: &mut AppState) {
    let Some(handle) = state.presets_menu_for else {
        return;
    };
    let Some(title) = state
        .registry
        .get(handle)
        .map(|m| format!("Presets: {}", m.display_name()))
    else {
        state.presets_menu_for = None;
        return;
    };

    let mut open = true;
    let mut done = false;
    egui::Window::new(title)
        .id(egui::Id::new("presets_window"))
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .min_width(300.0)
        .show(ctx, |ui| {
            done = menu_contents(ui, state, handle);
        });

    if !open || done {
        state.presets_menu_for = None;
    }
}

/// Render the store/edit preset dialog (if one is open).
pub fn render_editor(ctx: &egui::Context, state: &mut AppState) {
    let Some(editor) = state.preset_editor.as_mut() else {
        return;
    };
    let title = if editor.original.is_some() {
        "Edit Preset"
    } else {
        "Store Preset"
    };

    let mut open = true;
    let mut commit = false;
    let mut cancel = false;
    egui::Window::new(title)
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .min_width(320.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.weak(format!("{} (v{})", editor.module, editor.version));
            ui.add_space(6.0);
            egui::Grid::new("preset_editor_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Name:");
                    let name = ui.text_edit_singleline(&mut editor.name);
                    if name.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        commit = true;
                    }
                    ui.end_row();

                    ui.label("Description:");
                    ui.text_edit_singleline(&mut editor.description);
                    ui.end_row();
                });
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    commit = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

    if !open || cancel {
        state.preset_editor = None;
    } else if commit {
        state.commit_preset_editor();
    }
}
