// PanelDock - ui/theme.rs
//
// Colour scheme, visuals and layout constants.
// No dependencies on app state or business logic.

use egui::{Color32, FontId, TextStyle};

/// Header tint of the module holding keyboard focus.
pub const FOCUS_ACCENT: Color32 = Color32::from_rgb(59, 130, 246); // Blue 500

/// Badge colour for read-only presets.
pub const READONLY_BADGE: Color32 = Color32::from_rgb(107, 114, 128); // Gray 500

/// Badge colour for auto-apply presets.
pub const AUTOAPPLY_BADGE: Color32 = Color32::from_rgb(34, 197, 94); // Green 500

/// Status bar colours.
pub const STATUS_WARN: Color32 = Color32::from_rgb(217, 119, 6); // Amber 600
pub const PIPELINE_LIVE: Color32 = Color32::from_rgb(34, 197, 94); // Green 500

/// Layout constants.
pub const SIDEBAR_WIDTH: f32 = 280.0;
pub const EDGE_PANEL_HEIGHT: f32 = 120.0;
pub const MODULE_SPACING: f32 = 4.0;

/// Apply dark/light visuals and scale every text style to `font_size`.
pub fn apply(ctx: &egui::Context, dark_mode: bool, font_size: f32) {
    ctx.set_visuals(if dark_mode {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    });

    ctx.style_mut(|style| {
        style.text_styles = [
            (TextStyle::Small, FontId::proportional(font_size * 0.75)),
            (TextStyle::Body, FontId::proportional(font_size)),
            (TextStyle::Button, FontId::proportional(font_size)),
            (TextStyle::Heading, FontId::proportional(font_size * 1.35)),
            (TextStyle::Monospace, FontId::monospace(font_size * 0.95)),
        ]
        .into();
    });
}
