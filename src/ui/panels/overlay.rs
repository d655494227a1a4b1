// PanelDock - ui/panels/overlay.rs
//
// Colorpicker markers drawn over the central view while the picker's
// "display" option is on: the primary picker area plus every live sample,
// filled with its last picked colour.

use crate::app::state::AppState;
use crate::core::proxy::colorpicker::SampleGeometry;
use crate::modules::colorpicker::swatch_colour;
use crate::ui::theme;
use egui::{Pos2, Rect, Stroke};

/// Side of the marker drawn for a point sample, in points.
const POINT_MARKER: f32 = 8.0;

/// Screen rectangle of `geometry` inside the image area `frame`.
pub fn geometry_rect(geometry: SampleGeometry, frame: Rect) -> Rect {
    let at = |x: f32, y: f32| {
        Pos2::new(
            frame.min.x + x.clamp(0.0, 1.0) * frame.width(),
            frame.min.y + y.clamp(0.0, 1.0) * frame.height(),
        )
    };
    match geometry {
        SampleGeometry::Area(size) => {
            let half = size.clamp(0.0, 1.0) / 2.0;
            Rect::from_two_pos(at(0.5 - half, 0.5 - half), at(0.5 + half, 0.5 + half))
        }
        SampleGeometry::Box(b) => Rect::from_two_pos(at(b[0], b[1]), at(b[2], b[3])),
        SampleGeometry::Point { x, y } => Rect::from_center_size(at(x, y), egui::vec2(POINT_MARKER, POINT_MARKER)),
    }
}

fn outline(painter: &egui::Painter, rect: Rect, stroke: Stroke) {
    let corners = [rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()];
    for i in 0..corners.len() {
        painter.line_segment([corners[i], corners[(i + 1) % corners.len()]], stroke);
    }
}

/// Draw the sample markers into `frame`. Does nothing while display is off.
pub fn render(ui: &egui::Ui, state: &AppState, frame: Rect) {
    let picker = &state.registry.proxy().colorpicker;
    if !picker.display_samples() {
        return;
    }
    let painter = ui.painter_at(frame);

    for sample in picker.live_samples() {
        let rect = geometry_rect(sample.geometry, frame);
        painter.rect_filled(rect, 0.0, swatch_colour(sample.picked.rgb.mean).gamma_multiply(0.6));
        let width = if picker.selected_sample() == Some(sample.id) { 2.5 } else { 1.0 };
        outline(&painter, rect, Stroke::new(width, ui.visuals().strong_text_color()));
    }

    if let Some(geometry) = picker.geometry() {
        outline(&painter, geometry_rect(geometry, frame), Stroke::new(2.0, theme::FOCUS_ACCENT));
    }
}
