//! Reusable UI components

use crate::theme;
use eframe::egui;

/// Tab selector with an accent underline when active.
pub fn tab_selector(ui: &mut egui::Ui, icon: &str, label: &str, active: bool) -> egui::Response {
    let text = format!("{}  {}", icon, label);
    let galley_w = ui.fonts(|f| {
        f.layout_no_wrap(text.clone(), egui::FontId::proportional(theme::FONT_BODY), theme::TEXT_PRIMARY)
            .rect
            .width()
    });
    let width = (galley_w + theme::SPACING_XL * 2.0).max(theme::TAB_MIN_WIDTH);
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(width, theme::TAB_HEIGHT), egui::Sense::click());

    if response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }

    if ui.is_rect_visible(rect) {
        let base = if active { theme::BG_SURFACE } else { theme::BG_BASE };
        let (fill, draw_rect) = theme::button_visual(&response, base, rect);
        let painter = ui.painter();
        painter.rect_filled(draw_rect, theme::RADIUS_DEFAULT, fill);

        let color = if active { theme::TEXT_PRIMARY } else { theme::TEXT_MUTED };
        painter.text(
            draw_rect.center(),
            egui::Align2::CENTER_CENTER,
            text,
            egui::FontId::proportional(theme::FONT_BODY),
            color,
        );

        if active {
            painter.line_segment(
                [
                    egui::pos2(draw_rect.left() + 6.0, draw_rect.bottom() - 1.0),
                    egui::pos2(draw_rect.right() - 6.0, draw_rect.bottom() - 1.0),
                ],
                egui::Stroke::new(theme::STROKE_THICK, theme::ACCENT),
            );
        }
    }

    response
}

/// Status message line. Empty messages take no space.
pub fn status_message(ui: &mut egui::Ui, message: &str) {
    if message.is_empty() {
        return;
    }
    ui.add(
        egui::Label::new(
            egui::RichText::new(message)
                .size(theme::FONT_BODY)
                .color(theme::message_color(message)),
        )
        .wrap(),
    );
}

/// Size that fits an image of `image_size` into `max_width` and the theme's
/// maximum frame height, keeping its aspect ratio.
pub fn fit_frame(image_size: egui::Vec2, max_width: f32) -> egui::Vec2 {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return egui::vec2(max_width, max_width / theme::FRAME_ASPECT_RATIO);
    }
    let scale = (max_width / image_size.x)
        .min(theme::FRAME_MAX_HEIGHT / image_size.y)
        .min(1.0);
    image_size * scale
}

/// Dark box with a centered caption, drawn where a frame will appear.
pub fn frame_placeholder(ui: &mut egui::Ui, width: f32, caption: &str) {
    let height = (width / theme::FRAME_ASPECT_RATIO).min(theme::FRAME_MAX_HEIGHT);
    let (rect, _) = ui.allocate_exact_size(egui::vec2(width, height), egui::Sense::hover());
    if ui.is_rect_visible(rect) {
        let painter = ui.painter();
        painter.rect_filled(rect, theme::RADIUS_DEFAULT, theme::BG_FRAME);
        painter.rect_stroke(
            rect,
            theme::RADIUS_DEFAULT,
            egui::Stroke::new(theme::STROKE_DEFAULT, theme::BORDER_SUBTLE),
            egui::StrokeKind::Inside,
        );
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            caption,
            egui::FontId::proportional(theme::FONT_LABEL),
            theme::TEXT_DIM,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_frame_never_upscales() {
        let size = fit_frame(egui::vec2(320.0, 240.0), 1000.0);
        assert_eq!(size, egui::vec2(320.0, 240.0));
    }

    #[test]
    fn fit_frame_respects_width_and_height() {
        let size = fit_frame(egui::vec2(1920.0, 1080.0), 960.0);
        assert_eq!(size, egui::vec2(960.0, 540.0));

        let tall = fit_frame(egui::vec2(1000.0, 2000.0), 1000.0);
        assert!((tall.y - theme::FRAME_MAX_HEIGHT).abs() < 0.01);
    }
}
