//! Modal dialogs, settings window and toast notifications

use super::App;
use crate::theme;
use anomaly_watch::constants::{APP_VERSION, DEFAULT_SERVER_URL};
use eframe::egui;
use egui_phosphor::regular as icons;
use tracing::warn;

impl App {
    /// "Please select a video file." style notices. Blocks the window until dismissed.
    pub(crate) fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.controller.alert.clone() else {
            return;
        };

        let mut dismissed = false;
        let modal = egui::Modal::new(egui::Id::new("alert_modal"))
            .frame(theme::modal_frame())
            .show(ctx, |ui| {
                ui.set_width(320.0);
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(icons::WARNING)
                            .size(theme::FONT_TITLE)
                            .color(theme::STATUS_WARNING),
                    );
                    ui.label(
                        egui::RichText::new(&message)
                            .size(theme::FONT_BODY)
                            .color(theme::TEXT_PRIMARY),
                    );
                });
                ui.add_space(theme::SPACING_LG);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let ok = ui.add(
                        theme::button_accent("OK").min_size(egui::vec2(72.0, theme::BUTTON_HEIGHT)),
                    );
                    if ok.clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        dismissed = true;
                    }
                });
            });

        if dismissed || modal.should_close() {
            self.controller.dismiss_alert();
        }
    }

    pub(crate) fn render_settings(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }

        let mut open = true;
        let mut apply_url = false;
        let mut timeout_changed = false;
        let mut open_logs = false;

        egui::Window::new("Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(360.0)
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, theme::TAB_BAR_HEIGHT + 8.0))
            .frame(theme::modal_frame())
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new("SERVER")
                        .size(theme::FONT_SMALL)
                        .color(theme::TEXT_DIM),
                );
                ui.horizontal(|ui| {
                    let edit = ui.add(
                        egui::TextEdit::singleline(&mut self.server_url_input)
                            .hint_text(DEFAULT_SERVER_URL)
                            .desired_width(240.0),
                    );
                    let enter = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if ui.add(theme::button("Apply")).clicked() || enter {
                        apply_url = true;
                    }
                });
                ui.label(
                    egui::RichText::new(format!("Current: {}", self.controller.endpoints().base()))
                        .size(theme::FONT_SMALL)
                        .color(theme::TEXT_MUTED),
                );

                ui.add_space(theme::SPACING_MD);
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Request timeout")
                            .size(theme::FONT_LABEL)
                            .color(theme::TEXT_SECONDARY),
                    );
                    let drag = ui.add(
                        egui::DragValue::new(&mut self.settings.request_timeout_secs)
                            .range(1..=300)
                            .suffix(" s"),
                    );
                    timeout_changed = edit_committed(&drag);
                });

                ui.add_space(theme::SPACING_MD);
                ui.separator();
                ui.horizontal(|ui| {
                    if ui
                        .add(theme::button(format!("{}  Open logs folder", icons::FOLDER_OPEN)))
                        .clicked()
                    {
                        open_logs = true;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(format!("v{}", APP_VERSION))
                                .size(theme::FONT_SMALL)
                                .color(theme::TEXT_DIM),
                        );
                    });
                });
            });

        if apply_url {
            let url = self.server_url_input.clone();
            self.apply_server_url(&url);
            self.server_url_input = self.settings.server_url.clone();
        }
        if timeout_changed {
            self.rebuild_client();
        }
        if open_logs {
            let logs_dir = self.data_dir.join("logs");
            if let Err(e) = open::that(&logs_dir) {
                warn!(error = %e, path = %logs_dir.display(), "Failed to open logs folder");
            }
        }
        self.show_settings = open;
    }

    /// Toast at the bottom-right of the central panel, 3s visible then fade, pause on hover
    pub(crate) fn render_toast(&mut self, ctx: &egui::Context) {
        let (Some(msg), Some(panel_rect)) = (self.toast_message.clone(), self.central_panel_rect)
        else {
            return;
        };

        let visible_duration = 3.0;
        let fade_duration = 0.5;
        let total_duration = visible_duration + fade_duration;
        let margin = 12.0;
        let toast_pos = egui::pos2(panel_rect.right() - margin, panel_rect.bottom() - margin);
        let elapsed = self.toast_start.map(|t| t.elapsed().as_secs_f32()).unwrap_or(0.0);
        let alpha = if elapsed > visible_duration {
            ((total_duration - elapsed) / fade_duration).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let response = egui::Area::new(egui::Id::new("toast"))
            .fixed_pos(toast_pos)
            .pivot(egui::Align2::RIGHT_BOTTOM)
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(0x1a, 0x1a, 0x1e, (230.0 * alpha) as u8))
                    .stroke(egui::Stroke::new(
                        theme::STROKE_DEFAULT,
                        egui::Color32::from_rgba_unmultiplied(
                            theme::ACCENT.r(),
                            theme::ACCENT.g(),
                            theme::ACCENT.b(),
                            (100.0 * alpha) as u8,
                        ),
                    ))
                    .corner_radius(6.0)
                    .inner_margin(egui::Margin::symmetric(16, 10))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(&msg).color(
                            egui::Color32::from_rgba_unmultiplied(255, 255, 255, (255.0 * alpha) as u8),
                        ));
                    });
            });

        if response.response.hovered() {
            self.toast_start = Some(std::time::Instant::now());
        }

        if elapsed >= total_duration {
            self.toast_message = None;
            self.toast_start = None;
        } else {
            ctx.request_repaint();
        }
    }
}

/// A drag or typed edit is finished: settle the value once instead of on
/// every intermediate frame.
fn edit_committed(response: &egui::Response) -> bool {
    response.drag_stopped() || response.lost_focus()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer_button(pos: egui::Pos2, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::default(),
        }
    }

    /// Runs one frame with `events` and returns the drag value's rect and
    /// whether the edit was committed on that frame.
    fn step(
        ctx: &egui::Context,
        value: &mut u64,
        events: Vec<egui::Event>,
        time: f64,
    ) -> (egui::Rect, bool) {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(400.0, 300.0),
            )),
            time: Some(time),
            events,
            ..Default::default()
        };
        let mut out = (egui::Rect::NOTHING, false);
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                let drag = ui.add(egui::DragValue::new(&mut *value).range(1..=300));
                out = (drag.rect, edit_committed(&drag));
            });
        });
        out
    }

    #[test]
    fn dragging_commits_only_on_release() {
        let ctx = egui::Context::default();
        let mut value = 10u64;

        let (rect, committed) = step(&ctx, &mut value, Vec::new(), 0.0);
        assert!(!committed);
        let start = rect.center();
        let end = start + egui::vec2(40.0, 0.0);

        let (_, committed) = step(
            &ctx,
            &mut value,
            vec![egui::Event::PointerMoved(start), pointer_button(start, true)],
            0.1,
        );
        assert!(!committed);

        let (_, committed) = step(&ctx, &mut value, vec![egui::Event::PointerMoved(end)], 0.2);
        assert!(!committed, "mid-drag frame must not commit");
        assert_ne!(value, 10);

        let (_, committed) = step(&ctx, &mut value, vec![pointer_button(end, false)], 0.3);
        assert!(committed, "release must commit");
    }
}
