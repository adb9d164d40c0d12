//! Tab bar and tab panel rendering

use super::App;
use crate::theme;
use crate::ui::components::{fit_frame, frame_placeholder, status_message, tab_selector};
use crate::utils::{format_bytes, rasterize_icon};
use anomaly_watch::constants::{APP_NAME, MSG_FRAME_UNAVAILABLE};
use anomaly_watch::types::Tab;
use eframe::egui;
use egui_phosphor::regular as icons;

impl App {
    pub(crate) fn render_tab_bar(&mut self, ctx: &egui::Context) {
        if self.logo_texture.is_none() {
            if let Some((pixels, w, h)) = rasterize_icon(56) {
                self.logo_texture = Some(ctx.load_texture(
                    "logo",
                    egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], &pixels),
                    egui::TextureOptions::LINEAR,
                ));
            }
        }

        egui::TopBottomPanel::top("tab_bar")
            .exact_height(theme::TAB_BAR_HEIGHT)
            .show_separator_line(true)
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::symmetric(16, 6)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    if let Some(texture) = &self.logo_texture {
                        ui.image(egui::load::SizedTexture::new(
                            texture.id(),
                            egui::vec2(24.0, 24.0),
                        ));
                    }
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(APP_NAME)
                                .size(theme::FONT_TITLE)
                                .strong()
                                .color(theme::TEXT_PRIMARY),
                        )
                        .selectable(false),
                    );
                    ui.add_space(theme::SPACING_XL);

                    for tab in Tab::ALL {
                        let icon = match tab {
                            Tab::Upload => icons::UPLOAD_SIMPLE,
                            Tab::LiveFeed => icons::VIDEO_CAMERA,
                        };
                        let highlighted = self.controller.tabs.is_highlighted(tab);
                        if tab_selector(ui, icon, tab.label(), highlighted).clicked() {
                            self.controller.switch_tab(tab);
                        }
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add(theme::button(icons::GEAR).min_size(egui::vec2(32.0, theme::BUTTON_HEIGHT)))
                            .on_hover_text("Settings")
                            .clicked()
                        {
                            self.show_settings = !self.show_settings;
                            self.server_url_input = self.settings.server_url.clone();
                        }
                        if self.controller.live.is_streaming() {
                            live_badge(ui);
                        }
                    });
                });
            });
    }

    pub(crate) fn render_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::same(16)),
            )
            .show(ctx, |ui| {
                self.central_panel_rect = Some(ui.max_rect());
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| match self.controller.tabs.active() {
                        Tab::Upload => self.render_upload_tab(ui, ctx),
                        Tab::LiveFeed => self.render_live_tab(ui, ctx),
                    });
            });
    }

    fn render_upload_tab(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        heading(ui, "Analyze a recorded video");
        ui.add(
            egui::Label::new(
                egui::RichText::new("The server scans the video and returns the first anomalous frame it finds.")
                    .size(theme::FONT_LABEL)
                    .color(theme::TEXT_DIM),
            )
            .wrap(),
        );
        ui.add_space(theme::SPACING_LG);

        let mut choose = false;
        let mut submit = false;
        theme::section_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                choose = ui
                    .add(
                        theme::button(format!("{}  Choose video", icons::FOLDER_OPEN))
                            .min_size(egui::vec2(0.0, theme::BUTTON_HEIGHT)),
                    )
                    .clicked();

                match &self.controller.upload.selected_file {
                    Some(path) => {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| path.display().to_string());
                        ui.label(
                            egui::RichText::new(format!("{}  {}", icons::FILE_VIDEO, name))
                                .color(theme::TEXT_SECONDARY),
                        )
                        .on_hover_text(path.display().to_string());
                        if let Some(size) = self.selected_size {
                            ui.label(
                                egui::RichText::new(format_bytes(size))
                                    .size(theme::FONT_SMALL)
                                    .color(theme::TEXT_DIM),
                            );
                        }
                    }
                    None => {
                        ui.label(
                            egui::RichText::new("No file selected, or drop one onto the window")
                                .color(theme::TEXT_DIM),
                        );
                    }
                }
            });

            ui.add_space(theme::SPACING_MD);
            ui.horizontal(|ui| {
                submit = ui
                    .add(
                        theme::button_accent(format!("{}  Upload & Analyze", icons::UPLOAD_SIMPLE))
                            .min_size(egui::vec2(0.0, theme::BUTTON_HEIGHT_LARGE)),
                    )
                    .clicked();
                if self.controller.upload.pending > 0 {
                    ui.spinner();
                }
            });
        });

        if choose {
            self.pick_video();
        }
        if submit {
            self.submit_video(ctx);
        }

        ui.add_space(theme::SPACING_LG);
        status_message(ui, &self.controller.upload.result_message);

        if !self.controller.upload.anomaly.visible {
            return;
        }

        ui.add_space(theme::SPACING_LG);
        let mut save = false;
        theme::section_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!("{}  Anomaly frame", icons::WARNING))
                        .size(theme::FONT_BODY)
                        .color(theme::STATUS_ERROR),
                );
                if self.anomaly_texture.is_some() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        save = ui
                            .add(theme::button(format!("{}  Save", icons::FLOPPY_DISK)))
                            .clicked();
                    });
                }
            });
            ui.add_space(theme::SPACING_MD);

            let width = ui.available_width();
            match &self.anomaly_texture {
                Some(texture) => {
                    let size = fit_frame(texture.size_vec2(), width);
                    ui.image(egui::load::SizedTexture::new(texture.id(), size));
                }
                None if self.controller.upload.anomaly.load_error => {
                    frame_placeholder(ui, width, MSG_FRAME_UNAVAILABLE);
                }
                None => frame_placeholder(ui, width, "Loading frame..."),
            }
        });

        if save {
            self.save_anomaly_frame();
        }
    }

    fn render_live_tab(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        heading(ui, "Live camera analysis");
        ui.add(
            egui::Label::new(
                egui::RichText::new("Streams the server's camera with anomalies marked on each frame.")
                    .size(theme::FONT_LABEL)
                    .color(theme::TEXT_DIM),
            )
            .wrap(),
        );
        ui.add_space(theme::SPACING_LG);

        let mut start = false;
        let mut stop = false;
        ui.horizontal(|ui| {
            start = ui
                .add(
                    theme::button_accent(format!("{}  Start Live Feed", icons::PLAY))
                        .min_size(egui::vec2(0.0, theme::BUTTON_HEIGHT_LARGE)),
                )
                .clicked();
            stop = ui
                .add(
                    theme::button_danger(format!("{}  Stop Live Feed", icons::STOP))
                        .min_size(egui::vec2(0.0, theme::BUTTON_HEIGHT_LARGE)),
                )
                .clicked();
        });

        if start {
            self.start_live_feed(ctx);
        }
        if stop {
            self.stop_live_feed(ctx);
        }

        ui.add_space(theme::SPACING_LG);
        status_message(ui, &self.controller.live.message);

        let live = &self.controller.live;
        if !live.visible {
            return;
        }

        ui.add_space(theme::SPACING_LG);
        let width = ui.available_width();
        match &self.live_texture {
            Some(texture) => {
                let size = fit_frame(texture.size_vec2(), width);
                ui.image(egui::load::SizedTexture::new(texture.id(), size));
            }
            None => frame_placeholder(ui, width, "Connecting to live feed..."),
        }
        ui.add_space(theme::SPACING_SM);
        ui.label(
            egui::RichText::new(format!("{} frames shown", live.frames_shown))
                .size(theme::FONT_SMALL)
                .color(theme::TEXT_DIM),
        );
    }
}

fn heading(ui: &mut egui::Ui, text: &str) {
    ui.add(
        egui::Label::new(
            egui::RichText::new(text)
                .size(theme::FONT_TITLE)
                .color(theme::TEXT_PRIMARY),
        )
        .selectable(false),
    );
}

/// Red dot with "LIVE", shown in the tab bar while a stream is open
fn live_badge(ui: &mut egui::Ui) {
    ui.label(
        egui::RichText::new("LIVE")
            .size(theme::FONT_SMALL)
            .strong()
            .color(theme::STATUS_LIVE),
    );
    let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
    ui.painter()
        .circle_filled(rect.center(), 4.0, theme::STATUS_LIVE);
}
