//! Video upload and anomaly frame loading

use super::{emit, App};
use anomaly_watch::types::{BackendEvent, DecodedFrame};
use eframe::egui;
use std::path::PathBuf;
use tracing::{info, warn};

impl App {
    /// Ask for a video with the native picker
    pub(crate) fn pick_video(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Select a video")
            .add_filter("Video", anomaly_watch::constants::VIDEO_EXTENSIONS)
            .add_filter("All files", &["*"])
            .set_directory(self.settings.video_dir_or_default())
            .pick_file();

        if let Some(path) = picked {
            self.select_video(path);
        }
    }

    pub(crate) fn select_video(&mut self, path: PathBuf) {
        self.selected_size = std::fs::metadata(&path).ok().map(|m| m.len());
        if let Some(dir) = path.parent() {
            self.settings.last_video_dir = Some(dir.to_string_lossy().to_string());
        }
        self.controller.select_file(path);
    }

    pub(crate) fn submit_video(&mut self, ctx: &egui::Context) {
        let commands = self.controller.submit_video().into_iter().collect();
        self.run_commands(ctx, commands);
    }

    pub(crate) fn spawn_upload(&mut self, ctx: &egui::Context, path: PathBuf) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let result = client.upload_video(&path).await;
            emit(&tx, &ctx, BackendEvent::UploadFinished(result));
        });
    }

    pub(crate) fn spawn_frame_fetch(&mut self, ctx: &egui::Context, url: String) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let result = match client.fetch_image(&url).await {
                Ok(bytes) => tokio::task::spawn_blocking(move || DecodedFrame::decode(bytes))
                    .await
                    .unwrap_or_else(|e| {
                        Err(anomaly_watch::error::ApiError::Stream(format!(
                            "decoder task failed: {}",
                            e
                        )))
                    }),
                Err(e) => Err(e),
            };
            emit(&tx, &ctx, BackendEvent::AnomalyFrameLoaded { url, result });
        });
    }

    /// Write the shown anomaly frame to a file the user picks.
    pub(crate) fn save_anomaly_frame(&mut self) {
        let Some(frame) = self.controller.upload.anomaly.frame.as_ref() else {
            return;
        };
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save anomaly frame")
            .add_filter("JPEG image", &["jpg", "jpeg"])
            .set_file_name(format!("anomaly_{}.jpg", stamp))
            .save_file()
        else {
            return;
        };

        match std::fs::write(&path, &frame.encoded) {
            Ok(()) => {
                info!(path = %path.display(), "Anomaly frame saved");
                self.show_toast("Frame saved");
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to save anomaly frame");
                self.show_toast("Could not save frame");
            }
        }
    }
}
