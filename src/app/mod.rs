//! App module - contains the main application state and logic

mod live_feed;
mod modals;
mod upload;
mod views;

use crate::theme;
use crate::utils::frame_to_color_image;
use anomaly_watch::api::{ApiClient, Endpoints};
use anomaly_watch::controller::Controller;
use anomaly_watch::settings::Settings;
use anomaly_watch::types::{BackendEvent, Command, DecodedFrame};
use eframe::egui;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Most recent frame of a live feed session, overwritten by the stream task
pub(crate) type LiveFrameSlot = Arc<Mutex<Option<(u64, DecodedFrame)>>>;

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub(crate) controller: Controller,
    pub(crate) client: ApiClient,
    pub(crate) runtime: tokio::runtime::Runtime,
    // Background results
    pub(crate) events_tx: mpsc::UnboundedSender<BackendEvent>,
    pub(crate) events_rx: mpsc::UnboundedReceiver<BackendEvent>,
    pub(crate) live_slot: LiveFrameSlot,
    pub(crate) stream_tokens: HashMap<u64, CancellationToken>,
    // Textures, tagged with the controller revision they were built from
    pub(crate) logo_texture: Option<egui::TextureHandle>,
    pub(crate) anomaly_texture: Option<egui::TextureHandle>,
    pub(crate) anomaly_revision: u64,
    pub(crate) live_texture: Option<egui::TextureHandle>,
    pub(crate) live_revision: u64,
    // Selected video metadata
    pub(crate) selected_size: Option<u64>,
    // Settings window
    pub(crate) settings: Settings,
    pub(crate) show_settings: bool,
    pub(crate) server_url_input: String,
    // Toast notification
    pub(crate) toast_message: Option<String>,
    pub(crate) toast_start: Option<std::time::Instant>,
    pub(crate) central_panel_rect: Option<egui::Rect>,
    // Window
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
    pub(crate) data_dir: PathBuf,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        data_dir: PathBuf,
    ) -> std::io::Result<Self> {
        // Force dark theme
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        theme::apply_visuals(&cc.egui_ctx);

        let runtime = tokio::runtime::Runtime::new()?;
        let client = ApiClient::new(&settings.server_url, settings.request_timeout());
        let controller = Controller::new(client.endpoints().clone());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        info!(server = %client.endpoints().base(), "Client ready");

        Ok(Self {
            controller,
            client,
            runtime,
            events_tx,
            events_rx,
            live_slot: Arc::new(Mutex::new(None)),
            stream_tokens: HashMap::new(),
            logo_texture: None,
            anomaly_texture: None,
            anomaly_revision: 0,
            live_texture: None,
            live_revision: 0,
            selected_size: None,
            server_url_input: settings.server_url.clone(),
            settings,
            show_settings: false,
            toast_message: None,
            toast_start: None,
            central_panel_rect: None,
            window_pos: None,
            window_size: None,
            needs_center: false,
            data_dir,
        })
    }

    pub fn save_settings(&mut self) {
        self.settings.window_x = self.window_pos.map(|p| p.x);
        self.settings.window_y = self.window_pos.map(|p| p.y);
        self.settings.window_w = self.window_size.map(|s| s.x);
        self.settings.window_h = self.window_size.map(|s| s.y);
        self.settings.save(&self.data_dir);
    }

    /// Switch to another server. Open streams keep running until stopped.
    pub(crate) fn apply_server_url(&mut self, url: &str) {
        let endpoints = Endpoints::new(url);
        if endpoints.base().is_empty() || endpoints == *self.controller.endpoints() {
            return;
        }
        info!(server = %endpoints.base(), "Server changed");
        self.settings.server_url = endpoints.base().to_string();
        self.controller.set_endpoints(endpoints);
        self.rebuild_client();
    }

    /// Recreate the HTTP client after a settings change. Tasks already running
    /// keep the client they were spawned with.
    pub(crate) fn rebuild_client(&mut self) {
        self.client = ApiClient::new(
            self.controller.endpoints().base(),
            self.settings.request_timeout(),
        );
        self.save_settings();
    }

    pub(crate) fn show_toast(&mut self, msg: impl Into<String>) {
        self.toast_message = Some(msg.into());
        self.toast_start = Some(std::time::Instant::now());
    }

    // ========================================================================
    // COMMANDS & EVENTS
    // ========================================================================

    pub(crate) fn run_commands(&mut self, ctx: &egui::Context, commands: Vec<Command>) {
        for command in commands {
            debug!(?command, "Running command");
            match command {
                Command::UploadVideo { path } => self.spawn_upload(ctx, path),
                Command::FetchAnomalyFrame { url } => self.spawn_frame_fetch(ctx, url),
                Command::OpenLiveStream { session, url } => {
                    self.spawn_live_stream(ctx, session, url)
                }
                Command::CloseLiveStream { session } => self.close_live_stream(session),
                Command::NotifyStartLiveFeed => self.spawn_start_notify(ctx),
                Command::NotifyStopLiveFeed => self.spawn_stop_notify(ctx),
            }
        }
    }

    /// Apply everything background tasks produced since the last frame.
    pub(crate) fn poll_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.events_rx.try_recv() {
            if let BackendEvent::LiveStreamEnded { session, .. } = &event {
                self.stream_tokens.remove(session);
            }
            let follow_up = self.controller.handle(event);
            self.run_commands(ctx, follow_up);
        }

        let latest = match self.live_slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some((session, frame)) = latest {
            self.controller.handle(BackendEvent::LiveFrame { session, frame });
        }
    }

    /// Rebuild textures whose controller state changed.
    pub(crate) fn sync_textures(&mut self, ctx: &egui::Context) {
        let anomaly = &self.controller.upload.anomaly;
        if anomaly.revision != self.anomaly_revision {
            self.anomaly_revision = anomaly.revision;
            self.anomaly_texture = anomaly.frame.as_ref().map(|frame| {
                ctx.load_texture(
                    "anomaly_frame",
                    frame_to_color_image(frame),
                    egui::TextureOptions::LINEAR,
                )
            });
        }

        let live = &self.controller.live;
        if live.revision != self.live_revision {
            self.live_revision = live.revision;
            match &live.frame {
                Some(frame) => {
                    let image = frame_to_color_image(frame);
                    if let Some(texture) = &mut self.live_texture {
                        texture.set(image, egui::TextureOptions::LINEAR);
                    } else {
                        self.live_texture =
                            Some(ctx.load_texture("live_feed", image, egui::TextureOptions::LINEAR));
                    }
                }
                None => self.live_texture = None,
            }
        }
    }
}

/// Deliver a background result and wake the UI.
pub(crate) fn emit(tx: &mpsc::UnboundedSender<BackendEvent>, ctx: &egui::Context, event: BackendEvent) {
    if tx.send(event).is_err() {
        debug!("UI gone, dropping backend event");
    }
    ctx.request_repaint();
}
