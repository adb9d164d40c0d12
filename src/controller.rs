//! UI controller state
//!
//! Everything the window shows lives here, free of any egui types, so the
//! behaviour of each button can be exercised without a window. User actions
//! return the [`Command`]s the app must run; results come back through
//! [`Controller::handle`] as [`BackendEvent`]s.

use crate::api::Endpoints;
use crate::constants::*;
use crate::types::*;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Which panel is shown and which selector is highlighted.
#[derive(Debug, Default)]
pub struct TabSet {
    active: Tab,
}

impl TabSet {
    pub fn active(&self) -> Tab {
        self.active
    }

    pub fn is_visible(&self, tab: Tab) -> bool {
        self.active == tab
    }

    pub fn is_highlighted(&self, tab: Tab) -> bool {
        self.active == tab
    }

    pub fn switch_to(&mut self, tab: Tab) {
        self.active = tab;
    }
}

/// Result display for the last upload
#[derive(Debug, Default)]
pub struct AnomalyPanel {
    pub visible: bool,
    pub url: Option<String>,
    pub frame: Option<DecodedFrame>,
    pub load_error: bool,
    /// Bumped whenever `frame` changes so the UI knows to re-upload the texture
    pub revision: u64,
}

impl AnomalyPanel {
    fn clear(&mut self) {
        self.visible = false;
        self.url = None;
        self.frame = None;
        self.load_error = false;
        self.revision += 1;
    }
}

#[derive(Debug, Default)]
pub struct UploadPanel {
    pub selected_file: Option<PathBuf>,
    pub result_message: String,
    pub anomaly: AnomalyPanel,
    pub pending: usize,
}

#[derive(Debug, Default)]
pub struct LiveFeedPanel {
    /// Stream URL while the feed is shown, `None` otherwise
    pub source: Option<String>,
    pub visible: bool,
    pub message: String,
    pub session: u64,
    pub frame: Option<DecodedFrame>,
    /// Frames that reached the screen; intermediate frames dropped by the slot are not counted
    pub frames_shown: u64,
    pub revision: u64,
}

impl LiveFeedPanel {
    pub fn is_streaming(&self) -> bool {
        self.source.is_some()
    }
}

pub struct Controller {
    endpoints: Endpoints,
    pub tabs: TabSet,
    pub upload: UploadPanel,
    pub live: LiveFeedPanel,
    /// Blocking notice shown as a modal until dismissed
    pub alert: Option<String>,
    last_stamp: i64,
}

impl Controller {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            tabs: TabSet::default(),
            upload: UploadPanel::default(),
            live: LiveFeedPanel::default(),
            alert: None,
            last_stamp: 0,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Point future requests at another server. In-flight work is left alone.
    pub fn set_endpoints(&mut self, endpoints: Endpoints) {
        self.endpoints = endpoints;
    }

    pub fn select_file(&mut self, path: PathBuf) {
        debug!(path = %path.display(), "Video selected");
        self.upload.selected_file = Some(path);
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.tabs.switch_to(tab);
    }

    pub fn submit_video(&mut self) -> Option<Command> {
        let Some(path) = self.upload.selected_file.clone() else {
            self.alert = Some(MSG_SELECT_FILE.to_string());
            return None;
        };

        self.upload.anomaly.clear();
        self.upload.result_message = MSG_PROCESSING.to_string();
        self.upload.pending += 1;
        Some(Command::UploadVideo { path })
    }

    pub fn start_live_feed(&mut self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(3);
        if self.live.is_streaming() {
            commands.push(Command::CloseLiveStream {
                session: self.live.session,
            });
        }

        self.live.session += 1;
        let url = self.endpoints.live_feed();
        self.live.source = Some(url.clone());
        self.live.visible = true;
        self.live.frame = None;
        self.live.frames_shown = 0;
        self.live.revision += 1;

        commands.push(Command::OpenLiveStream {
            session: self.live.session,
            url,
        });
        commands.push(Command::NotifyStartLiveFeed);
        commands
    }

    pub fn stop_live_feed(&mut self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(2);
        commands.push(Command::NotifyStopLiveFeed);
        if self.live.is_streaming() {
            commands.push(Command::CloseLiveStream {
                session: self.live.session,
            });
        }

        self.live.source = None;
        self.live.visible = false;
        self.live.frame = None;
        self.live.revision += 1;
        commands
    }

    /// Apply a background result. May ask for follow-up work.
    pub fn handle(&mut self, event: BackendEvent) -> Vec<Command> {
        match event {
            BackendEvent::UploadFinished(result) => {
                self.upload.pending = self.upload.pending.saturating_sub(1);
                match result {
                    Ok(response) => return self.apply_upload_response(response),
                    Err(e) => {
                        error!(error = %e, "Error uploading video");
                        self.upload.result_message = MSG_UPLOAD_ERROR.to_string();
                    }
                }
            }
            BackendEvent::AnomalyFrameLoaded { url, result } => {
                let anomaly = &mut self.upload.anomaly;
                if anomaly.url.as_deref() != Some(url.as_str()) {
                    debug!(url = %url, "Ignoring stale anomaly frame");
                    return Vec::new();
                }
                match result {
                    Ok(frame) => {
                        anomaly.frame = Some(frame);
                        anomaly.load_error = false;
                    }
                    Err(e) => {
                        warn!(error = %e, url = %url, "Failed to load anomaly frame");
                        anomaly.frame = None;
                        anomaly.load_error = true;
                    }
                }
                anomaly.revision += 1;
            }
            BackendEvent::LiveFeedStarted(result) => {
                self.live.message = match result {
                    Ok(status) => {
                        info!(message = %status.message, "Live feed start acknowledged");
                        status.message
                    }
                    Err(e) => {
                        error!(error = %e, "Error starting live feed");
                        MSG_START_ERROR.to_string()
                    }
                };
            }
            BackendEvent::LiveFeedStopped(result) => {
                self.live.message = match result {
                    Ok(status) => {
                        info!(message = %status.message, "Live feed stop acknowledged");
                        status.message
                    }
                    Err(e) => {
                        error!(error = %e, "Error stopping live feed");
                        MSG_STOP_ERROR.to_string()
                    }
                };
            }
            BackendEvent::LiveFrame { session, frame } => {
                if session != self.live.session || !self.live.is_streaming() {
                    return Vec::new();
                }
                self.live.frame = Some(frame);
                self.live.frames_shown += 1;
                self.live.revision += 1;
            }
            BackendEvent::LiveStreamEnded { session, error } => {
                if session != self.live.session || !self.live.is_streaming() {
                    return Vec::new();
                }
                match error {
                    Some(e) => warn!(error = %e, session, "Live feed stream failed"),
                    None => info!(session, "Live feed stream closed by server"),
                }
                self.live.message = MSG_STREAM_ENDED.to_string();
            }
        }
        Vec::new()
    }

    fn apply_upload_response(&mut self, response: UploadResponse) -> Vec<Command> {
        info!(message = %response.message, frame_url = ?response.frame_url, "Upload analysed");
        let has_frame = response.has_frame();
        self.upload.result_message = response.message;

        if has_frame {
            let stamp = self.next_stamp();
            let url = self.endpoints.detected_frame(stamp);
            let anomaly = &mut self.upload.anomaly;
            anomaly.url = Some(url.clone());
            anomaly.frame = None;
            anomaly.load_error = false;
            anomaly.visible = true;
            anomaly.revision += 1;
            vec![Command::FetchAnomalyFrame { url }]
        } else {
            self.upload.result_message = MSG_NO_ANOMALY.to_string();
            self.upload.anomaly.clear();
            Vec::new()
        }
    }

    /// Millisecond timestamp, strictly increasing across calls.
    fn next_stamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn controller() -> Controller {
        Controller::new(Endpoints::new(DEFAULT_SERVER_URL))
    }

    fn frame() -> DecodedFrame {
        DecodedFrame {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
            encoded: vec![0xff, 0xd8],
        }
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 500,
            message: None,
        }
    }

    fn upload_with_frame(c: &mut Controller) -> String {
        c.select_file(PathBuf::from("clip.mp4"));
        c.submit_video().unwrap();
        let commands = c.handle(BackendEvent::UploadFinished(Ok(UploadResponse {
            message: "Anomaly Detected!".into(),
            frame_url: Some("/detected_frame".into()),
        })));
        match commands.as_slice() {
            [Command::FetchAnomalyFrame { url }] => url.clone(),
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn submit_without_file_alerts_and_sends_nothing() {
        let mut c = controller();
        assert_eq!(c.submit_video(), None);
        assert_eq!(c.alert.as_deref(), Some(MSG_SELECT_FILE));
        assert_eq!(c.upload.pending, 0);
        assert!(c.upload.result_message.is_empty());
    }

    #[test]
    fn submit_clears_previous_result_and_shows_processing() {
        let mut c = controller();
        upload_with_frame(&mut c);
        assert!(c.upload.anomaly.visible);

        let cmd = c.submit_video();
        assert_eq!(
            cmd,
            Some(Command::UploadVideo {
                path: PathBuf::from("clip.mp4")
            })
        );
        assert!(!c.upload.anomaly.visible);
        assert!(c.upload.anomaly.url.is_none());
        assert_eq!(c.upload.result_message, MSG_PROCESSING);
    }

    #[test]
    fn response_without_frame_hides_panel() {
        let mut c = controller();
        c.select_file(PathBuf::from("clip.mp4"));
        c.submit_video();
        let commands = c.handle(BackendEvent::UploadFinished(Ok(UploadResponse {
            message: "whatever the server said".into(),
            frame_url: None,
        })));
        assert!(commands.is_empty());
        assert!(!c.upload.anomaly.visible);
        assert_eq!(c.upload.result_message, MSG_NO_ANOMALY);
    }

    #[test]
    fn response_with_frame_shows_fresh_url() {
        let mut c = controller();
        let first = upload_with_frame(&mut c);
        assert!(c.upload.anomaly.visible);
        assert_eq!(c.upload.result_message, "Anomaly Detected!");
        assert!(first.starts_with("http://127.0.0.1:5000/detected_frame?time="));

        let second = upload_with_frame(&mut c);
        assert_ne!(first, second);
        assert_eq!(c.upload.anomaly.url.as_deref(), Some(second.as_str()));
    }

    fn fetch_for(c: &mut Controller, frame_url: serde_json::Value) -> Vec<Command> {
        c.select_file(PathBuf::from("clip.mp4"));
        c.submit_video();
        c.handle(BackendEvent::UploadFinished(Ok(UploadResponse {
            message: "Anomaly Detected!".into(),
            frame_url: Some(frame_url),
        })))
    }

    #[test]
    fn any_frame_reference_fetches_the_detected_frame_route() {
        let mut c = controller();
        for frame_url in [
            serde_json::json!("/static/out.png"),
            serde_json::json!("http://elsewhere.example/f.jpg"),
            serde_json::json!(true),
            serde_json::json!(1),
        ] {
            let commands = fetch_for(&mut c, frame_url.clone());
            match commands.as_slice() {
                [Command::FetchAnomalyFrame { url }] => assert!(
                    url.starts_with("http://127.0.0.1:5000/detected_frame?time="),
                    "{frame_url} fetched {url}"
                ),
                other => panic!("{frame_url} gave {other:?}"),
            }
            assert!(c.upload.anomaly.visible);
        }
    }

    #[test]
    fn falsy_frame_reference_means_no_anomaly() {
        let mut c = controller();
        for frame_url in [
            serde_json::json!(null),
            serde_json::json!(false),
            serde_json::json!(0),
            serde_json::json!(""),
        ] {
            let commands = fetch_for(&mut c, frame_url.clone());
            assert!(commands.is_empty(), "{frame_url} gave {commands:?}");
            assert!(!c.upload.anomaly.visible);
            assert_eq!(c.upload.result_message, MSG_NO_ANOMALY);
        }
    }

    #[test]
    fn boolean_frame_reference_deserializes() {
        let response: UploadResponse =
            serde_json::from_str(r#"{"message":"Anomaly Detected!","frame_url":true}"#).unwrap();
        assert!(response.has_frame());

        let response: UploadResponse =
            serde_json::from_str(r#"{"message":"No anomaly detected."}"#).unwrap();
        assert!(!response.has_frame());
    }

    #[test]
    fn upload_failure_shows_generic_error() {
        let mut c = controller();
        c.select_file(PathBuf::from("clip.mp4"));
        c.submit_video();
        c.handle(BackendEvent::UploadFinished(Err(server_error())));
        assert_eq!(c.upload.result_message, MSG_UPLOAD_ERROR);
        assert_eq!(c.upload.pending, 0);
    }

    #[test]
    fn stale_anomaly_frame_is_ignored() {
        let mut c = controller();
        let old = upload_with_frame(&mut c);
        let current = upload_with_frame(&mut c);

        c.handle(BackendEvent::AnomalyFrameLoaded {
            url: old,
            result: Ok(frame()),
        });
        assert!(c.upload.anomaly.frame.is_none());

        c.handle(BackendEvent::AnomalyFrameLoaded {
            url: current,
            result: Ok(frame()),
        });
        assert!(c.upload.anomaly.frame.is_some());
    }

    #[test]
    fn failed_anomaly_frame_keeps_panel_visible() {
        let mut c = controller();
        let url = upload_with_frame(&mut c);
        c.handle(BackendEvent::AnomalyFrameLoaded {
            url,
            result: Err(server_error()),
        });
        assert!(c.upload.anomaly.visible);
        assert!(c.upload.anomaly.load_error);
    }

    #[test]
    fn start_shows_stream_before_any_response() {
        let mut c = controller();
        let commands = c.start_live_feed();
        assert!(c.live.visible);
        assert_eq!(
            c.live.source.as_deref(),
            Some("http://127.0.0.1:5000/live_feed")
        );
        assert_eq!(
            commands,
            vec![
                Command::OpenLiveStream {
                    session: 1,
                    url: "http://127.0.0.1:5000/live_feed".into()
                },
                Command::NotifyStartLiveFeed,
            ]
        );

        c.handle(BackendEvent::LiveFeedStarted(Ok(StatusResponse {
            message: "Live Feed Analysis Started!".into(),
        })));
        assert_eq!(c.live.message, "Live Feed Analysis Started!");
    }

    #[test]
    fn start_failure_reports_error_but_keeps_stream_open() {
        let mut c = controller();
        c.start_live_feed();
        c.handle(BackendEvent::LiveFeedStarted(Err(server_error())));
        assert_eq!(c.live.message, MSG_START_ERROR);
        assert!(c.live.visible);
    }

    #[test]
    fn restart_closes_previous_session() {
        let mut c = controller();
        c.start_live_feed();
        let commands = c.start_live_feed();
        assert_eq!(commands[0], Command::CloseLiveStream { session: 1 });
        assert!(matches!(commands[1], Command::OpenLiveStream { session: 2, .. }));
    }

    #[test]
    fn stop_clears_source_regardless_of_outcome() {
        for outcome in [
            Ok(StatusResponse {
                message: "Live Feed Stopped!".into(),
            }),
            Err(server_error()),
        ] {
            let mut c = controller();
            c.start_live_feed();
            let commands = c.stop_live_feed();
            assert_eq!(
                commands,
                vec![
                    Command::NotifyStopLiveFeed,
                    Command::CloseLiveStream { session: 1 }
                ]
            );
            assert!(c.live.source.is_none());
            assert!(!c.live.visible);

            let failed = outcome.is_err();
            c.handle(BackendEvent::LiveFeedStopped(outcome));
            assert!(c.live.source.is_none());
            assert!(!c.live.visible);
            if failed {
                assert_eq!(c.live.message, MSG_STOP_ERROR);
            } else {
                assert_eq!(c.live.message, "Live Feed Stopped!");
            }
        }
    }

    #[test]
    fn frames_from_closed_sessions_are_dropped() {
        let mut c = controller();
        c.start_live_feed();
        c.handle(BackendEvent::LiveFrame {
            session: 1,
            frame: frame(),
        });
        assert_eq!(c.live.frames_shown, 1);

        c.stop_live_feed();
        c.handle(BackendEvent::LiveFrame {
            session: 1,
            frame: frame(),
        });
        assert!(c.live.frame.is_none());

        c.start_live_feed();
        c.handle(BackendEvent::LiveFrame {
            session: 1,
            frame: frame(),
        });
        assert!(c.live.frame.is_none());
        assert_eq!(c.live.frames_shown, 0);
    }

    #[test]
    fn stream_end_reported_only_for_current_session() {
        let mut c = controller();
        c.start_live_feed();
        c.start_live_feed();
        c.handle(BackendEvent::LiveStreamEnded {
            session: 1,
            error: None,
        });
        assert!(c.live.message.is_empty());

        c.handle(BackendEvent::LiveStreamEnded {
            session: 2,
            error: Some(ApiError::Stream("eof".into())),
        });
        assert_eq!(c.live.message, MSG_STREAM_ENDED);
        assert!(c.live.visible);
    }

    #[test]
    fn exactly_one_tab_visible_and_highlighted() {
        let mut c = controller();
        for target in [Tab::LiveFeed, Tab::Upload, Tab::Upload, Tab::LiveFeed] {
            c.switch_tab(target);
            let visible = Tab::ALL.iter().filter(|t| c.tabs.is_visible(**t)).count();
            let highlighted = Tab::ALL
                .iter()
                .filter(|t| c.tabs.is_highlighted(**t))
                .count();
            assert_eq!(visible, 1);
            assert_eq!(highlighted, 1);
            assert_eq!(c.tabs.active(), target);
        }
    }

    #[test]
    fn upload_tab_is_default() {
        assert_eq!(controller().tabs.active(), Tab::Upload);
    }
}
