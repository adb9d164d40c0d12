//! Application constants and user-facing messages

pub const APP_NAME: &str = "Anomaly Watch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// Backend routes
pub const UPLOAD_PATH: &str = "/upload";
pub const DETECTED_FRAME_PATH: &str = "/detected_frame";
pub const START_LIVE_FEED_PATH: &str = "/start_live_feed";
pub const STOP_LIVE_FEED_PATH: &str = "/stop_live_feed";
pub const LIVE_FEED_PATH: &str = "/live_feed";

/// Multipart field the server reads the video from
pub const UPLOAD_FIELD: &str = "video";

/// Boundary used when the stream's Content-Type doesn't name one
pub const DEFAULT_STREAM_BOUNDARY: &str = "frame";

// Messages
pub const MSG_SELECT_FILE: &str = "Please select a video file.";
pub const MSG_PROCESSING: &str = "Processing...";
pub const MSG_NO_ANOMALY: &str = "No anomaly detected.";
pub const MSG_UPLOAD_ERROR: &str = "Error processing video.";
pub const MSG_START_ERROR: &str = "Error starting live feed.";
pub const MSG_STOP_ERROR: &str = "Error stopping live feed.";
pub const MSG_STREAM_ENDED: &str = "Live feed stream ended.";
pub const MSG_FRAME_UNAVAILABLE: &str = "Frame unavailable";

/// Video extensions offered by the file picker
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "m4v", "wmv"];
