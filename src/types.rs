//! Common types and data structures

use crate::error::ApiError;
use std::path::PathBuf;

/// UI tabs. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tab {
    #[default]
    Upload,
    LiveFeed,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Upload, Tab::LiveFeed];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Upload => "Upload Video",
            Tab::LiveFeed => "Live Feed",
        }
    }
}

/// Response body of `POST /upload`
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Only its truthiness matters; the frame always lives at `/detected_frame`
    #[serde(default)]
    pub frame_url: Option<serde_json::Value>,
}

impl UploadResponse {
    /// Whether the server flagged a frame: any `frame_url` other than null,
    /// `false`, `0` or an empty string.
    pub fn has_frame(&self) -> bool {
        match &self.frame_url {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(serde_json::Value::Array(_) | serde_json::Value::Object(_)) => true,
        }
    }
}

/// Response body of the start/stop live feed calls
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

/// A decoded image ready for upload to the GPU.
#[derive(Clone)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    /// Straight-alpha RGBA8 pixels, row-major
    pub rgba: Vec<u8>,
    /// Bytes as received from the server (JPEG for both endpoints)
    pub encoded: Vec<u8>,
}

impl DecodedFrame {
    pub fn decode(encoded: Vec<u8>) -> Result<Self, ApiError> {
        let img = image::load_from_memory(&encoded)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
            encoded,
        })
    }
}

impl std::fmt::Debug for DecodedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoded_len", &self.encoded.len())
            .finish()
    }
}

/// Outbound work requested by the controller and run by the app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    UploadVideo { path: PathBuf },
    FetchAnomalyFrame { url: String },
    OpenLiveStream { session: u64, url: String },
    CloseLiveStream { session: u64 },
    NotifyStartLiveFeed,
    NotifyStopLiveFeed,
}

/// Results coming back from background tasks
#[derive(Debug)]
pub enum BackendEvent {
    UploadFinished(Result<UploadResponse, ApiError>),
    AnomalyFrameLoaded {
        url: String,
        result: Result<DecodedFrame, ApiError>,
    },
    LiveFeedStarted(Result<StatusResponse, ApiError>),
    LiveFeedStopped(Result<StatusResponse, ApiError>),
    LiveFrame {
        session: u64,
        frame: DecodedFrame,
    },
    LiveStreamEnded {
        session: u64,
        error: Option<ApiError>,
    },
}
