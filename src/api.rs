//! HTTP client for the anomaly detection server

use crate::constants::*;
use crate::error::{ApiError, ApiResult};
use crate::mjpeg::MjpegParser;
use crate::types::{StatusResponse, UploadResponse};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// URL builder for the server's routes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn upload(&self) -> String {
        self.join(UPLOAD_PATH)
    }

    pub fn start_live_feed(&self) -> String {
        self.join(START_LIVE_FEED_PATH)
    }

    pub fn stop_live_feed(&self) -> String {
        self.join(STOP_LIVE_FEED_PATH)
    }

    pub fn live_feed(&self) -> String {
        self.join(LIVE_FEED_PATH)
    }

    /// Cache-busted URL of the last detected frame.
    pub fn detected_frame(&self, stamp: i64) -> String {
        format!("{}?time={}", self.join(DETECTED_FRAME_PATH), stamp)
    }

    fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }
}

/// Thin async wrapper over `reqwest` for every server call.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(format!("anomaly-watch/{}", APP_VERSION))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self {
            http,
            endpoints: Endpoints::new(base_url),
            request_timeout,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Send a video to `/upload` as multipart field `video`. No timeout: the
    /// server analyses the whole file before answering.
    pub async fn upload_video(&self, path: &Path) -> ApiResult<UploadResponse> {
        let io_err = |source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(io_err)?;
        let size = file.metadata().await.map_err(io_err)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        info!(path = %path.display(), bytes = size, "Uploading video");

        // Streamed from disk, recordings can be larger than memory
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = reqwest::multipart::Part::stream_with_length(body, size)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(self.endpoints.upload())
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<UploadResponse>().await?)
    }

    /// Fetch raw image bytes (the detected frame).
    pub async fn fetch_image(&self, url: &str) -> ApiResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn start_live_feed(&self) -> ApiResult<StatusResponse> {
        self.get_status(&self.endpoints.start_live_feed()).await
    }

    pub async fn stop_live_feed(&self) -> ApiResult<StatusResponse> {
        self.get_status(&self.endpoints.stop_live_feed()).await
    }

    async fn get_status(&self, url: &str) -> ApiResult<StatusResponse> {
        let response = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<StatusResponse>().await?)
    }

    /// Read the MJPEG stream at `url`, handing every JPEG part to `on_frame`
    /// until the stream closes or `token` is cancelled.
    ///
    /// Returns the number of parts delivered. Cancellation is not an error.
    pub async fn stream_live_feed<F>(
        &self,
        url: &str,
        token: &CancellationToken,
        mut on_frame: F,
    ) -> ApiResult<u64>
    where
        F: FnMut(Vec<u8>),
    {
        let response = tokio::select! {
            _ = token.cancelled() => return Ok(0),
            r = self.http.get(url).send() => r?,
        };
        let response = check_status(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(content_type = ?content_type, "Live feed stream opened");

        let mut parser = MjpegParser::from_content_type(content_type.as_deref());
        let mut stream = response.bytes_stream();
        let mut delivered = 0u64;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(delivered, "Live feed stream cancelled");
                    return Ok(delivered);
                }
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(data)) => {
                            for part in parser.push(&data)? {
                                delivered += 1;
                                on_frame(part);
                            }
                            if parser.is_finished() {
                                return Ok(delivered);
                            }
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(delivered),
                    }
                }
            }
        }
    }
}

/// Turn a non-success status into `ApiError::Status`, keeping the server's
/// JSON `message` when it sent one.
async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<StatusResponse>()
        .await
        .ok()
        .map(|body| body.message);
    warn!(status = status.as_u16(), message = ?message, "Server returned an error status");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_join_without_double_slash() {
        let ep = Endpoints::new("http://127.0.0.1:5000/");
        assert_eq!(ep.upload(), "http://127.0.0.1:5000/upload");
        assert_eq!(ep.start_live_feed(), "http://127.0.0.1:5000/start_live_feed");
        assert_eq!(ep.stop_live_feed(), "http://127.0.0.1:5000/stop_live_feed");
        assert_eq!(ep.live_feed(), "http://127.0.0.1:5000/live_feed");
    }

    #[test]
    fn detected_frame_is_stamped() {
        let ep = Endpoints::new("http://127.0.0.1:5000");
        assert_eq!(
            ep.detected_frame(1700000000123),
            "http://127.0.0.1:5000/detected_frame?time=1700000000123"
        );
        assert_eq!(
            Endpoints::new("http://10.0.0.2:8080/").detected_frame(5),
            "http://10.0.0.2:8080/detected_frame?time=5"
        );
    }
}
