//! Error types for backend communication

use std::path::PathBuf;
use thiserror::Error;

/// Transport or backend failure for a single operation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status. `message` carries the server's JSON message when it sent one.
    #[error("server returned HTTP {status}")]
    Status { status: u16, message: Option<String> },

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed stream: {0}")]
    Stream(String),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),
}

pub type ApiResult<T> = Result<T, ApiError>;
