//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching metadata or audio.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    /// Fetch/encode failure; displays the bare message so it can be shown to
    /// clients polling the job.
    #[error("{message}")]
    DownloadFailed { message: String },

    #[error("Video not found: {0}")]
    MetadataNotFound(String),

    #[error("Metadata lookup failed: {0}")]
    MetadataFailed(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create a metadata not-found error.
    pub fn metadata_not_found(message: impl Into<String>) -> Self {
        Self::MetadataNotFound(message.into())
    }

    /// Create a metadata failure error.
    pub fn metadata_failed(message: impl Into<String>) -> Self {
        Self::MetadataFailed(message.into())
    }

    /// Whether this error means the media does not exist (as opposed to a
    /// transient or tooling failure).
    pub fn is_not_found(&self) -> bool {
        matches!(self, MediaError::MetadataNotFound(_))
    }
}
