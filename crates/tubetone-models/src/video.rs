//! Video metadata models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::format::AudioFormat;
use crate::utils::thumbnail_url;

/// A downloadable format offered for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FormatOption {
    /// Selector accepted by the download endpoint (e.g. `mp3-320`)
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Quality description (e.g. `320kbps`)
    pub quality: String,
    /// Media kind, always `audio`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Metadata describing a remote video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    /// 11-character source identifier
    pub id: String,
    /// Video title
    pub title: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Duration in seconds, as reported by the provider
    pub duration: String,
    /// Channel or uploader name
    pub author: String,
    /// View count (0 when the provider does not report it)
    pub views: u64,
    /// Upload date if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    /// Formats available for download
    pub formats: Vec<FormatOption>,
}

impl VideoInfo {
    /// Create metadata for a source id with the standard thumbnail and format list.
    pub fn new(source_id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = source_id.into();
        Self {
            thumbnail: thumbnail_url(&id),
            id,
            title: title.into(),
            duration: "0".to_string(),
            author: String::new(),
            views: 0,
            upload_date: None,
            formats: AudioFormat::options(),
        }
    }

    /// Set the duration in seconds.
    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration = seconds.to_string();
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the view count.
    pub fn with_views(mut self, views: u64) -> Self {
        self.views = views;
        self
    }

    /// Set the upload date.
    pub fn with_upload_date(mut self, date: Option<String>) -> Self {
        self.upload_date = date;
        self
    }
}
