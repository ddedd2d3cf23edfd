//! Shared data models for the tubetone backend.
//!
//! This crate provides Serde-serializable types for:
//! - Download jobs and their lifecycle states
//! - Audio output formats and bitrate selection
//! - Video metadata returned to clients
//! - Source URL parsing and filename sanitizing

pub mod format;
pub mod job;
pub mod utils;
pub mod video;

// Re-export common types
pub use format::{AudioFormat, FormatError, AUDIO_EXTENSION, DEFAULT_FORMAT, SUPPORTED_BITRATES};
pub use job::{download_url, DownloadJob, JobId, JobOutcome, JobState};
pub use utils::{
    extract_source_id, sanitize_filename, thumbnail_url, title_stem, watch_url, SourceIdError,
    SourceIdResult, DEFAULT_TITLE, SOURCE_ID_LEN,
};
pub use video::{FormatOption, VideoInfo};
