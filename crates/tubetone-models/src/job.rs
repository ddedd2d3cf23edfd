//! Download job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::format::{AudioFormat, AUDIO_EXTENSION};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 alphanumeric characters, used to keep output filenames unique.
    pub fn short(&self) -> String {
        self.0
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job state as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Fetch/encode is running
    Processing,
    /// Output file is ready
    Completed,
    /// Fetch, encode or verification failed
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome-specific job data. Serialized inline with a `status` tag, so a
/// completed job carries `downloadUrl` and `size`, a failed one `error`,
/// and a processing one neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Processing,
    Completed {
        #[serde(rename = "downloadUrl")]
        download_url: String,
        size: u64,
    },
    Failed {
        error: String,
    },
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Processing => JobState::Processing,
            JobOutcome::Completed { .. } => JobState::Completed,
            JobOutcome::Failed { .. } => JobState::Failed,
        }
    }
}

/// A tracked audio download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadJob {
    /// Unique job ID
    #[serde(rename = "jobId")]
    pub id: JobId,

    /// Current status and its outcome data
    #[serde(flatten)]
    pub outcome: JobOutcome,

    /// Progress (0-100), informational only
    pub progress: u8,

    /// Output filename inside the downloads directory
    pub filename: String,

    /// Sanitized title the filename was derived from
    pub video_title: String,

    /// Source video ID
    pub source_id: String,

    /// Requested format selector (e.g. `mp3-320`)
    pub format: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Terminal transition timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadJob {
    /// Create a new processing job. The filename combines the title stem with
    /// the job's short id so concurrent jobs never share an output path.
    pub fn new(
        id: JobId,
        source_id: impl Into<String>,
        title_stem: impl Into<String>,
        format: AudioFormat,
    ) -> Self {
        let video_title = title_stem.into();
        let filename = format!("{}_{}.{}", video_title, id.short(), AUDIO_EXTENSION);

        Self {
            id,
            outcome: JobOutcome::Processing,
            progress: 0,
            filename,
            video_title,
            source_id: source_id.into(),
            format: format.selector(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.outcome.state()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Relative URL the static surface serves this job's output from.
    pub fn download_url(&self) -> String {
        download_url(&self.filename)
    }

    /// Move the job into `outcome`. Progress follows the outcome: 100 when
    /// completed, 0 when failed.
    pub fn settle(mut self, outcome: JobOutcome) -> Self {
        self.progress = match outcome {
            JobOutcome::Completed { .. } => 100,
            JobOutcome::Failed { .. } => 0,
            JobOutcome::Processing => self.progress,
        };
        self.finished_at = outcome.state().is_terminal().then(Utc::now);
        self.outcome = outcome;
        self
    }

    /// Mark job as completed.
    pub fn complete(self, size: u64) -> Self {
        let download_url = self.download_url();
        self.settle(JobOutcome::Completed { download_url, size })
    }

    /// Mark job as failed.
    pub fn fail(self, error: impl Into<String>) -> Self {
        self.settle(JobOutcome::Failed {
            error: error.into(),
        })
    }
}

/// `/downloads/<percent-encoded filename>`
pub fn download_url(filename: &str) -> String {
    format!("/downloads/{}", urlencoding::encode(filename))
}
