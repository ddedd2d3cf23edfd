//! Structured logging for job lifecycles.

use tracing::{error, info, warn, Span};
use tubetone_models::JobId;

/// Logs lifecycle events of one job with its id and stage attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    stage: String,
}

impl JobLogger {
    /// Create a logger for `job_id` running `stage` (e.g. "audio_download").
    pub fn new(job_id: &JobId, stage: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Job started: {}", message);
    }

    pub fn log_progress(&self, percent: u8) {
        tracing::debug!(job_id = %self.job_id, stage = %self.stage, percent, "Job progress");
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, stage = %self.stage, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, stage = %self.stage, "Job failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Job completed: {}", message);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Span to instrument the background task with.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, stage = %self.stage)
    }
}
