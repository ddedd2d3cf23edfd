//! Job error types.

use std::time::Duration;

use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

/// Errors returned synchronously by the engine and store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already finished: {0}")]
    AlreadyTerminal(String),

    #[error("Duplicate job id: {0}")]
    Duplicate(String),
}

impl JobError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }
}

/// Why a background job ended up `failed`. The display text is what clients
/// see in the job's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFailure {
    /// Fetch or encode failed
    #[error("{0}")]
    Adapter(String),

    /// The fetch/encode call did not settle before the deadline
    #[error("Download timeout after {}", describe_duration(.0))]
    Timeout(Duration),

    /// The adapter claimed success but the output is missing or empty
    #[error("File verification failed: {0}")]
    Verification(String),
}

impl JobFailure {
    /// Label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            JobFailure::Adapter(_) => "adapter",
            JobFailure::Timeout(_) => "timeout",
            JobFailure::Verification(_) => "verification",
        }
    }
}

fn describe_duration(d: &Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        format!("{} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    } else if secs >= 1 {
        format!("{} second{}", secs, if secs == 1 { "" } else { "s" })
    } else {
        format!("{} ms", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        assert_eq!(JobFailure::Adapter("network error".into()).to_string(), "network error");
        assert_eq!(
            JobFailure::Timeout(Duration::from_secs(300)).to_string(),
            "Download timeout after 5 minutes"
        );
        assert_eq!(
            JobFailure::Timeout(Duration::from_secs(90)).to_string(),
            "Download timeout after 90 seconds"
        );
        assert_eq!(
            JobFailure::Timeout(Duration::from_millis(250)).to_string(),
            "Download timeout after 250 ms"
        );
        assert_eq!(
            JobFailure::Verification("output file is empty".into()).to_string(),
            "File verification failed: output file is empty"
        );
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(JobFailure::Adapter(String::new()).kind(), "adapter");
        assert_eq!(JobFailure::Timeout(Duration::ZERO).kind(), "timeout");
        assert_eq!(JobFailure::Verification(String::new()).kind(), "verification");
    }
}
