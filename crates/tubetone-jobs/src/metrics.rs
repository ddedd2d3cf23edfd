//! Job metrics. Recorded through the `metrics` facade; the API binary
//! installs the Prometheus recorder.

use metrics::{counter, gauge, histogram};

pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "tubetone_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "tubetone_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "tubetone_jobs_failed_total";
    pub const JOBS_IN_FLIGHT: &str = "tubetone_jobs_in_flight";
    pub const JOBS_STORED: &str = "tubetone_jobs_stored";
    pub const JOB_DURATION_SECONDS: &str = "tubetone_job_duration_seconds";
    pub const OUTPUT_BYTES: &str = "tubetone_output_bytes";

    pub const REAPER_FILES_REMOVED_TOTAL: &str = "tubetone_reaper_files_removed_total";
    pub const REAPER_JOBS_REMOVED_TOTAL: &str = "tubetone_reaper_jobs_removed_total";
}

pub fn record_job_submitted(format: &str) {
    counter!(names::JOBS_SUBMITTED_TOTAL, "format" => format.to_string()).increment(1);
    gauge!(names::JOBS_IN_FLIGHT).increment(1.0);
}

pub fn record_job_completed(duration_secs: f64, size: u64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    gauge!(names::JOBS_IN_FLIGHT).decrement(1.0);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "completed").record(duration_secs);
    histogram!(names::OUTPUT_BYTES).record(size as f64);
}

/// `reason` is one of the [`crate::JobFailure::kind`] labels.
pub fn record_job_failed(reason: &'static str, duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL, "reason" => reason).increment(1);
    gauge!(names::JOBS_IN_FLIGHT).decrement(1.0);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "failed").record(duration_secs);
}

/// Update the job store size gauge.
pub fn set_jobs_stored(count: usize) {
    gauge!(names::JOBS_STORED).set(count as f64);
}

pub fn record_reaper_sweep(files_removed: usize, jobs_removed: usize) {
    counter!(names::REAPER_FILES_REMOVED_TOTAL).increment(files_removed as u64);
    counter!(names::REAPER_JOBS_REMOVED_TOTAL).increment(jobs_removed as u64);
}
