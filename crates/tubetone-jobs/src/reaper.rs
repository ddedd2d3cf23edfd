//! Periodic cleanup of aged output files and settled job records.
//!
//! Each cycle runs two independent sweeps:
//! - files in the downloads directory older than the configured age are deleted
//! - terminal job records are removed from the store
//!
//! Processing jobs are never touched. Failures in one sweep do not stop the
//! other, and a failed cycle never stops the loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::store::JobStore;

/// Reaper configuration.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    pub downloads_dir: PathBuf,
    /// Time between sweeps
    pub interval: Duration,
    /// Files whose modification age exceeds this are deleted
    pub file_max_age: Duration,
    /// How long a terminal job record survives after it finished
    pub job_grace: Duration,
    pub enabled: bool,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            interval: Duration::from_secs(30 * 60),
            file_max_age: Duration::from_secs(60 * 60),
            job_grace: Duration::ZERO,
            enabled: true,
        }
    }
}

/// What a single sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub files_removed: usize,
    pub file_errors: usize,
    pub jobs_removed: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.files_removed == 0 && self.file_errors == 0 && self.jobs_removed == 0
    }
}

/// Cleanup service.
pub struct Reaper {
    store: Arc<JobStore>,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(store: Arc<JobStore>, config: ReaperConfig) -> Self {
        Self { store, config }
    }

    /// Start the sweep loop. The first sweep runs immediately.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("Download cleanup is disabled");
            return;
        }

        info!(
            dir = %self.config.downloads_dir.display(),
            "Starting download reaper (interval: {:?}, max file age: {:?})",
            self.config.interval,
            self.config.file_max_age
        );

        let mut ticker = interval(self.config.interval);

        loop {
            ticker.tick().await;

            let report = self.sweep_once().await;
            if report.is_empty() {
                debug!("Cleanup sweep found nothing to remove");
            } else {
                info!(
                    files_removed = report.files_removed,
                    file_errors = report.file_errors,
                    jobs_removed = report.jobs_removed,
                    "Cleanup sweep finished"
                );
            }
        }
    }

    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_once_at(SystemTime::now()).await
    }

    /// Run one sweep as if the current time were `now`.
    pub async fn sweep_once_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        if let Err(e) = self.sweep_files(now, &mut report).await {
            error!("Download file sweep failed: {:#}", e);
        }
        report.jobs_removed = self.sweep_jobs(now).await;

        metrics::record_reaper_sweep(report.files_removed, report.jobs_removed);
        metrics::set_jobs_stored(self.store.len().await);
        report
    }

    async fn sweep_files(&self, now: SystemTime, report: &mut SweepReport) -> anyhow::Result<()> {
        let dir = &self.config.downloads_dir;
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", dir.display()));
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("listing {}", dir.display()))?
        {
            let path = entry.path();
            let modified = match entry.metadata().await {
                Ok(meta) => meta.modified(),
                Err(e) => Err(e),
            };
            let modified = match modified {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not stat download file");
                    report.file_errors += 1;
                    continue;
                }
            };

            // Files from the future count as fresh.
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.config.file_max_age {
                continue;
            }

            // Aged entries that cannot be unlinked, such as directories, count as errors
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!(path = %path.display(), age_secs = age.as_secs(), "Removed old download");
                    report.files_removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove old download");
                    report.file_errors += 1;
                }
            }
        }

        Ok(())
    }

    async fn sweep_jobs(&self, now: SystemTime) -> usize {
        let removed = self
            .store
            .remove_terminal(self.config.job_grace, DateTime::<Utc>::from(now))
            .await;
        for id in &removed {
            debug!(job_id = %id, "Removed settled job record");
        }
        removed.len()
    }
}
