//! Job submission and the background fetch/encode lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::{debug, warn, Instrument};

use tubetone_media::{AudioFetcher, FetchRequest, ProgressSink};
use tubetone_models::{
    extract_source_id, title_stem, AudioFormat, DownloadJob, JobId, JobOutcome,
};

use crate::error::{JobError, JobFailure, JobResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::store::JobStore;

/// Deadline for a single fetch/encode call.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory output files are written to
    pub downloads_dir: PathBuf,
    /// Deadline for the fetch/encode call of one job
    pub job_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

/// A client's request to convert one video.
#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    pub url: String,
    /// Format selector such as `mp3-320`
    pub format: Option<String>,
    /// Human title used for the output filename
    pub title: Option<String>,
}

/// Returned by [`JobEngine::submit`] as soon as the job is stored.
#[derive(Debug)]
pub struct SubmittedJob {
    /// The job as initially stored (`processing`)
    pub job: DownloadJob,
    /// Resolves with the terminal record once the job settles
    pub completion: oneshot::Receiver<DownloadJob>,
}

/// Accepts download requests and drives each job to a terminal state in the
/// background.
#[derive(Clone)]
pub struct JobEngine {
    store: Arc<JobStore>,
    fetcher: Arc<dyn AudioFetcher>,
    config: Arc<EngineConfig>,
}

impl JobEngine {
    pub fn new(store: Arc<JobStore>, fetcher: Arc<dyn AudioFetcher>, config: EngineConfig) -> Self {
        Self {
            store,
            fetcher,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate the request, store a `processing` record and start the
    /// background work. Returns without waiting on any of it.
    pub async fn submit(&self, request: DownloadRequest) -> JobResult<SubmittedJob> {
        let url = request.url.trim();
        let source_id =
            extract_source_id(url).map_err(|e| JobError::invalid_input(e.to_string()))?;
        let format = AudioFormat::from_selector(request.format.as_deref())
            .map_err(|e| JobError::invalid_input(e.to_string()))?;

        let job = DownloadJob::new(
            JobId::new(),
            source_id,
            title_stem(request.title.as_deref()),
            format,
        );
        self.store.insert_new(job.clone()).await?;

        metrics::record_job_submitted(&job.format);
        metrics::set_jobs_stored(self.store.len().await);

        let (done_tx, done_rx) = oneshot::channel();
        let logger = JobLogger::new(&job.id, "audio_download");
        let span = logger.span();
        tokio::spawn(
            self.clone()
                .run_job(job.clone(), url.to_string(), format, logger, done_tx)
                .instrument(span),
        );

        Ok(SubmittedJob {
            job,
            completion: done_rx,
        })
    }

    /// Current record of a job.
    pub async fn status(&self, id: &JobId) -> JobResult<DownloadJob> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| JobError::not_found(id.as_str()))
    }

    async fn run_job(
        self,
        job: DownloadJob,
        url: String,
        format: AudioFormat,
        logger: JobLogger,
        done: oneshot::Sender<DownloadJob>,
    ) {
        let started = Instant::now();
        let output_path = self.config.downloads_dir.join(&job.filename);
        logger.log_start(&format!("{} as {}", url, job.format));

        let (progress, mut progress_rx) = ProgressSink::channel();
        let forwarder = {
            let store = Arc::clone(&self.store);
            let id = job.id.clone();
            let logger = logger.clone();
            tokio::spawn(async move {
                while let Some(percent) = progress_rx.recv().await {
                    if store.update_progress(&id, percent).await {
                        logger.log_progress(percent);
                    }
                }
            })
        };

        let request = FetchRequest {
            url,
            source_id: job.source_id.clone(),
            output_path: output_path.clone(),
            format,
        };
        let result = match self.fetch_with_deadline(request, progress).await {
            Ok(()) => verify_output(&output_path).await,
            Err(failure) => Err(failure),
        };
        forwarder.abort();

        let outcome = match &result {
            Ok(size) => JobOutcome::Completed {
                download_url: job.download_url(),
                size: *size,
            },
            Err(failure) => {
                remove_partial_output(&output_path).await;
                JobOutcome::Failed {
                    error: failure.to_string(),
                }
            }
        };

        let settled = match self.store.finish(&job.id, outcome).await {
            Ok(settled) => settled,
            Err(e) => {
                logger.log_warning(&format!("Could not record outcome: {}", e));
                return;
            }
        };

        let elapsed = started.elapsed().as_secs_f64();
        match result {
            Ok(size) => {
                metrics::record_job_completed(elapsed, size);
                logger.log_completion(&format!("{} ({} bytes)", job.filename, size));
            }
            Err(failure) => {
                metrics::record_job_failed(failure.kind(), elapsed);
                logger.log_error(&failure.to_string());
            }
        }

        // The synchronous caller may have gone away.
        let _ = done.send(settled);
    }

    /// Run the fetcher in its own task and race it against the job timeout.
    /// On timeout the task is detached, not aborted.
    async fn fetch_with_deadline(
        &self,
        request: FetchRequest,
        progress: ProgressSink,
    ) -> Result<(), JobFailure> {
        let fetcher = Arc::clone(&self.fetcher);
        let handle = tokio::spawn(async move { fetcher.fetch(&request, progress).await });

        match tokio::time::timeout(self.config.job_timeout, handle).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(JobFailure::Adapter(e.to_string())),
            Ok(Err(join_error)) => Err(JobFailure::Adapter(format!(
                "Download task aborted: {}",
                join_error
            ))),
            Err(_) => Err(JobFailure::Timeout(self.config.job_timeout)),
        }
    }
}

/// Size of a finished output, which must exist and be non-empty.
async fn verify_output(path: &Path) -> Result<u64, JobFailure> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if !meta.is_file() => Err(JobFailure::Verification(
            "output is not a regular file".to_string(),
        )),
        Ok(meta) if meta.len() == 0 => {
            Err(JobFailure::Verification("output file is empty".to_string()))
        }
        Ok(meta) => Ok(meta.len()),
        Err(_) => Err(JobFailure::Verification(
            "output file was not created".to_string(),
        )),
    }
}

/// Best-effort removal of a failed job's output and any intermediate files
/// sharing its stem (e.g. `Song_1a2b3c4d.webm`).
async fn remove_partial_output(output_path: &Path) {
    remove_if_present(output_path).await;

    let (Some(dir), Some(stem)) = (output_path.parent(), output_path.file_stem()) else {
        return;
    };
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Skipping partial output scan");
            return;
        }
    };

    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.file_stem() == Some(stem) {
                    remove_if_present(&path).await;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Partial output scan interrupted");
                break;
            }
        }
    }
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}
