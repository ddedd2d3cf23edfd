//! In-memory job table.
//!
//! The store is the single source of truth for job state. Every operation
//! takes the lock once, so each read or mutation is atomic with respect to
//! the engine, the status handler and the reaper.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tubetone_models::{DownloadJob, JobId, JobOutcome, JobState};

use crate::error::{JobError, JobResult};

/// Download jobs keyed by id.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, DownloadJob>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub async fn put(&self, job: DownloadJob) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    /// Insert a record whose id must not already be present.
    pub async fn insert_new(&self, job: DownloadJob) -> JobResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(JobError::Duplicate(job.id.to_string()));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    pub async fn get(&self, id: &JobId) -> Option<DownloadJob> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Remove a record. Returns whether it existed.
    pub async fn delete(&self, id: &JobId) -> bool {
        self.jobs.write().await.remove(id).is_some()
    }

    pub async fn list(&self) -> Vec<DownloadJob> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Record informational progress. Ignored unless the job is still
    /// processing, so a late report can never touch a settled job.
    pub async fn update_progress(&self, id: &JobId, percent: u8) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) if job.state() == JobState::Processing => {
                job.progress = percent.min(100);
                true
            }
            _ => false,
        }
    }

    /// Perform the single terminal transition of a job.
    pub async fn finish(&self, id: &JobId, outcome: JobOutcome) -> JobResult<DownloadJob> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::not_found(id.as_str()))?;

        if job.is_terminal() {
            return Err(JobError::AlreadyTerminal(id.to_string()));
        }

        let settled = job.clone().settle(outcome);
        *job = settled.clone();
        Ok(settled)
    }

    /// Delete every terminal record that finished at least `grace` before
    /// `now`. With a zero grace every terminal record goes.
    pub async fn remove_terminal(&self, grace: Duration, now: DateTime<Utc>) -> Vec<JobId> {
        let grace = chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let mut jobs = self.jobs.write().await;

        let expired: Vec<JobId> = jobs
            .values()
            .filter(|job| job.is_terminal())
            .filter(|job| match job.finished_at {
                Some(finished) => finished
                    .checked_add_signed(grace)
                    .map_or(false, |deadline| deadline <= now),
                None => true,
            })
            .map(|job| job.id.clone())
            .collect();

        for id in &expired {
            jobs.remove(id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use tubetone_models::AudioFormat;

    fn job() -> DownloadJob {
        DownloadJob::new(JobId::new(), "ABCDEFGHIJK", "song", AudioFormat::default())
    }

    #[tokio::test]
    async fn test_put_get_delete_list() {
        let store = JobStore::new();
        let a = job();
        let b = job();
        store.put(a.clone()).await;
        store.put(b.clone()).await;

        assert_eq!(store.get(&a.id).await, Some(a.clone()));
        assert_eq!(store.len().await, 2);
        assert_eq!(store.list().await.len(), 2);

        assert!(store.delete(&a.id).await);
        assert!(!store.delete(&a.id).await);
        assert_eq!(store.get(&a.id).await, None);
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_replaces_single_record_per_id() {
        let store = JobStore::new();
        let a = job();
        store.put(a.clone()).await;
        store.put(a.clone().fail("boom")).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&a.id).await.unwrap().state(), JobState::Failed);
    }

    #[tokio::test]
    async fn test_insert_new_rejects_duplicates() {
        let store = JobStore::new();
        let a = job();
        assert_ok!(store.insert_new(a.clone()).await);
        assert_eq!(
            store.insert_new(a.clone()).await,
            Err(JobError::Duplicate(a.id.to_string()))
        );
    }

    #[tokio::test]
    async fn test_finish_transitions_exactly_once() {
        let store = JobStore::new();
        let a = job();
        store.put(a.clone()).await;

        let done = store
            .finish(
                &a.id,
                JobOutcome::Completed {
                    download_url: a.download_url(),
                    size: 10,
                },
            )
            .await
            .unwrap();
        assert_eq!(done.state(), JobState::Completed);
        assert_eq!(done.progress, 100);

        let again = store
            .finish(&a.id, JobOutcome::Failed { error: "late".into() })
            .await;
        assert_eq!(again, Err(JobError::AlreadyTerminal(a.id.to_string())));
        assert_eq!(store.get(&a.id).await.unwrap(), done);
    }

    #[tokio::test]
    async fn test_finish_unknown_job() {
        let store = JobStore::new();
        let err = store
            .finish(&JobId::from("missing"), JobOutcome::Failed { error: "x".into() })
            .await
            .unwrap_err();
        assert_eq!(err, JobError::NotFound("missing".into()));
    }

    #[tokio::test]
    async fn test_progress_only_while_processing() {
        let store = JobStore::new();
        let a = job();
        store.put(a.clone()).await;

        assert!(store.update_progress(&a.id, 40).await);
        assert_eq!(store.get(&a.id).await.unwrap().progress, 40);

        store
            .finish(&a.id, JobOutcome::Failed { error: "x".into() })
            .await
            .unwrap();
        assert!(!store.update_progress(&a.id, 90).await);
        assert_eq!(store.get(&a.id).await.unwrap().progress, 0);
        assert!(!store.update_progress(&JobId::new(), 10).await);
        assert_err!(
            store
                .finish(&a.id, JobOutcome::Failed { error: "again".into() })
                .await
        );
    }

    #[tokio::test]
    async fn test_remove_terminal_keeps_processing() {
        let store = JobStore::new();
        let running = job();
        let done = job().complete(5);
        let failed = job().fail("x");
        store.put(running.clone()).await;
        store.put(done.clone()).await;
        store.put(failed.clone()).await;

        let removed = store.remove_terminal(Duration::ZERO, Utc::now()).await;
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&done.id));
        assert!(removed.contains(&failed.id));
        assert_eq!(store.list().await, vec![running]);
    }

    #[tokio::test]
    async fn test_remove_terminal_honours_grace() {
        let store = JobStore::new();
        let done = job().complete(5);
        store.put(done.clone()).await;

        let now = Utc::now();
        let removed = store.remove_terminal(Duration::from_secs(600), now).await;
        assert!(removed.is_empty());

        let later = now + chrono::Duration::seconds(601);
        let removed = store.remove_terminal(Duration::from_secs(600), later).await;
        assert_eq!(removed, vec![done.id]);
    }
}
