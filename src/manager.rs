use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::job::Job;
use crate::job::JobId;
use crate::job::JobReport;
use crate::job::JobStatus;
use crate::store::JobMap;
use crate::store::JobStore;

/// Issues job identifiers and owns all access to the job store.
///
/// The store works in full snapshots, so every mutation is a
/// load-modify-save sequence; `mutations` serializes them so two jobs
/// finishing at the same time cannot overwrite each other's terminal state.
/// Store failures are absorbed here: a failed load reads as "no jobs yet",
/// a failed save is logged and dropped. Callers never see a store error,
/// only an `"unknown"` status or a stale one.
pub struct JobManager {
    store: Arc<dyn JobStore>,
    mutations: Mutex<()>,
}

impl JobManager {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            mutations: Mutex::new(()),
        }
    }

    /// Create a fresh job record in `Pending` state and return its id.
    pub async fn create(&self) -> JobId {
        let id = JobId::generate();
        let _guard = self.mutations.lock().await;
        let mut jobs = self.load_or_empty().await;
        jobs.insert(id.clone(), Job::pending());
        self.persist(&jobs).await;
        id
    }

    /// Move a job to a new status, optionally recording a result. A record
    /// that already reached a terminal state is left untouched.
    pub async fn transition(&self, id: &JobId, status: JobStatus, result: Option<String>) {
        let _guard = self.mutations.lock().await;
        let mut jobs = self.load_or_empty().await;
        if let Some(job) = jobs.get(id) {
            if job.status.is_terminal() {
                warn!("job {} is already {}, dropping transition to {}", id, job.status, status);
                return;
            }
        }
        jobs.insert(id.clone(), Job { status, result });
        self.persist(&jobs).await;
    }

    /// Current status, or `"unknown"` for an id that was never issued.
    pub async fn status(&self, id: &JobId) -> String {
        match self.load_or_empty().await.get(id) {
            Some(job) => job.status.to_string(),
            None => "unknown".to_string(),
        }
    }

    /// Status and result together; the result stays `None` until the job is
    /// terminal.
    pub async fn report(&self, id: &JobId) -> JobReport {
        match self.load_or_empty().await.get(id) {
            Some(job) => JobReport {
                status: job.status.to_string(),
                result: job.result.clone(),
            },
            None => JobReport::unknown(),
        }
    }

    async fn load_or_empty(&self) -> JobMap {
        match self.store.load().await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!("failed to load job store ({}), proceeding with empty mapping", err);
                JobMap::new()
            }
        }
    }

    async fn persist(&self, jobs: &JobMap) {
        if let Err(err) = self.store.save(jobs).await {
            warn!("failed to save job store: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> JobManager {
        JobManager::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_issues_distinct_ids() {
        let manager = manager();
        let a = manager.create().await;
        let b = manager.create().await;
        assert_ne!(a, b);
        assert_eq!(manager.status(&a).await, "pending");
        assert_eq!(manager.status(&b).await, "pending");
    }

    #[tokio::test]
    async fn test_unknown_id_reports_unknown() {
        let manager = manager();
        let id = JobId::generate();
        assert_eq!(manager.status(&id).await, "unknown");
        assert_eq!(manager.report(&id).await, JobReport::unknown());
    }

    #[tokio::test]
    async fn test_result_is_none_until_terminal() {
        let manager = manager();
        let id = manager.create().await;
        manager.transition(&id, JobStatus::Running, None).await;
        let report = manager.report(&id).await;
        assert_eq!(report.status, "running");
        assert_eq!(report.result, None);
    }

    #[tokio::test]
    async fn test_terminal_state_is_never_overwritten() {
        let manager = manager();
        let id = manager.create().await;
        manager
            .transition(&id, JobStatus::Completed, Some("done".to_string()))
            .await;
        manager
            .transition(&id, JobStatus::Failed, Some("late failure".to_string()))
            .await;

        let report = manager.report(&id).await;
        assert_eq!(report.status, "completed");
        assert_eq!(report.result, Some("done".to_string()));
    }

    #[tokio::test]
    async fn test_terminal_reads_are_idempotent() {
        let manager = manager();
        let id = manager.create().await;
        manager
            .transition(&id, JobStatus::Failed, Some("clone failed".to_string()))
            .await;

        let first = manager.report(&id).await;
        let second = manager.report(&id).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_records_survive_other_jobs_completing() {
        let manager = manager();
        let a = manager.create().await;
        let b = manager.create().await;
        manager
            .transition(&a, JobStatus::Completed, Some("a done".to_string()))
            .await;
        manager
            .transition(&b, JobStatus::Completed, Some("b done".to_string()))
            .await;

        assert_eq!(manager.report(&a).await.result, Some("a done".to_string()));
        assert_eq!(manager.report(&b).await.result, Some("b done".to_string()));
    }
}
