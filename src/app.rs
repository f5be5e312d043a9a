use std::sync::Arc;

use anyhow::Result;
use futures_util::FutureExt;
use tracing::error;
use tracing::info;

use crate::clients::git::GitClient;
use crate::clients::git::GitOps;
use crate::clients::github::GithubClient;
use crate::clients::github::RepoHostOps;
use crate::config::Config;
use crate::job::ChangeRequest;
use crate::job::JobId;
use crate::job::JobReport;
use crate::job::JobStatus;
use crate::manager::JobManager;
use crate::pipeline::ChangePipeline;
use crate::store::JobStore;
use crate::store::build_store;

/// The wired service: job manager plus pipeline, behind the surface that
/// bindings (CLI, HTTP, workflow engines) call.
pub struct App {
    jobs: Arc<JobManager>,
    pipeline: Arc<ChangePipeline>,
}

impl App {
    pub fn new(
        config: Config,
        store: Arc<dyn JobStore>,
        git: Arc<dyn GitOps>,
        host: Arc<dyn RepoHostOps>,
    ) -> Self {
        Self {
            jobs: Arc::new(JobManager::new(store)),
            pipeline: Arc::new(ChangePipeline::new(config, git, host)),
        }
    }

    /// Build the app from the process environment with the real clients.
    pub async fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        let store = build_store(&config).await?;
        Ok(Self::new(config, store, Arc::new(GitClient), Arc::new(GithubClient)))
    }

    /// Accept a change request: persist a `Pending` record, schedule the
    /// pipeline on the runtime, and return the job id without waiting for
    /// any of the execution.
    pub async fn submit(&self, request: ChangeRequest) -> JobId {
        let id = self.jobs.create().await;
        info!("job {}: accepted change request for {}", id, request.repo_url);

        let jobs = Arc::clone(&self.jobs);
        let pipeline = Arc::clone(&self.pipeline);
        let job_id = id.clone();
        tokio::spawn(async move {
            jobs.transition(&job_id, JobStatus::Running, None).await;

            // A panicking step must still leave the job in a terminal
            // state, so the pipeline future is unwound here.
            let outcome = std::panic::AssertUnwindSafe(pipeline.run(&job_id, &request))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(message)) => {
                    info!("job {}: completed", job_id);
                    jobs.transition(&job_id, JobStatus::Completed, Some(message)).await;
                }
                Ok(Err(err)) => {
                    error!("job {}: failed: {}", job_id, err);
                    jobs.transition(&job_id, JobStatus::Failed, Some(err.to_string())).await;
                }
                Err(_) => {
                    error!("job {}: pipeline panicked", job_id);
                    jobs.transition(
                        &job_id,
                        JobStatus::Failed,
                        Some("pipeline aborted unexpectedly".to_string()),
                    )
                    .await;
                }
            }
        });

        id
    }

    /// Current status of a job, `"unknown"` for an id never issued.
    pub async fn status(&self, id: &JobId) -> String {
        self.jobs.status(id).await
    }

    /// Status and result; the result stays absent until the job reaches a
    /// terminal state.
    pub async fn result(&self, id: &JobId) -> JobReport {
        self.jobs.report(id).await
    }

    pub fn health(&self) -> &'static str {
        "ok"
    }
}
