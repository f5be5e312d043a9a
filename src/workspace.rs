use std::path::Path;
use std::path::PathBuf;

use tracing::warn;

use crate::error::PipelineError;
use crate::job::JobId;

/// The isolated working directory for one job's checkout. Provisioned
/// before the clone and removed once the job's outcome is decided,
/// whichever way the run ends.
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub async fn provision(root: &Path, id: &JobId) -> Result<Self, PipelineError> {
        let path = root.join(format!("job-{}", id));
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|err| PipelineError::Workspace(format!("failed to create {}: {}", path.display(), err)))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory the repository is cloned into.
    pub fn repo_dir(&self) -> PathBuf {
        self.path.join("repo")
    }

    /// Remove the workspace. A failure here is logged, not surfaced; the
    /// job's outcome is already decided by the time cleanup runs.
    pub async fn cleanup(self) {
        if let Err(err) = tokio::fs::remove_dir_all(&self.path).await {
            warn!("failed to remove workspace {}: {}", self.path.display(), err);
        }
    }
}
