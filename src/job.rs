use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// -----------------------------------------------------------------------------
// Types

/// Identifier of one tracked job. Issued once at submission and used as the
/// only lookup key for the job's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// First 8 characters, used in branch names so a branch is traceable
    /// back to its job.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted record for one job. Exactly this shape is what the store
/// serializes: a mapping of job id to `{status, result}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub status: JobStatus,
    pub result: Option<String>,
}

impl Job {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            result: None,
        }
    }
}

/// A request to propose a change to a remote repository. Immutable once
/// accepted; the pipeline works from its own copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Free-text description of the change to propose.
    pub description: String,
    /// Address of the repository to clone and push to.
    pub repo_url: String,
    /// Branch to base the change on.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Optional shell-invocable verification command; a non-zero exit
    /// aborts the pipeline before anything is pushed.
    #[serde(default)]
    pub gate_command: Option<String>,
}

fn default_base_branch() -> String {
    "main".to_string()
}

/// Status and result as reported to callers. `status` is `"unknown"` for an
/// id that was never issued (or whose record was lost).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub status: String,
    pub result: Option<String>,
}

impl JobReport {
    pub fn unknown() -> Self {
        Self {
            status: "unknown".to_string(),
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_id_length() {
        let id = JobId::generate();
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_change_request_defaults() {
        let request: ChangeRequest =
            serde_json::from_str(r#"{"description": "Add docs", "repo_url": "https://github.com/o/r"}"#)
                .unwrap();
        assert_eq!(request.base_branch, "main");
        assert!(request.gate_command.is_none());
    }
}
