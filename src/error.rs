use thiserror::Error;

/// A pipeline step failure. The `Display` form of the variant is recorded
/// verbatim as the job's terminal result, so every message must stand on its
/// own as a one-line diagnostic.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("workspace error: {0}")]
    Workspace(String),

    #[error("version control error: {0}")]
    VersionControl(String),

    /// The gate command exited non-zero. The message is fixed; the gate's
    /// own output goes to the logs, not the job record.
    #[error("Tests failed. Aborting push.")]
    GateFailed,

    #[error("repository host error: {0}")]
    HostApi(String),
}

/// A store load/save failure. Never surfaced to callers of the manager;
/// absorbed there per the degrade-gracefully policy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("key-value service error: {0}")]
    Kv(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_failure_message_is_fixed() {
        assert_eq!(PipelineError::GateFailed.to_string(), "Tests failed. Aborting push.");
    }

    #[test]
    fn test_version_control_message_carries_detail() {
        let err = PipelineError::VersionControl("git clone failed: not found".to_string());
        assert!(err.to_string().contains("clone"));
    }
}
