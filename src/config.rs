use std::path::PathBuf;

use anyhow::Result;

/// Which persistence backend backs the job store. Chosen once at startup;
/// an unrecognized name is a startup error, not a silent downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Volatile,
    FileBacked,
    ExternalKv,
}

impl StoreBackend {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "memory" => Ok(StoreBackend::Volatile),
            "file" => Ok(StoreBackend::FileBacked),
            "kv" => Ok(StoreBackend::ExternalKv),
            other => anyhow::bail!("Unknown store backend '{}' (expected memory, file or kv)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Repository access token. Checked by the pipeline before any other
    /// step; absent means every submitted job fails immediately.
    pub token: Option<String>,
    pub store: StoreBackend,
    /// Where the file backend persists the job mapping.
    pub store_path: PathBuf,
    /// Base URL of the external key-value service, required for the kv
    /// backend.
    pub kv_url: Option<String>,
    /// Parent directory for per-job workspaces.
    pub workspace_root: PathBuf,
    /// Prefix for branches created by the pipeline.
    pub branch_prefix: String,
}

impl Config {
    /// Load config from the process environment.
    pub fn from_env() -> Result<Self> {
        let store = match std::env::var("PRBOT_STORE") {
            Ok(name) => StoreBackend::parse(&name)?,
            Err(_) => StoreBackend::FileBacked,
        };

        let store_path = std::env::var("PRBOT_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("prbot-jobs.json"));

        let workspace_root = std::env::var("PRBOT_WORKSPACE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("prbot-workspaces"));

        let branch_prefix =
            std::env::var("PRBOT_BRANCH_PREFIX").unwrap_or_else(|_| Self::default_branch_prefix());

        Ok(Self {
            token: std::env::var("GITHUB_TOKEN").ok(),
            store,
            store_path,
            kv_url: std::env::var("PRBOT_KV_URL").ok(),
            workspace_root,
            branch_prefix,
        })
    }

    pub fn default_branch_prefix() -> String {
        "prbot/".to_string()
    }

    /// Config rooted in a scratch directory (useful for tests)
    pub fn default_for_tests(root: PathBuf) -> Self {
        Self {
            token: Some("test-token".to_string()),
            store: StoreBackend::Volatile,
            store_path: root.join("jobs.json"),
            kv_url: None,
            workspace_root: root.join("workspaces"),
            branch_prefix: Self::default_branch_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_for_tests() {
        let config = Config::default_for_tests(PathBuf::from("/tmp/scratch"));
        assert_eq!(config.store, StoreBackend::Volatile);
        assert!(config.token.is_some());
        assert_eq!(config.branch_prefix, "prbot/");
    }

    #[test]
    fn test_parse_backend_names() {
        assert_eq!(StoreBackend::parse("memory").unwrap(), StoreBackend::Volatile);
        assert_eq!(StoreBackend::parse("file").unwrap(), StoreBackend::FileBacked);
        assert_eq!(StoreBackend::parse("kv").unwrap(), StoreBackend::ExternalKv);
    }

    #[test]
    fn test_parse_backend_rejects_unknown_name() {
        let err = StoreBackend::parse("redis").unwrap_err();
        assert!(err.to_string().contains("redis"));
    }
}
