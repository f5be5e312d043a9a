use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::warn;

use crate::clients::kv::KvClient;
use crate::config::Config;
use crate::config::StoreBackend;
use crate::error::StoreError;
use crate::job::Job;
use crate::job::JobId;

/// The full persisted view: every job record, keyed by id.
pub type JobMap = HashMap<JobId, Job>;

/// Key under which the external key-value backend stores the serialized map.
const KV_JOBS_KEY: &str = "prbot-jobs";

// -----------------------------------------------------------------------------
// JobStore trait

/// Persistence for job records. The store's unit of work is the whole
/// mapping: `load` returns a snapshot, `save` replaces it. Serializing
/// concurrent read-modify-write sequences is the caller's responsibility
/// (see `JobManager`).
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn load(&self) -> Result<JobMap, StoreError>;
    async fn save(&self, jobs: &JobMap) -> Result<(), StoreError>;
}

// -----------------------------------------------------------------------------
// MemoryStore

/// In-process store; contents are lost on restart.
pub struct MemoryStore {
    jobs: Mutex<JobMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(JobMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn load(&self) -> Result<JobMap, StoreError> {
        Ok(self.jobs.lock().expect("job map lock poisoned").clone())
    }

    async fn save(&self, jobs: &JobMap) -> Result<(), StoreError> {
        *self.jobs.lock().expect("job map lock poisoned") = jobs.clone();
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// FileStore

/// Stores the mapping as JSON in one file. Writes go to a sibling temp path
/// first and are renamed into place, so a crash mid-write never truncates
/// the live file. A missing file reads as an empty mapping.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl JobStore for FileStore {
    async fn load(&self) -> Result<JobMap, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(JobMap::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, jobs: &JobMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(jobs)?;
        let tmp_path = PathBuf::from(format!("{}.tmp", self.path.display()));
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// KvStore

/// Stores the whole mapping serialized under one fixed key in an external
/// key-value service.
pub struct KvStore {
    client: KvClient,
}

impl KvStore {
    /// Probe the service before accepting it as a backend. An unreachable
    /// service is an error here so the factory can fall back.
    pub async fn connect(base_url: &str) -> Result<Self, StoreError> {
        let client = KvClient::new(base_url.to_string());
        client
            .ping(KV_JOBS_KEY)
            .await
            .map_err(|err| StoreError::Kv(format!("{:#}", err)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JobStore for KvStore {
    async fn load(&self) -> Result<JobMap, StoreError> {
        let value = self
            .client
            .get(KV_JOBS_KEY)
            .await
            .map_err(|err| StoreError::Kv(format!("{:#}", err)))?;
        match value {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(JobMap::new()),
        }
    }

    async fn save(&self, jobs: &JobMap) -> Result<(), StoreError> {
        let raw = serde_json::to_string(jobs)?;
        self.client
            .put(KV_JOBS_KEY, &raw)
            .await
            .map_err(|err| StoreError::Kv(format!("{:#}", err)))
    }
}

// -----------------------------------------------------------------------------
// Factory

/// Build the store selected by configuration.
///
/// The kv backend degrades to the file backend when the service cannot be
/// reached at startup; callers see the same `JobStore` either way, with only
/// a logged warning. A kv selection without a URL is a configuration error.
pub async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn JobStore>> {
    match config.store {
        StoreBackend::Volatile => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::FileBacked => Ok(Arc::new(FileStore::new(config.store_path.clone()))),
        StoreBackend::ExternalKv => {
            let url = config
                .kv_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("kv store backend selected but PRBOT_KV_URL is not set"))?;
            match KvStore::connect(url).await {
                Ok(store) => Ok(Arc::new(store)),
                Err(err) => {
                    warn!(
                        "key-value service at {} unavailable ({}), falling back to file store at {}",
                        url,
                        err,
                        config.store_path.display()
                    );
                    Ok(Arc::new(FileStore::new(config.store_path.clone())))
                }
            }
        }
    }
}
