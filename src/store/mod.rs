//! Record and job persistence.
//!
//! The pipeline only needs upsert-by-URL for records and load/save for jobs,
//! so both are traits. `RecordStore` is the bundled implementation: state in
//! memory, optionally mirrored to a JSON snapshot file.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{JobId, JobRequest, PropertyId, PropertyRecord, ScrapeJob, StoredProperty};

#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Insert, or overwrite the record already stored under the same URL
    async fn upsert(&self, record: PropertyRecord) -> Result<StoredProperty, StoreError>;

    async fn get(&self, id: PropertyId) -> Result<Option<StoredProperty>, StoreError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<StoredProperty>, StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, request: JobRequest) -> Result<ScrapeJob, StoreError>;

    async fn get(&self, id: JobId) -> Result<Option<ScrapeJob>, StoreError>;

    async fn save(&self, job: &ScrapeJob) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    next_job_id: JobId,
    next_property_id: PropertyId,
    jobs: BTreeMap<JobId, ScrapeJob>,
    properties: BTreeMap<PropertyId, StoredProperty>,
}

impl Snapshot {
    fn property_by_url(&self, url: &str) -> Option<&StoredProperty> {
        self.properties.values().find(|stored| stored.record.url == url)
    }
}

/// In-memory store with an optional JSON snapshot on disk.
///
/// Every mutation is applied to a copy, written out, and only then made
/// visible, so a failed write leaves the previous state in place.
pub struct RecordStore {
    state: RwLock<Snapshot>,
    path: Option<PathBuf>,
}

impl RecordStore {
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            path: None,
        }
    }

    /// Load the snapshot at `path`, starting empty if it does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened store at {}", path.display());
        Ok(Self {
            state: RwLock::new(snapshot),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn commit<T>(&self, mutate: impl FnOnce(&mut Snapshot) -> T) -> Result<T, StoreError> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let output = mutate(&mut next);
        if let Some(path) = &self.path {
            write_snapshot(path, &next).await?;
        }
        *state = next;
        Ok(output)
    }
}

async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl PropertyStore for RecordStore {
    async fn upsert(&self, record: PropertyRecord) -> Result<StoredProperty, StoreError> {
        let (stored, created) = self
            .commit(|state| {
                let now = Utc::now();
                let existing = state
                    .property_by_url(&record.url)
                    .map(|stored| (stored.id, stored.created_at));
                let (id, created_at, created) = match existing {
                    Some((id, created_at)) => (id, created_at, false),
                    None => {
                        state.next_property_id += 1;
                        (state.next_property_id, now, true)
                    }
                };
                let stored = StoredProperty {
                    id,
                    record,
                    created_at,
                    updated_at: now,
                };
                state.properties.insert(id, stored.clone());
                (stored, created)
            })
            .await?;

        if created {
            info!("New property created with ID: {}", stored.id);
        } else {
            info!("Existing property updated with ID: {}", stored.id);
        }
        Ok(stored)
    }

    async fn get(&self, id: PropertyId) -> Result<Option<StoredProperty>, StoreError> {
        Ok(self.state.read().await.properties.get(&id).cloned())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<StoredProperty>, StoreError> {
        Ok(self.state.read().await.property_by_url(url).cloned())
    }
}

#[async_trait]
impl JobStore for RecordStore {
    async fn create(&self, request: JobRequest) -> Result<ScrapeJob, StoreError> {
        self.commit(|state| {
            state.next_job_id += 1;
            let job = ScrapeJob::new(state.next_job_id, request);
            state.jobs.insert(job.id, job.clone());
            job
        })
        .await
    }

    async fn get(&self, id: JobId) -> Result<Option<ScrapeJob>, StoreError> {
        Ok(self.state.read().await.jobs.get(&id).cloned())
    }

    async fn save(&self, job: &ScrapeJob) -> Result<(), StoreError> {
        if !self.state.read().await.jobs.contains_key(&job.id) {
            return Err(StoreError::NotFound(format!("job {}", job.id)));
        }
        self.commit(|state| {
            state.jobs.insert(job.id, job.clone());
        })
        .await
    }
}
