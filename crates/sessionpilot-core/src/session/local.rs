//! Local session backend on top of the redb session table.

use super::SessionBackend;
use crate::models::{SessionRecord, session_key};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redb::Database;
use sessionpilot_storage::{SessionRecordStorage, Storage};
use std::path::Path;
use std::sync::Arc;

/// Typed session storage wrapper around sessionpilot-storage::SessionRecordStorage.
#[derive(Debug, Clone)]
pub struct LocalSessionBackend {
    inner: SessionRecordStorage,
}

impl LocalSessionBackend {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            inner: SessionRecordStorage::new(db)?,
        })
    }

    /// Open the database file at `path`, creating it when missing.
    pub fn open(path: &Path) -> Result<Self> {
        let storage = Storage::new(path)?;
        Ok(Self {
            inner: storage.sessions,
        })
    }
}

#[async_trait]
impl SessionBackend for LocalSessionBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, record: &SessionRecord) -> Result<SessionRecord> {
        let bytes = serde_json::to_vec(record)?;
        self.inner
            .put_raw(&record.key(), &bytes)
            .context("Failed to write session record")?;
        Ok(record.clone())
    }

    async fn get(&self, platform: &str, account: &str) -> Result<Option<SessionRecord>> {
        let key = session_key(platform, account);
        let Some(bytes) = self
            .inner
            .get_raw(&key)
            .context("Failed to read session record")?
        else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt session record {}", key))?;
        Ok(Some(record))
    }
}
