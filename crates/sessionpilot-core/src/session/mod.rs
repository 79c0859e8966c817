//! Cookie Session Store.
//!
//! Upsert/lookup of [`SessionRecord`]s keyed by (platform, account). The
//! store itself only validates input and maps failures onto
//! [`AutomationError`]; persistence is delegated to a [`SessionBackend`].

mod local;
mod remote;

pub use local::LocalSessionBackend;
pub use remote::RemoteSessionBackend;

use crate::config::{StoreBackendKind, StoreSection};
use crate::error::{AutomationError, AutomationResult};
use crate::models::{SessionRecord, normalize_account, normalize_platform};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persistence seam for session records.
///
/// `put` must fully replace any previous record for the same key; `get` must
/// return the most recently written record or `None`.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn put(&self, record: &SessionRecord) -> Result<SessionRecord>;

    async fn get(&self, platform: &str, account: &str) -> Result<Option<SessionRecord>>;
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Option<Arc<dyn SessionBackend>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A store with no backend; every operation fails with a configuration error.
    pub fn unconfigured() -> Self {
        Self { backend: None }
    }

    /// Build the store described by the `[store]` config section.
    ///
    /// A remote backend without URL or key yields an unconfigured store rather
    /// than an error so that store-free modes keep working.
    pub fn from_config(config: &StoreSection) -> Result<Self> {
        match config.backend {
            StoreBackendKind::Disabled => {
                info!("Session store disabled by configuration");
                Ok(Self::unconfigured())
            }
            StoreBackendKind::Local => {
                let path = match &config.db_path {
                    Some(path) => path.clone(),
                    None => sessionpilot_storage::paths::default_database_path()?,
                };
                let backend = LocalSessionBackend::open(&path)?;
                info!(path = %path.display(), "Using local session store");
                Ok(Self::new(Arc::new(backend)))
            }
            StoreBackendKind::Remote => {
                let (Some(url), Some(key)) = (config.url.as_deref(), config.key.as_deref()) else {
                    warn!("Remote session store selected but URL or key is missing");
                    return Ok(Self::unconfigured());
                };
                let backend = RemoteSessionBackend::new(url, key, &config.table)?;
                info!(url = %url, table = %config.table, "Using remote session store");
                Ok(Self::new(Arc::new(backend)))
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Insert or fully replace the record for (platform, account).
    pub async fn upsert(
        &self,
        platform: &str,
        account: &str,
        cookies: Value,
        user_agent: Option<String>,
    ) -> AutomationResult<SessionRecord> {
        let backend = self.backend()?;
        let record = SessionRecord::new(platform, account, cookies, user_agent)?;

        let stored = backend
            .put(&record)
            .await
            .map_err(AutomationError::store)?;
        info!(
            backend = backend.name(),
            platform = %stored.platform,
            account = %stored.account,
            cookies = stored.cookies.len(),
            "Session saved"
        );
        Ok(stored)
    }

    /// Return the newest record for (platform, account), `None` on a miss.
    pub async fn load(
        &self,
        platform: &str,
        account: &str,
    ) -> AutomationResult<Option<SessionRecord>> {
        let backend = self.backend()?;
        let platform = normalize_platform(platform)?;
        let account = normalize_account(account)?;

        let record = backend
            .get(&platform, &account)
            .await
            .map_err(AutomationError::store)?;
        debug!(
            backend = backend.name(),
            platform = %platform,
            account = %account,
            found = record.is_some(),
            "Session lookup"
        );
        Ok(record)
    }

    fn backend(&self) -> AutomationResult<&Arc<dyn SessionBackend>> {
        self.backend.as_ref().ok_or_else(|| {
            AutomationError::Configuration("session store is not configured".to_string())
        })
    }
}
