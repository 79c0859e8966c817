//! Session record storage - byte-level API for cookie session persistence.

use crate::SimpleStorage;
use anyhow::Result;
use redb::{Database, TableDefinition};
use std::sync::Arc;

const SESSION_RECORDS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("session_records");

/// Low-level session record storage keyed by `platform:account`.
#[derive(Debug, Clone)]
pub struct SessionRecordStorage {
    db: Arc<Database>,
}

impl SessionRecordStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        <Self as SimpleStorage>::init_table(&db)?;
        Ok(Self { db })
    }

    pub fn put_raw(&self, key: &str, data: &[u8]) -> Result<()> {
        <Self as SimpleStorage>::put_raw(self, key, data)
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        <Self as SimpleStorage>::get_raw(self, key)
    }
}

impl SimpleStorage for SessionRecordStorage {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> = SESSION_RECORDS_TABLE;

    fn db(&self) -> &Arc<Database> {
        &self.db
    }
}
