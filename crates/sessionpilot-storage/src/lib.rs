//! SessionPilot Storage - byte-level persistence for session records.
//!
//! Uses redb as the embedded database. Records are stored as opaque bytes so
//! that this crate stays free of the core data model; the typed wrapper lives
//! in `sessionpilot-core`.
//!
//! # Tables
//!
//! - `session_records` - cookie sessions keyed by `platform:account`

pub mod paths;
pub mod session_record;
pub mod simple_storage;
pub mod time_utils;

use anyhow::{Context, Result};
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use session_record::SessionRecordStorage;
pub use simple_storage::SimpleStorage;

/// Central storage manager that opens the database and its tables.
pub struct Storage {
    pub sessions: SessionRecordStorage,
}

impl Storage {
    /// Open (or create) the database at `path` and initialize all tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let db = Arc::new(
            Database::create(path)
                .with_context(|| format!("Failed to open database {}", path.display()))?,
        );
        let sessions = SessionRecordStorage::new(db)?;

        tracing::debug!(path = %path.display(), "Session database ready");
        Ok(Self { sessions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_creates_missing_parent_dirs() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("dir").join("sessions.redb");

        let storage = Storage::new(&db_path).unwrap();
        assert!(db_path.exists());
        assert!(storage.sessions.get_raw("tiktok:alice").unwrap().is_none());
    }
}
