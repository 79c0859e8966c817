use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

/// Byte-level access to a single `&str -> &[u8]` redb table.
///
/// Implementors provide the table definition and the database handle; the
/// read and write paths come for free. Writes are upserts: `put_raw` replaces
/// whatever was stored under the key.
pub trait SimpleStorage: Send + Sync {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]>;

    fn db(&self) -> &Arc<Database>;

    /// Create the table if it does not exist yet.
    fn init_table(db: &Database) -> Result<()> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(Self::TABLE)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Insert or replace the bytes stored under `key`.
    fn put_raw(&self, key: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db().begin_write()?;
        {
            let mut table = write_txn.open_table(Self::TABLE)?;
            table.insert(key, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;

        Ok(table.get(key)?.map(|value| value.value().to_vec()))
    }
}
