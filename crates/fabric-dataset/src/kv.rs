//! Key/value view over a single-column table

use std::sync::Arc;

use fabric_tx::{ChangeId, Transaction, TransactionAware};

use crate::error::Result;
use crate::storage::TableStorage;
use crate::table::{Delete, Get, Put, Table};

/// Column every value is stored under
pub const KEY_COLUMN: &[u8] = b"c";

/// Handle to a `keyValueTable` dataset instance
#[derive(Debug)]
pub struct KeyValueTable {
    table: Table,
}

impl KeyValueTable {
    pub fn new(storage: Arc<TableStorage>) -> Self {
        Self {
            table: Table::new(storage),
        }
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn write(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<()> {
        self.table.put(Put::new(key).add(KEY_COLUMN, value))
    }

    pub fn read(&self, key: impl Into<Vec<u8>>) -> Result<Option<Vec<u8>>> {
        let row = self.table.get(Get::new(key).add(KEY_COLUMN))?;
        Ok(row.get(KEY_COLUMN).map(<[u8]>::to_vec))
    }

    pub fn read_string(&self, key: impl Into<Vec<u8>>) -> Result<Option<String>> {
        let row = self.table.get(Get::new(key).add(KEY_COLUMN))?;
        Ok(row.get_string(KEY_COLUMN))
    }

    pub fn delete(&self, key: impl Into<Vec<u8>>) -> Result<()> {
        self.table.delete(Delete::new(key))
    }
}

impl TransactionAware for KeyValueTable {
    fn start_tx(&self, tx: &Transaction) {
        self.table.start_tx(tx)
    }

    fn tx_changes(&self) -> Vec<ChangeId> {
        self.table.tx_changes()
    }

    fn commit_tx(&self) -> anyhow::Result<()> {
        self.table.commit_tx()
    }

    fn post_tx_commit(&self) {
        self.table.post_tx_commit()
    }

    fn rollback_tx(&self) -> anyhow::Result<()> {
        self.table.rollback_tx()
    }

    fn tx_aware_name(&self) -> String {
        self.table.tx_aware_name()
    }
}
