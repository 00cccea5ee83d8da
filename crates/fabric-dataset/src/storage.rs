//! Multi-version in-memory cell storage
//!
//! Every cell keeps all versions written to it, keyed by the write pointer of
//! the transaction that wrote it. Reads resolve the newest version visible to
//! the reading transaction, so uncommitted writes (persisted under a write
//! pointer that is still in progress) are never seen by others.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use fabric_tx::Transaction;

use crate::error::{DatasetError, Result};

/// Column name to value
pub type Cells = BTreeMap<Vec<u8>, Vec<u8>>;

/// `None` marks a deletion
type Versions = BTreeMap<u64, Option<Vec<u8>>>;

/// One pending change to a row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMutation {
    /// Delete every column that exists when the change is persisted
    pub delete_row: bool,
    /// Column writes applied after `delete_row`; `None` deletes the column
    pub columns: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

pub struct TableStorage {
    name: String,
    rows: RwLock<BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, Versions>>>,
    dropped: AtomicBool,
}

impl TableStorage {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: RwLock::new(BTreeMap::new()),
            dropped: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ensure_live(&self) -> Result<()> {
        if self.is_dropped() {
            Err(DatasetError::Dropped(self.name.clone()))
        } else {
            Ok(())
        }
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dropped(&self) {
        self.dropped.store(true, Ordering::Release);
        self.rows.write().clear();
    }

    /// Columns of `row` visible to `tx`; `columns` restricts the result when
    /// not empty
    pub fn read_row(&self, tx: &Transaction, row: &[u8], columns: &[Vec<u8>]) -> Cells {
        let rows = self.rows.read();
        let Some(stored) = rows.get(row) else {
            return Cells::new();
        };

        let visible = |versions: &Versions| {
            versions
                .iter()
                .rev()
                .find(|(version, _)| tx.is_visible(**version))
                .and_then(|(_, value)| value.clone())
        };

        if columns.is_empty() {
            stored
                .iter()
                .filter_map(|(column, versions)| Some((column.clone(), visible(versions)?)))
                .collect()
        } else {
            columns
                .iter()
                .filter_map(|column| Some((column.clone(), visible(stored.get(column)?)?)))
                .collect()
        }
    }

    /// Persist mutations under `version`
    pub fn apply(&self, version: u64, mutations: &BTreeMap<Vec<u8>, RowMutation>) {
        let mut rows = self.rows.write();
        for (row, mutation) in mutations {
            let stored = rows.entry(row.clone()).or_default();
            if mutation.delete_row {
                for versions in stored.values_mut() {
                    versions.insert(version, None);
                }
            }
            for (column, value) in &mutation.columns {
                stored
                    .entry(column.clone())
                    .or_default()
                    .insert(version, value.clone());
            }
        }
    }

    /// Remove everything persisted under `version` in the given rows
    pub fn revert<'a>(&self, version: u64, rows_touched: impl IntoIterator<Item = &'a Vec<u8>>) {
        let mut rows = self.rows.write();
        for row in rows_touched {
            let Some(stored) = rows.get_mut(row) else {
                continue;
            };
            stored.retain(|_, versions| {
                versions.remove(&version);
                !versions.is_empty()
            });
            if stored.is_empty() {
                rows.remove(row);
            }
        }
    }

    /// Delete all data, every version included
    pub fn truncate(&self) {
        self.rows.write().clear();
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }
}

impl std::fmt::Debug for TableStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStorage")
            .field("name", &self.name)
            .field("dropped", &self.is_dropped())
            .finish()
    }
}
