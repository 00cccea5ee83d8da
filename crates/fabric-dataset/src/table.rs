//! Transactional row/column table handle
//!
//! A [`Table`] buffers writes for the transaction it is bound to and serves
//! reads from the transaction's snapshot merged with those buffered writes.
//! Conflicts are detected per row.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use fabric_tx::{ChangeId, Transaction, TransactionAware};

use crate::error::{DatasetError, Result};
use crate::storage::{Cells, RowMutation, TableStorage};

/// Write of one or more columns of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put {
    row: Vec<u8>,
    columns: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Put {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn add(mut self, column: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }
}

/// Read of a row, optionally restricted to some columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Get {
    row: Vec<u8>,
    columns: Vec<Vec<u8>>,
}

impl Get {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            columns: Vec::new(),
        }
    }

    pub fn add(mut self, column: impl Into<Vec<u8>>) -> Self {
        self.columns.push(column.into());
        self
    }
}

/// Deletion of a whole row, or of some of its columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    row: Vec<u8>,
    columns: Vec<Vec<u8>>,
}

impl Delete {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            columns: Vec::new(),
        }
    }

    pub fn add(mut self, column: impl Into<Vec<u8>>) -> Self {
        self.columns.push(column.into());
        self
    }
}

/// Result of a [`Get`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    row: Vec<u8>,
    cells: Cells,
}

impl Row {
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn get(&self, column: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.cells.get(column.as_ref()).map(Vec::as_slice)
    }

    pub fn get_string(&self, column: impl AsRef<[u8]>) -> Option<String> {
        self.get(column)
            .map(|value| String::from_utf8_lossy(value).into_owned())
    }

    pub fn columns(&self) -> &Cells {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

struct TxState {
    tx: Transaction,
    mutations: BTreeMap<Vec<u8>, RowMutation>,
}

/// Handle to a `table` dataset instance
pub struct Table {
    storage: Arc<TableStorage>,
    state: Mutex<Option<TxState>>,
}

impl Table {
    pub fn new(storage: Arc<TableStorage>) -> Self {
        Self {
            storage,
            state: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.storage.name()
    }

    pub fn put(&self, put: Put) -> Result<()> {
        self.with_tx(|state| {
            let mutation = state.mutations.entry(put.row).or_default();
            for (column, value) in put.columns {
                mutation.columns.insert(column, Some(value));
            }
        })
    }

    pub fn get(&self, get: Get) -> Result<Row> {
        self.storage.ensure_live()?;
        let state = self.state.lock();
        let state = state
            .as_ref()
            .ok_or_else(|| DatasetError::NoTransaction(self.name().to_string()))?;

        let mut cells = self.storage.read_row(&state.tx, &get.row, &get.columns);
        if let Some(mutation) = state.mutations.get(&get.row) {
            if mutation.delete_row {
                cells.clear();
            }
            for (column, value) in &mutation.columns {
                if !get.columns.is_empty() && !get.columns.contains(column) {
                    continue;
                }
                match value {
                    Some(value) => cells.insert(column.clone(), value.clone()),
                    None => cells.remove(column),
                };
            }
        }

        Ok(Row {
            row: get.row,
            cells,
        })
    }

    pub fn delete(&self, delete: Delete) -> Result<()> {
        self.with_tx(|state| {
            let mutation = state.mutations.entry(delete.row).or_default();
            if delete.columns.is_empty() {
                mutation.delete_row = true;
                mutation.columns.clear();
            } else {
                for column in delete.columns {
                    mutation.columns.insert(column, None);
                }
            }
        })
    }

    fn with_tx(&self, f: impl FnOnce(&mut TxState)) -> Result<()> {
        self.storage.ensure_live()?;
        let mut state = self.state.lock();
        let state = state
            .as_mut()
            .ok_or_else(|| DatasetError::NoTransaction(self.name().to_string()))?;
        f(state);
        Ok(())
    }

    fn change_id(&self, row: &[u8]) -> ChangeId {
        let name = self.name().as_bytes();
        let mut key = Vec::with_capacity(name.len() + 1 + row.len());
        key.extend_from_slice(name);
        key.push(0);
        key.extend_from_slice(row);
        key
    }
}

impl TransactionAware for Table {
    fn start_tx(&self, tx: &Transaction) {
        *self.state.lock() = Some(TxState {
            tx: tx.clone(),
            mutations: BTreeMap::new(),
        });
    }

    fn tx_changes(&self) -> Vec<ChangeId> {
        self.state
            .lock()
            .as_ref()
            .map(|state| state.mutations.keys().map(|row| self.change_id(row)).collect())
            .unwrap_or_default()
    }

    fn commit_tx(&self) -> anyhow::Result<()> {
        self.storage.ensure_live()?;
        let state = self.state.lock();
        if let Some(state) = state.as_ref()
            && !state.mutations.is_empty()
        {
            self.storage.apply(state.tx.write_pointer(), &state.mutations);
        }
        Ok(())
    }

    fn post_tx_commit(&self) {
        self.state.lock().take();
    }

    fn rollback_tx(&self) -> anyhow::Result<()> {
        if let Some(state) = self.state.lock().take() {
            self.storage
                .revert(state.tx.write_pointer(), state.mutations.keys());
        }
        Ok(())
    }

    fn tx_aware_name(&self) -> String {
        self.name().to_string()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("name", &self.name()).finish()
    }
}
