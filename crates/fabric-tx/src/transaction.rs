//! Transaction handle and snapshot visibility

use std::fmt;
use std::sync::Arc;

/// Key a participant reports as written; conflict detection compares these
pub type ChangeId = Vec<u8>;

/// Immutable handle of one transaction.
///
/// `write_pointer` is the transaction id and the version every write of this
/// transaction is tagged with. `read_pointer` is the snapshot boundary: a
/// version is visible if it is at or below the boundary and does not belong to
/// a transaction that was in progress (or invalidated) when this one started.
#[derive(Clone, PartialEq, Eq)]
pub struct Transaction {
    write_pointer: u64,
    read_pointer: u64,
    /// Sorted ids that are below the read pointer but not committed
    excluded: Arc<[u64]>,
}

impl Transaction {
    pub fn new(write_pointer: u64, read_pointer: u64, mut excluded: Vec<u64>) -> Self {
        excluded.sort_unstable();
        excluded.dedup();
        Self {
            write_pointer,
            read_pointer,
            excluded: excluded.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.write_pointer
    }

    pub fn write_pointer(&self) -> u64 {
        self.write_pointer
    }

    pub fn read_pointer(&self) -> u64 {
        self.read_pointer
    }

    pub fn excluded(&self) -> &[u64] {
        &self.excluded
    }

    /// Whether data written at `version` is visible to this transaction
    pub fn is_visible(&self, version: u64) -> bool {
        version == self.write_pointer
            || (version <= self.read_pointer && self.excluded.binary_search(&version).is_err())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("write_pointer", &self.write_pointer)
            .field("read_pointer", &self.read_pointer)
            .field("excluded", &self.excluded.len())
            .finish()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.write_pointer)
    }
}
