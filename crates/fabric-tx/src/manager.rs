//! In-memory transaction manager
//!
//! Owns the global transaction state: the id allocator, the in-progress and
//! invalid sets, and the change-sets of recently committed transactions used
//! for write-write conflict detection.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::client::TransactionSystemClient;
use crate::error::TransactionSystemError;
use crate::transaction::{ChangeId, Transaction};

/// Point-in-time counters of the manager state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    pub in_progress: usize,
    pub invalid: usize,
    pub committed_change_sets: usize,
    pub last_write_pointer: u64,
}

#[derive(Default)]
struct ManagerState {
    last_write_pointer: u64,
    in_progress: BTreeSet<u64>,
    /// Copied into every new snapshot; only shrinks through `truncate_invalid`
    invalid: BTreeSet<u64>,
    /// Change-sets that passed `can_commit`, keyed by write pointer
    committing: HashMap<u64, HashSet<ChangeId>>,
    /// Change-sets of committed transactions, keyed by commit pointer
    committed: BTreeMap<u64, HashSet<ChangeId>>,
}

impl ManagerState {
    fn has_conflict(&self, tx: &Transaction, changes: &HashSet<ChangeId>) -> bool {
        if changes.is_empty() {
            return false;
        }
        self.committed
            .range(tx.write_pointer() + 1..)
            .any(|(_, committed)| !committed.is_disjoint(changes))
    }

    fn ensure_in_progress(&self, tx: &Transaction) -> Result<(), TransactionSystemError> {
        if self.in_progress.contains(&tx.write_pointer()) {
            Ok(())
        } else {
            Err(TransactionSystemError::NotInProgress(tx.id()))
        }
    }

    /// Drop change-sets no running transaction can conflict with any more
    fn prune_committed(&mut self) {
        match self.in_progress.first() {
            Some(&oldest) => self.committed = self.committed.split_off(&oldest),
            None => self.committed.clear(),
        }
    }
}

/// Transaction manager keeping all state in process memory.
///
/// Starting a transaction and recording a commit each take the state lock
/// briefly; participants do all their reads and writes outside it.
#[derive(Default)]
pub struct InMemoryTransactionManager {
    state: Mutex<ManagerState>,
}

impl InMemoryTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TransactionStats {
        let state = self.state.lock();
        TransactionStats {
            in_progress: state.in_progress.len(),
            invalid: state.invalid.len(),
            committed_change_sets: state.committed.len(),
            last_write_pointer: state.last_write_pointer,
        }
    }

    pub fn is_in_progress(&self, tx_id: u64) -> bool {
        self.state.lock().in_progress.contains(&tx_id)
    }

    pub fn is_invalid(&self, tx_id: u64) -> bool {
        self.state.lock().invalid.contains(&tx_id)
    }

    /// Invalidated transaction ids, ascending
    pub fn invalid_ids(&self) -> Vec<u64> {
        self.state.lock().invalid.iter().copied().collect()
    }

    /// Forget invalidated transactions whose leftover writes are gone from
    /// storage.
    ///
    /// Every snapshot carries the whole invalid set, so it has to be truncated
    /// once the cleanup is done. Ids that are not invalid are ignored. Returns
    /// the number of ids removed.
    pub fn truncate_invalid(&self, ids: &[u64]) -> usize {
        let mut state = self.state.lock();
        let removed = ids.iter().filter(|id| state.invalid.remove(id)).count();
        if removed > 0 {
            debug!(removed = removed, remaining = state.invalid.len(), "Invalid transactions truncated");
        }
        removed
    }
}

impl TransactionSystemClient for InMemoryTransactionManager {
    fn start_short(&self) -> Transaction {
        let mut state = self.state.lock();
        state.last_write_pointer += 1;
        let write_pointer = state.last_write_pointer;

        let excluded: Vec<u64> = state
            .in_progress
            .iter()
            .chain(state.invalid.iter())
            .copied()
            .collect();
        state.in_progress.insert(write_pointer);

        Transaction::new(write_pointer, write_pointer - 1, excluded)
    }

    fn can_commit(
        &self,
        tx: &Transaction,
        changes: &HashSet<ChangeId>,
    ) -> Result<(), TransactionSystemError> {
        let mut state = self.state.lock();
        state.ensure_in_progress(tx)?;
        if state.has_conflict(tx, changes) {
            debug!(tx = tx.id(), "Conflict detected before persisting");
            return Err(TransactionSystemError::Conflict(tx.id()));
        }
        state.committing.insert(tx.write_pointer(), changes.clone());
        Ok(())
    }

    fn commit(&self, tx: &Transaction) -> Result<(), TransactionSystemError> {
        let mut state = self.state.lock();
        state.ensure_in_progress(tx)?;

        let changes = state
            .committing
            .remove(&tx.write_pointer())
            .unwrap_or_default();
        if state.has_conflict(tx, &changes) {
            debug!(tx = tx.id(), "Conflict detected at commit");
            return Err(TransactionSystemError::Conflict(tx.id()));
        }

        if !changes.is_empty() {
            // Fresh pointer so later-starting transactions never conflict with it
            state.last_write_pointer += 1;
            let commit_pointer = state.last_write_pointer;
            state.committed.insert(commit_pointer, changes);
        }
        state.in_progress.remove(&tx.write_pointer());
        state.prune_committed();
        Ok(())
    }

    fn abort(&self, tx: &Transaction) {
        let mut state = self.state.lock();
        state.committing.remove(&tx.write_pointer());
        if state.in_progress.remove(&tx.write_pointer()) {
            state.prune_committed();
        }
    }

    fn invalidate(&self, tx: &Transaction) {
        let mut state = self.state.lock();
        state.committing.remove(&tx.write_pointer());
        state.in_progress.remove(&tx.write_pointer());
        state.invalid.insert(tx.write_pointer());
        state.prune_committed();
        warn!(tx = tx.id(), "Transaction invalidated");
    }
}
