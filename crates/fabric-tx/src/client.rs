//! Seam between the executor and whatever keeps global transaction state

use std::collections::HashSet;

use crate::error::TransactionSystemError;
use crate::transaction::{ChangeId, Transaction};

/// Operations the executor needs from the transaction system.
///
/// [`InMemoryTransactionManager`](crate::InMemoryTransactionManager) is the
/// in-process implementation.
pub trait TransactionSystemClient: Send + Sync {
    /// Begin a transaction and take its snapshot
    fn start_short(&self) -> Transaction;

    /// Check `changes` against every transaction committed since `tx` started
    /// and, if there is no overlap, remember them for the final commit check.
    fn can_commit(
        &self,
        tx: &Transaction,
        changes: &HashSet<ChangeId>,
    ) -> Result<(), TransactionSystemError>;

    /// Serialized conflict re-check and commit
    fn commit(&self, tx: &Transaction) -> Result<(), TransactionSystemError>;

    /// Forget a transaction whose writes have been rolled back
    fn abort(&self, tx: &Transaction);

    /// Permanently hide the writes of a transaction that could not be rolled back
    fn invalidate(&self, tx: &Transaction);
}
