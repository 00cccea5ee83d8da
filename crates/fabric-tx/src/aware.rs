//! Capability implemented by transaction participants

use crate::transaction::{ChangeId, Transaction};

/// A participant that can take part in an atomic, conflict-checked commit.
///
/// The executor drives every participant through the same sequence:
/// `start_tx` → (unit of work) → `tx_changes` → `commit_tx` → `post_tx_commit`,
/// or `rollback_tx` at any point after `start_tx`. A participant is bound to
/// one transaction at a time.
pub trait TransactionAware: Send + Sync {
    /// Bind to `tx` and begin tracking a fresh change-set
    fn start_tx(&self, tx: &Transaction);

    /// Keys written under the current transaction.
    ///
    /// Keys must be unique across participants, so each participant qualifies
    /// them with its own name.
    fn tx_changes(&self) -> Vec<ChangeId>;

    /// Persist buffered writes tagged with the transaction's write pointer.
    ///
    /// They stay invisible to others until the transaction manager records the
    /// commit.
    fn commit_tx(&self) -> anyhow::Result<()>;

    /// Called once the commit is recorded; releases per-transaction state
    fn post_tx_commit(&self) {}

    /// Discard buffered writes and remove anything already persisted
    fn rollback_tx(&self) -> anyhow::Result<()>;

    /// Name used in logs and error messages
    fn tx_aware_name(&self) -> String;
}
