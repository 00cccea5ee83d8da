//! Runs a unit of work inside one transaction spanning several participants
//!
//! Either every participant's writes become visible together or none do. A
//! write-write conflict with a transaction that committed first rolls back
//! everything and reports [`TransactionFailure::Conflict`].

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use crate::aware::TransactionAware;
use crate::client::TransactionSystemClient;
use crate::error::{TransactionFailure, TransactionSystemError};
use crate::transaction::{ChangeId, Transaction};

/// Executes units of work transactionally over a fixed set of participants
#[derive(Clone)]
pub struct TransactionExecutor {
    tx_client: Arc<dyn TransactionSystemClient>,
    participants: Vec<Arc<dyn TransactionAware>>,
}

impl TransactionExecutor {
    pub fn new(
        tx_client: Arc<dyn TransactionSystemClient>,
        participants: Vec<Arc<dyn TransactionAware>>,
    ) -> Self {
        Self {
            tx_client,
            participants,
        }
    }

    pub fn participants(&self) -> &[Arc<dyn TransactionAware>] {
        &self.participants
    }

    /// Run `unit_of_work` in a fresh transaction.
    ///
    /// On success every participant's writes are committed atomically. On any
    /// failure all participants are rolled back and the transaction is aborted
    /// (or invalidated if a rollback failed). An error returned by the unit of
    /// work comes back unchanged inside [`TransactionFailure::Aborted`]; a
    /// panic is propagated after rolling back.
    pub fn execute<T, F>(&self, unit_of_work: F) -> Result<T, TransactionFailure>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        let tx = self.tx_client.start_short();
        debug!(tx = tx.id(), participants = self.participants.len(), "Transaction started");

        for participant in &self.participants {
            participant.start_tx(&tx);
        }

        let value = match panic::catch_unwind(AssertUnwindSafe(unit_of_work)) {
            Ok(Ok(value)) => value,
            Ok(Err(source)) => {
                let rollback_error = self.rollback_and_abort(&tx);
                counter!("transactions_aborted_total", "reason" => "unit_of_work").increment(1);
                return Err(TransactionFailure::Aborted {
                    tx: tx.id(),
                    source,
                    rollback_error,
                });
            }
            Err(payload) => {
                self.rollback_and_abort(&tx);
                counter!("transactions_aborted_total", "reason" => "panic").increment(1);
                panic::resume_unwind(payload);
            }
        };

        self.commit(&tx)?;
        Ok(value)
    }

    fn commit(&self, tx: &Transaction) -> Result<(), TransactionFailure> {
        let changes: HashSet<ChangeId> = self
            .participants
            .iter()
            .flat_map(|participant| participant.tx_changes())
            .collect();

        if let Err(e) = self.tx_client.can_commit(tx, &changes) {
            return Err(self.fail_with(tx, e));
        }

        for participant in &self.participants {
            if let Err(source) = participant.commit_tx() {
                let resource = participant.tx_aware_name();
                warn!(tx = tx.id(), resource = %resource, error = %source, "Failed to persist changes");
                let rollback_error = self.rollback_and_abort(tx);
                counter!("transactions_aborted_total", "reason" => "persist").increment(1);
                return Err(TransactionFailure::Persist {
                    tx: tx.id(),
                    resource,
                    source,
                    rollback_error,
                });
            }
        }

        if let Err(e) = self.tx_client.commit(tx) {
            return Err(self.fail_with(tx, e));
        }

        for participant in &self.participants {
            participant.post_tx_commit();
        }

        counter!("transactions_committed_total").increment(1);
        debug!(tx = tx.id(), changes = changes.len(), "Transaction committed");
        Ok(())
    }

    fn fail_with(&self, tx: &Transaction, error: TransactionSystemError) -> TransactionFailure {
        let rollback_error = self.rollback_and_abort(tx);
        match error {
            TransactionSystemError::Conflict(_) => {
                counter!("transactions_conflicts_total").increment(1);
                debug!(tx = tx.id(), "Transaction rolled back after conflict");
                TransactionFailure::Conflict {
                    tx: tx.id(),
                    rollback_error,
                }
            }
            source => {
                counter!("transactions_aborted_total", "reason" => "rejected").increment(1);
                TransactionFailure::Rejected {
                    tx: tx.id(),
                    source,
                    rollback_error,
                }
            }
        }
    }

    /// Roll back every participant, then abort; invalidate instead if any
    /// rollback failed. Returns the first rollback error.
    fn rollback_and_abort(&self, tx: &Transaction) -> Option<anyhow::Error> {
        let mut first_error = None;
        for participant in &self.participants {
            if let Err(e) = participant.rollback_tx() {
                warn!(
                    tx = tx.id(),
                    resource = %participant.tx_aware_name(),
                    error = %e,
                    "Failed to roll back participant"
                );
                first_error.get_or_insert(e);
            }
        }

        if first_error.is_some() {
            self.tx_client.invalidate(tx);
        } else {
            self.tx_client.abort(tx);
        }
        first_error
    }
}
