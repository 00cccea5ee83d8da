//! Transaction error types

/// Errors raised by the transaction system itself
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TransactionSystemError {
    #[error("transaction {0} conflicts with a transaction committed after it started")]
    Conflict(u64),

    #[error("transaction {0} is not in progress")]
    NotInProgress(u64),
}

/// Why [`TransactionExecutor::execute`](crate::TransactionExecutor::execute) failed.
///
/// Every variant carries the id of the aborted transaction and, if rolling
/// back one of the participants failed too, the first rollback error.
#[derive(Debug, thiserror::Error)]
pub enum TransactionFailure {
    /// The unit of work failed; `source` is its error, untouched
    #[error("transaction {tx} aborted: {source}")]
    Aborted {
        tx: u64,
        #[source]
        source: anyhow::Error,
        rollback_error: Option<anyhow::Error>,
    },

    /// Another transaction committed an overlapping write first.
    ///
    /// Nothing was applied; the whole unit of work may be retried.
    #[error("transaction {tx} conflicts with a concurrently committed transaction")]
    Conflict {
        tx: u64,
        rollback_error: Option<anyhow::Error>,
    },

    /// A participant failed to persist its changes
    #[error("transaction {tx} failed to persist changes of '{resource}': {source}")]
    Persist {
        tx: u64,
        resource: String,
        #[source]
        source: anyhow::Error,
        rollback_error: Option<anyhow::Error>,
    },

    /// The transaction manager refused the transaction for a reason other
    /// than a conflict
    #[error("transaction {tx} rejected: {source}")]
    Rejected {
        tx: u64,
        #[source]
        source: TransactionSystemError,
        rollback_error: Option<anyhow::Error>,
    },
}

impl TransactionFailure {
    pub fn tx(&self) -> u64 {
        match self {
            TransactionFailure::Aborted { tx, .. }
            | TransactionFailure::Conflict { tx, .. }
            | TransactionFailure::Persist { tx, .. }
            | TransactionFailure::Rejected { tx, .. } => *tx,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TransactionFailure::Conflict { .. })
    }

    /// The first rollback failure, if any participant failed to roll back
    pub fn rollback_error(&self) -> Option<&anyhow::Error> {
        match self {
            TransactionFailure::Aborted { rollback_error, .. }
            | TransactionFailure::Conflict { rollback_error, .. }
            | TransactionFailure::Persist { rollback_error, .. }
            | TransactionFailure::Rejected { rollback_error, .. } => rollback_error.as_ref(),
        }
    }

    /// The unit of work's own error, if that is what aborted the transaction
    pub fn into_cause(self) -> Option<anyhow::Error> {
        match self {
            TransactionFailure::Aborted { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransactionSystemError::Conflict(7);
        assert_eq!(
            err.to_string(),
            "transaction 7 conflicts with a transaction committed after it started"
        );

        let failure = TransactionFailure::Conflict {
            tx: 7,
            rollback_error: None,
        };
        assert!(failure.is_conflict());
        assert_eq!(failure.tx(), 7);
        assert!(failure.rollback_error().is_none());
    }

    #[test]
    fn test_into_cause_keeps_original_error() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom")]
        struct Boom;

        let failure = TransactionFailure::Aborted {
            tx: 3,
            source: anyhow::Error::new(Boom),
            rollback_error: None,
        };
        assert_eq!(failure.to_string(), "transaction 3 aborted: boom");
        let cause = failure.into_cause().unwrap();
        assert!(cause.downcast_ref::<Boom>().is_some());
    }
}
