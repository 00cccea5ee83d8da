//! Fabric Tx - Optimistic transactions across pluggable participants
//!
//! This crate provides:
//! - `Transaction`: an immutable handle whose id doubles as a snapshot boundary
//! - `TransactionAware`: the capability every participant implements
//! - `InMemoryTransactionManager`: global transaction state and the single
//!   serialized conflict-check-and-commit point
//! - `TransactionExecutor`: runs one unit of work across a set of participants
//!   with all-or-nothing commit

pub mod aware;
pub mod client;
pub mod error;
pub mod executor;
pub mod manager;
pub mod transaction;

pub use aware::TransactionAware;
pub use client::TransactionSystemClient;
pub use error::{TransactionFailure, TransactionSystemError};
pub use executor::TransactionExecutor;
pub use manager::{InMemoryTransactionManager, TransactionStats};
pub use transaction::{ChangeId, Transaction};
