//! Fabric Dataset - Transactional datasets and their administration
//!
//! This crate provides:
//! - Multi-version in-memory storage with snapshot reads
//! - `table` and `keyValueTable` handles that take part in transactions
//! - The dataset type registry and the instance framework
//! - Administrative operations (exists/create/truncate/upgrade/drop) behind
//!   the `DatasetOpExecutor` trait

pub mod definition;
pub mod error;
pub mod executor;
pub mod framework;
pub mod kv;
pub mod model;
pub mod storage;
pub mod table;

pub use definition::{
    Dataset, DatasetDefinition, DatasetDefinitionRegistry, KEY_VALUE_TABLE_TYPE, TABLE_TYPE,
};
pub use error::{DatasetError, Result};
pub use executor::{AdminOp, DatasetOpExecutor, LocalDatasetOpExecutor, execute_admin_op};
pub use framework::InMemoryDatasetFramework;
pub use kv::KeyValueTable;
pub use model::{AdminOpResponse, CreateInstanceRequest, DatasetProperties, DatasetSpecification};
pub use storage::TableStorage;
pub use table::{Delete, Get, Put, Row, Table};
