//! Dataset types and the registry that resolves type names to them

use std::collections::HashMap;
use std::sync::Arc;

use fabric_tx::TransactionAware;

use crate::error::{DatasetError, Result};
use crate::kv::KeyValueTable;
use crate::model::{DatasetProperties, DatasetSpecification};
use crate::storage::TableStorage;
use crate::table::Table;

pub const TABLE_TYPE: &str = "table";
pub const KEY_VALUE_TABLE_TYPE: &str = "keyValueTable";

/// An opened dataset instance
#[derive(Debug, Clone)]
pub enum Dataset {
    Table(Arc<Table>),
    KeyValueTable(Arc<KeyValueTable>),
}

impl Dataset {
    pub fn as_table(&self) -> Option<Arc<Table>> {
        match self {
            Dataset::Table(table) => Some(table.clone()),
            _ => None,
        }
    }

    pub fn as_key_value_table(&self) -> Option<Arc<KeyValueTable>> {
        match self {
            Dataset::KeyValueTable(kv) => Some(kv.clone()),
            _ => None,
        }
    }

    /// The handle as a transaction participant
    pub fn tx_aware(&self) -> Arc<dyn TransactionAware> {
        match self {
            Dataset::Table(table) => table.clone(),
            Dataset::KeyValueTable(kv) => kv.clone(),
        }
    }
}

/// One dataset type: validates instance properties and opens handles
pub trait DatasetDefinition: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Build the specification recorded for a new instance
    fn configure(&self, name: &str, properties: DatasetProperties) -> Result<DatasetSpecification>;

    /// Open a handle over the instance's storage
    fn open(&self, spec: &DatasetSpecification, storage: Arc<TableStorage>) -> Dataset;
}

pub struct TableDefinition;

impl DatasetDefinition for TableDefinition {
    fn type_name(&self) -> &'static str {
        TABLE_TYPE
    }

    fn configure(&self, name: &str, properties: DatasetProperties) -> Result<DatasetSpecification> {
        Ok(DatasetSpecification::new(name, TABLE_TYPE, properties))
    }

    fn open(&self, _spec: &DatasetSpecification, storage: Arc<TableStorage>) -> Dataset {
        Dataset::Table(Arc::new(Table::new(storage)))
    }
}

pub struct KeyValueTableDefinition;

impl DatasetDefinition for KeyValueTableDefinition {
    fn type_name(&self) -> &'static str {
        KEY_VALUE_TABLE_TYPE
    }

    fn configure(&self, name: &str, properties: DatasetProperties) -> Result<DatasetSpecification> {
        // The value column is fixed
        if properties.contains_key("columns") {
            return Err(DatasetError::InvalidProperties {
                name: name.to_string(),
                message: "keyValueTable does not accept 'columns'".to_string(),
            });
        }
        Ok(DatasetSpecification::new(name, KEY_VALUE_TABLE_TYPE, properties))
    }

    fn open(&self, _spec: &DatasetSpecification, storage: Arc<TableStorage>) -> Dataset {
        Dataset::KeyValueTable(Arc::new(KeyValueTable::new(storage)))
    }
}

/// Registered dataset types by name
#[derive(Clone)]
pub struct DatasetDefinitionRegistry {
    definitions: HashMap<String, Arc<dyn DatasetDefinition>>,
}

impl DatasetDefinitionRegistry {
    /// Registry with no types
    pub fn empty() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    pub fn register(&mut self, definition: Arc<dyn DatasetDefinition>) {
        self.definitions
            .insert(definition.type_name().to_string(), definition);
    }

    pub fn get(&self, type_name: &str) -> Result<Arc<dyn DatasetDefinition>> {
        self.definitions
            .get(type_name)
            .cloned()
            .ok_or_else(|| DatasetError::UnknownType(type_name.to_string()))
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for DatasetDefinitionRegistry {
    /// Registry with the built-in types
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(TableDefinition));
        registry.register(Arc::new(KeyValueTableDefinition));
        registry
    }
}
