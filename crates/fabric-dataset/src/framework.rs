//! Registry of dataset instances and their storage
//!
//! Instance names handled here are already namespaced; callers map user-facing
//! names through [`DatasetNamespace`](fabric_common::DatasetNamespace).

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;

use fabric_common::is_valid_name;

use crate::definition::{Dataset, DatasetDefinitionRegistry};
use crate::error::{DatasetError, Result};
use crate::model::{DatasetProperties, DatasetSpecification};
use crate::storage::TableStorage;

struct DatasetInstance {
    spec: DatasetSpecification,
    storage: Arc<TableStorage>,
}

/// Holds every dataset instance of the process in memory
pub struct InMemoryDatasetFramework {
    definitions: DatasetDefinitionRegistry,
    instances: DashMap<String, DatasetInstance>,
}

impl InMemoryDatasetFramework {
    pub fn new(definitions: DatasetDefinitionRegistry) -> Self {
        Self {
            definitions,
            instances: DashMap::new(),
        }
    }

    pub fn definitions(&self) -> &DatasetDefinitionRegistry {
        &self.definitions
    }

    pub fn add_instance(
        &self,
        type_name: &str,
        name: &str,
        properties: DatasetProperties,
    ) -> Result<DatasetSpecification> {
        if !is_valid_name(name) {
            return Err(DatasetError::InvalidName(name.to_string()));
        }
        let definition = self.definitions.get(type_name)?;

        match self.instances.entry(name.to_string()) {
            Entry::Occupied(_) => Err(DatasetError::AlreadyExists(name.to_string())),
            Entry::Vacant(entry) => {
                let spec = definition.configure(name, properties)?;
                entry.insert(DatasetInstance {
                    spec: spec.clone(),
                    storage: Arc::new(TableStorage::new(name)),
                });
                info!(instance = %name, type_name = %type_name, "Dataset instance created");
                Ok(spec)
            }
        }
    }

    pub fn has_instance(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    pub fn get_spec(&self, name: &str) -> Result<DatasetSpecification> {
        self.instances
            .get(name)
            .map(|instance| instance.spec.clone())
            .ok_or_else(|| DatasetError::NotFound(name.to_string()))
    }

    /// Names of every instance, sorted
    pub fn instances(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .instances
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn truncate_instance(&self, name: &str) -> Result<()> {
        let instance = self
            .instances
            .get(name)
            .ok_or_else(|| DatasetError::NotFound(name.to_string()))?;
        instance.storage.truncate();
        info!(instance = %name, "Dataset instance truncated");
        Ok(())
    }

    /// Move the instance to the next format version; data is kept
    pub fn upgrade_instance(&self, name: &str) -> Result<DatasetSpecification> {
        let mut instance = self
            .instances
            .get_mut(name)
            .ok_or_else(|| DatasetError::NotFound(name.to_string()))?;
        instance.spec.format_version += 1;
        info!(
            instance = %name,
            format_version = instance.spec.format_version,
            "Dataset instance upgraded"
        );
        Ok(instance.spec.clone())
    }

    pub fn delete_instance(&self, name: &str) -> Result<()> {
        let (_, instance) = self
            .instances
            .remove(name)
            .ok_or_else(|| DatasetError::NotFound(name.to_string()))?;
        instance.storage.mark_dropped();
        info!(instance = %name, "Dataset instance dropped");
        Ok(())
    }

    /// Open a new transaction-aware handle bound to the instance's storage
    pub fn get_dataset(&self, name: &str) -> Result<Dataset> {
        let instance = self
            .instances
            .get(name)
            .ok_or_else(|| DatasetError::NotFound(name.to_string()))?;
        let definition = self.definitions.get(&instance.spec.type_name)?;
        Ok(definition.open(&instance.spec, instance.storage.clone()))
    }
}

impl Default for InMemoryDatasetFramework {
    fn default() -> Self {
        Self::new(DatasetDefinitionRegistry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{KEY_VALUE_TABLE_TYPE, TABLE_TYPE};
    use crate::table::{Get, Put};
    use fabric_tx::{InMemoryTransactionManager, TransactionAware, TransactionExecutor};

    #[test]
    fn test_instance_lifecycle() {
        let framework = InMemoryDatasetFramework::default();
        let name = "fabric.user.bob";

        assert!(!framework.has_instance(name));
        let spec = framework
            .add_instance(TABLE_TYPE, name, DatasetProperties::new())
            .unwrap();
        assert_eq!(spec.type_name, TABLE_TYPE);
        assert_eq!(spec.format_version, 1);
        assert!(framework.has_instance(name));

        assert_eq!(
            framework.add_instance(TABLE_TYPE, name, DatasetProperties::new()),
            Err(DatasetError::AlreadyExists(name.to_string()))
        );

        let upgraded = framework.upgrade_instance(name).unwrap();
        assert_eq!(upgraded.format_version, 2);
        assert_eq!(framework.get_spec(name).unwrap().format_version, 2);

        framework.truncate_instance(name).unwrap();
        framework.delete_instance(name).unwrap();
        assert!(!framework.has_instance(name));
        assert_eq!(
            framework.delete_instance(name),
            Err(DatasetError::NotFound(name.to_string()))
        );
    }

    #[test]
    fn test_missing_instance_operations() {
        let framework = InMemoryDatasetFramework::default();
        assert!(matches!(framework.truncate_instance("x"), Err(DatasetError::NotFound(_))));
        assert!(matches!(framework.upgrade_instance("x"), Err(DatasetError::NotFound(_))));
        assert!(matches!(framework.get_dataset("x"), Err(DatasetError::NotFound(_))));
    }

    #[test]
    fn test_rejects_unknown_type_and_bad_name() {
        let framework = InMemoryDatasetFramework::default();
        assert_eq!(
            framework.add_instance("queue", "q", DatasetProperties::new()),
            Err(DatasetError::UnknownType("queue".to_string()))
        );
        assert_eq!(
            framework.add_instance(TABLE_TYPE, "bad name", DatasetProperties::new()),
            Err(DatasetError::InvalidName("bad name".to_string()))
        );
        assert!(framework.instances().is_empty());
    }

    #[test]
    fn test_truncate_and_drop_affect_open_handles() {
        let framework = InMemoryDatasetFramework::default();
        framework
            .add_instance(KEY_VALUE_TABLE_TYPE, "kv", DatasetProperties::new())
            .unwrap();
        framework
            .add_instance(TABLE_TYPE, "t", DatasetProperties::new())
            .unwrap();

        let manager = Arc::new(InMemoryTransactionManager::new());
        let table = framework.get_dataset("t").unwrap().as_table().unwrap();
        let exec = TransactionExecutor::new(manager, vec![table.clone() as Arc<dyn TransactionAware>]);

        exec.execute(|| {
            table.put(Put::new("r").add("c", "v"))?;
            Ok(())
        })
        .unwrap();

        framework.truncate_instance("t").unwrap();
        let row = exec.execute(|| Ok(table.get(Get::new("r"))?)).unwrap();
        assert!(row.is_empty());

        framework.delete_instance("t").unwrap();
        let failure = exec
            .execute(|| Ok(table.get(Get::new("r"))?))
            .unwrap_err();
        assert!(failure.to_string().contains("dataset 't' dropped"));

        assert_eq!(framework.instances(), vec!["kv".to_string()]);
    }
}
