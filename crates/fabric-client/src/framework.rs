//! Dataset framework facade
//!
//! Management calls go to the dataset executor service through
//! [`DatasetServiceClient`]. Data access does not: [`RemoteDatasetFramework::get_dataset`]
//! opens a transaction-aware handle directly over the local storage.

use std::sync::Arc;

use tracing::info;

use fabric_common::{Configuration, DatasetNamespace};
use fabric_dataset::{
    CreateInstanceRequest, Dataset, DatasetProperties, DatasetSpecification,
    InMemoryDatasetFramework,
};
use fabric_discovery::DiscoveryService;

use crate::error::Result;
use crate::remote::DatasetServiceClient;

/// Namespaced dataset management backed by the remote executor
#[derive(Clone)]
pub struct RemoteDatasetFramework {
    client: DatasetServiceClient,
    namespace: DatasetNamespace,
    storage: Arc<InMemoryDatasetFramework>,
}

impl RemoteDatasetFramework {
    pub fn new(
        client: DatasetServiceClient,
        namespace: DatasetNamespace,
        storage: Arc<InMemoryDatasetFramework>,
    ) -> Self {
        Self {
            client,
            namespace,
            storage,
        }
    }

    /// Build the facade from configuration: resolve timeout and namespace
    pub fn from_configuration(
        discovery: &DiscoveryService,
        configuration: &Configuration,
        storage: Arc<InMemoryDatasetFramework>,
    ) -> Result<Self> {
        let client = DatasetServiceClient::new(discovery, configuration)?;
        let namespace = DatasetNamespace::new(&configuration.dataset_namespace())?;
        Ok(Self::new(client, namespace, storage))
    }

    pub fn namespace(&self) -> &DatasetNamespace {
        &self.namespace
    }

    pub fn client(&self) -> &DatasetServiceClient {
        &self.client
    }

    /// Create an instance of `type_name`; fails with
    /// [`ClientError::InstanceAlreadyExists`](crate::ClientError::InstanceAlreadyExists)
    /// if the name is taken
    pub async fn add_instance(
        &self,
        type_name: &str,
        name: &str,
        properties: DatasetProperties,
    ) -> Result<DatasetSpecification> {
        let instance = self.namespace.namespaced(name);
        let spec = self
            .client
            .create(&instance, &CreateInstanceRequest::new(type_name, properties))
            .await?;
        info!(instance = %instance, type_name = %type_name, "Dataset instance added");
        Ok(spec)
    }

    pub async fn has_instance(&self, name: &str) -> Result<bool> {
        self.client.exists(&self.namespace.namespaced(name)).await
    }

    pub async fn truncate_instance(&self, name: &str) -> Result<()> {
        self.client.truncate(&self.namespace.namespaced(name)).await
    }

    pub async fn upgrade_instance(&self, name: &str) -> Result<()> {
        self.client.upgrade(&self.namespace.namespaced(name)).await
    }

    pub async fn delete_instance(&self, name: &str) -> Result<()> {
        let instance = self.namespace.namespaced(name);
        self.client.drop_instance(&instance).await?;
        info!(instance = %instance, "Dataset instance deleted");
        Ok(())
    }

    /// Open a transaction-aware handle to `name` over local storage
    pub fn get_dataset(&self, name: &str) -> Result<Dataset> {
        Ok(self.storage.get_dataset(&self.namespace.namespaced(name))?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fabric_common::config::DATASET_NAMESPACE;
    use fabric_dataset::{DatasetError, TABLE_TYPE};

    use super::*;
    use crate::ClientError;

    #[test]
    fn test_get_dataset_uses_namespaced_local_storage() {
        let discovery = DiscoveryService::new();
        let storage = Arc::new(InMemoryDatasetFramework::default());
        storage
            .add_instance(TABLE_TYPE, "fabric.team.events", DatasetProperties::new())
            .unwrap();

        let configuration = Configuration::default()
            .with_override(DATASET_NAMESPACE, "team")
            .unwrap();
        let framework =
            RemoteDatasetFramework::from_configuration(&discovery, &configuration, storage)
                .unwrap();

        assert_eq!(framework.namespace().namespace(), "team");
        assert!(framework.get_dataset("events").unwrap().as_table().is_some());
        assert!(matches!(
            framework.get_dataset("missing"),
            Err(ClientError::Dataset(DatasetError::NotFound(_)))
        ));
    }

    #[test]
    fn test_invalid_namespace_is_rejected() {
        let discovery = DiscoveryService::new();
        let configuration = Configuration::default()
            .with_override(DATASET_NAMESPACE, "a.b")
            .unwrap();
        let result = RemoteDatasetFramework::from_configuration(
            &discovery,
            &configuration,
            Arc::new(InMemoryDatasetFramework::default()),
        );
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_management_call_without_executor_is_unavailable() {
        let discovery = DiscoveryService::new();
        let client =
            DatasetServiceClient::with_resolve_timeout(&discovery, Duration::from_millis(50))
                .unwrap();
        let framework = RemoteDatasetFramework::new(
            client,
            DatasetNamespace::new("user").unwrap(),
            Arc::new(InMemoryDatasetFramework::default()),
        );

        let err = framework.delete_instance("bob").await.unwrap_err();
        assert!(matches!(err, ClientError::ServiceUnavailable(_)));
    }
}
