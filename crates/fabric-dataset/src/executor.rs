//! Administrative operations on dataset instances
//!
//! [`DatasetOpExecutor`] is implemented locally here, over the in-memory
//! framework, and remotely by the fabric client, which forwards every call to
//! the executor service over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::DatasetError;
use crate::framework::InMemoryDatasetFramework;
use crate::model::{CreateInstanceRequest, DatasetSpecification};

/// Administrative operation names accepted on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminOp {
    Exists,
    Create,
    Truncate,
    Upgrade,
    Drop,
}

impl AdminOp {
    pub const ALL: [AdminOp; 5] = [
        AdminOp::Exists,
        AdminOp::Create,
        AdminOp::Truncate,
        AdminOp::Upgrade,
        AdminOp::Drop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AdminOp::Exists => "exists",
            AdminOp::Create => "create",
            AdminOp::Truncate => "truncate",
            AdminOp::Upgrade => "upgrade",
            AdminOp::Drop => "drop",
        }
    }
}

impl std::fmt::Display for AdminOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AdminOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exists" => Ok(AdminOp::Exists),
            "create" => Ok(AdminOp::Create),
            "truncate" => Ok(AdminOp::Truncate),
            "upgrade" => Ok(AdminOp::Upgrade),
            "drop" => Ok(AdminOp::Drop),
            _ => Err(format!("Invalid admin operation: {}", s)),
        }
    }
}

/// Dataset lifecycle operations, addressed by namespaced instance name
#[async_trait]
pub trait DatasetOpExecutor: Send + Sync {
    /// Whether the instance exists
    async fn exists(&self, instance: &str) -> anyhow::Result<bool>;

    /// Create the instance; fails if it already exists
    async fn create(
        &self,
        instance: &str,
        request: CreateInstanceRequest,
    ) -> anyhow::Result<DatasetSpecification>;

    /// Delete all data of the instance
    async fn truncate(&self, instance: &str) -> anyhow::Result<()>;

    /// Move the instance to the current format version
    async fn upgrade(&self, instance: &str) -> anyhow::Result<()>;

    /// Delete the instance
    async fn drop_instance(&self, instance: &str) -> anyhow::Result<()>;
}

/// Run `op` and render its result the way it travels on the wire.
///
/// `exists` on a missing instance is reported as [`DatasetError::NotFound`]
/// so all operations share one "not found" path.
pub async fn execute_admin_op(
    executor: &dyn DatasetOpExecutor,
    op: AdminOp,
    instance: &str,
    request: Option<CreateInstanceRequest>,
) -> anyhow::Result<Value> {
    debug!(op = %op, instance = %instance, "Executing admin operation");
    match op {
        AdminOp::Exists => {
            if executor.exists(instance).await? {
                Ok(Value::Bool(true))
            } else {
                Err(DatasetError::NotFound(instance.to_string()).into())
            }
        }
        AdminOp::Create => {
            let request = request.ok_or_else(|| DatasetError::InvalidProperties {
                name: instance.to_string(),
                message: "create requires a typeName".to_string(),
            })?;
            let spec = executor.create(instance, request).await?;
            Ok(serde_json::to_value(spec)?)
        }
        AdminOp::Truncate => {
            executor.truncate(instance).await?;
            Ok(Value::Null)
        }
        AdminOp::Upgrade => {
            executor.upgrade(instance).await?;
            Ok(Value::Null)
        }
        AdminOp::Drop => {
            executor.drop_instance(instance).await?;
            Ok(Value::Null)
        }
    }
}

/// Executes operations against the in-process dataset framework
#[derive(Clone)]
pub struct LocalDatasetOpExecutor {
    framework: Arc<InMemoryDatasetFramework>,
}

impl LocalDatasetOpExecutor {
    pub fn new(framework: Arc<InMemoryDatasetFramework>) -> Self {
        Self { framework }
    }

    pub fn framework(&self) -> &Arc<InMemoryDatasetFramework> {
        &self.framework
    }
}

#[async_trait]
impl DatasetOpExecutor for LocalDatasetOpExecutor {
    async fn exists(&self, instance: &str) -> anyhow::Result<bool> {
        Ok(self.framework.has_instance(instance))
    }

    async fn create(
        &self,
        instance: &str,
        request: CreateInstanceRequest,
    ) -> anyhow::Result<DatasetSpecification> {
        Ok(self
            .framework
            .add_instance(&request.type_name, instance, request.properties)?)
    }

    async fn truncate(&self, instance: &str) -> anyhow::Result<()> {
        Ok(self.framework.truncate_instance(instance)?)
    }

    async fn upgrade(&self, instance: &str) -> anyhow::Result<()> {
        self.framework.upgrade_instance(instance)?;
        Ok(())
    }

    async fn drop_instance(&self, instance: &str) -> anyhow::Result<()> {
        Ok(self.framework.delete_instance(instance)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TABLE_TYPE;
    use crate::model::DatasetProperties;

    fn local() -> LocalDatasetOpExecutor {
        LocalDatasetOpExecutor::new(Arc::new(InMemoryDatasetFramework::default()))
    }

    fn not_found(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<DatasetError>(), Some(DatasetError::NotFound(_)))
    }

    #[test]
    fn test_admin_op_parsing() {
        for op in AdminOp::ALL {
            assert_eq!(op.as_str().parse::<AdminOp>(), Ok(op));
        }
        assert!("explode".parse::<AdminOp>().is_err());
        assert_eq!(AdminOp::Drop.to_string(), "drop");
    }

    #[tokio::test]
    async fn test_lifecycle_through_dispatch() {
        let executor = local();
        let name = "fabric.user.bob";

        let err = execute_admin_op(&executor, AdminOp::Exists, name, None)
            .await
            .unwrap_err();
        assert!(not_found(&err));

        let created = execute_admin_op(
            &executor,
            AdminOp::Create,
            name,
            Some(CreateInstanceRequest::new(TABLE_TYPE, DatasetProperties::new())),
        )
        .await
        .unwrap();
        assert_eq!(created["name"], name);
        assert_eq!(created["typeName"], TABLE_TYPE);

        assert_eq!(
            execute_admin_op(&executor, AdminOp::Exists, name, None)
                .await
                .unwrap(),
            Value::Bool(true)
        );
        for op in [AdminOp::Truncate, AdminOp::Upgrade, AdminOp::Drop] {
            assert_eq!(
                execute_admin_op(&executor, op, name, None).await.unwrap(),
                Value::Null
            );
        }
        assert!(!executor.framework().has_instance(name));
    }

    #[tokio::test]
    async fn test_missing_instance_is_not_found() {
        let executor = local();
        for op in [AdminOp::Truncate, AdminOp::Upgrade, AdminOp::Drop] {
            let err = execute_admin_op(&executor, op, "nobody", None)
                .await
                .unwrap_err();
            assert!(not_found(&err), "{} should report not found", op);
        }
    }

    #[tokio::test]
    async fn test_create_errors() {
        let executor = local();

        let err = execute_admin_op(&executor, AdminOp::Create, "a", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::InvalidProperties { .. })
        ));

        let err = execute_admin_op(
            &executor,
            AdminOp::Create,
            "a",
            Some(CreateInstanceRequest::new("queue", DatasetProperties::new())),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::UnknownType(_))
        ));

        let request = CreateInstanceRequest::new(TABLE_TYPE, DatasetProperties::new());
        executor.create("a", request.clone()).await.unwrap();
        let err = executor.create("a", request).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::AlreadyExists(_))
        ));
    }
}
