//! End-to-end tests: facade → discovery → HTTP executor service → storage,
//! plus transactions over the datasets it manages

use std::sync::Arc;
use std::time::Duration;

use fabric_client::{ClientError, DatasetServiceClient, RemoteDatasetFramework};
use fabric_common::config::{
    DATASET_EXECUTOR_ADDRESS, DATASET_EXECUTOR_PORT, DATASET_EXECUTOR_THREADS,
    DISCOVERY_RESOLVE_TIMEOUT_MS,
};
use fabric_common::{Configuration, DATASET_EXECUTOR_SERVICE};
use fabric_dataset::{
    AdminOp, DatasetError, DatasetOpExecutor, DatasetProperties, Get, InMemoryDatasetFramework,
    KEY_VALUE_TABLE_TYPE, LocalDatasetOpExecutor, Put, TABLE_TYPE, Table,
};
use fabric_discovery::DiscoveryService;
use fabric_server::{DatasetOpExecutorService, ServerRunner};
use fabric_tx::{
    InMemoryTransactionManager, TransactionAware, TransactionExecutor, TransactionFailure,
};

struct Cluster {
    discovery: DiscoveryService,
    runner: ServerRunner,
    framework: RemoteDatasetFramework,
    tx_manager: Arc<InMemoryTransactionManager>,
}

impl Cluster {
    async fn start() -> Self {
        let configuration = Configuration::default()
            .with_override(DATASET_EXECUTOR_ADDRESS, "127.0.0.1")
            .and_then(|c| c.with_override(DATASET_EXECUTOR_PORT, 0i64))
            .and_then(|c| c.with_override(DATASET_EXECUTOR_THREADS, 2i64))
            .and_then(|c| c.with_override(DISCOVERY_RESOLVE_TIMEOUT_MS, 2000i64))
            .unwrap();

        let discovery = DiscoveryService::new();
        let storage = Arc::new(InMemoryDatasetFramework::default());
        let executor: Arc<dyn DatasetOpExecutor> =
            Arc::new(LocalDatasetOpExecutor::new(storage.clone()));
        let runner = ServerRunner::new(
            Arc::new(DatasetOpExecutorService::new(executor)),
            discovery.clone(),
        );
        runner.start(&configuration).await.unwrap();

        let framework =
            RemoteDatasetFramework::from_configuration(&discovery, &configuration, storage)
                .unwrap();

        Self {
            discovery,
            runner,
            framework,
            tx_manager: Arc::new(InMemoryTransactionManager::new()),
        }
    }

    fn table(&self, name: &str) -> Arc<Table> {
        self.framework
            .get_dataset(name)
            .unwrap()
            .as_table()
            .unwrap()
    }

    fn executor(&self, table: &Arc<Table>) -> TransactionExecutor {
        TransactionExecutor::new(
            self.tx_manager.clone(),
            vec![table.clone() as Arc<dyn TransactionAware>],
        )
    }

    async fn shutdown(self) {
        self.runner.stop().await;
        self.discovery.close();
    }
}

fn read(
    executor: &TransactionExecutor,
    table: &Arc<Table>,
    row: &str,
    column: &str,
) -> Option<String> {
    executor
        .execute(|| Ok(table.get(Get::new(row).add(column))?.get_string(column)))
        .unwrap()
}

#[tokio::test]
async fn test_dataset_lifecycle_with_transactions() {
    let cluster = Cluster::start().await;
    let framework = &cluster.framework;

    assert!(!framework.has_instance("bob").await.unwrap());
    let err = framework
        .client()
        .execute(AdminOp::Exists, "fabric.user.bob", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InstanceNotFound(_)));

    let spec = framework
        .add_instance(TABLE_TYPE, "bob", DatasetProperties::new())
        .await
        .unwrap();
    assert_eq!(spec.name, "fabric.user.bob");
    assert_eq!(spec.type_name, TABLE_TYPE);
    assert!(framework.has_instance("bob").await.unwrap());

    let table = cluster.table("bob");
    let executor = cluster.executor(&table);

    executor
        .execute(|| Ok(table.put(Put::new("key1").add("col1", "val1"))?))
        .unwrap();
    assert_eq!(read(&executor, &table, "key1", "col1"), Some("val1".to_string()));

    framework.truncate_instance("bob").await.unwrap();
    let row = executor
        .execute(|| Ok(table.get(Get::new("key1").add("col1"))?))
        .unwrap();
    assert!(row.is_empty());

    framework.upgrade_instance("bob").await.unwrap();
    framework.delete_instance("bob").await.unwrap();
    assert!(!framework.has_instance("bob").await.unwrap());

    let failure = executor
        .execute(|| Ok(table.put(Put::new("key1").add("col1", "val2"))?))
        .unwrap_err();
    assert!(!failure.is_conflict());

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_create_existing_instance_conflicts() {
    let cluster = Cluster::start().await;
    let framework = &cluster.framework;

    framework
        .add_instance(KEY_VALUE_TABLE_TYPE, "counters", DatasetProperties::new())
        .await
        .unwrap();
    let err = framework
        .add_instance(KEY_VALUE_TABLE_TYPE, "counters", DatasetProperties::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InstanceAlreadyExists(_)));

    let err = framework
        .add_instance("noSuchType", "other", DatasetProperties::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::BadRequest { .. }));

    let err = framework.truncate_instance("missing").await.unwrap_err();
    assert!(matches!(err, ClientError::InstanceNotFound(_)));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_key_value_table_through_facade() {
    let cluster = Cluster::start().await;
    cluster
        .framework
        .add_instance(KEY_VALUE_TABLE_TYPE, "kv", DatasetProperties::new())
        .await
        .unwrap();

    let kv = cluster
        .framework
        .get_dataset("kv")
        .unwrap()
        .as_key_value_table()
        .unwrap();
    let executor = TransactionExecutor::new(
        cluster.tx_manager.clone(),
        vec![kv.clone() as Arc<dyn TransactionAware>],
    );

    executor.execute(|| Ok(kv.write("k", "v")?)).unwrap();
    let value = executor.execute(|| Ok(kv.read_string("k")?)).unwrap();
    assert_eq!(value, Some("v".to_string()));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_uncommitted_writes_are_invisible() {
    let cluster = Cluster::start().await;
    cluster
        .framework
        .add_instance(TABLE_TYPE, "iso", DatasetProperties::new())
        .await
        .unwrap();

    let writer_table = cluster.table("iso");
    let reader_table = cluster.table("iso");
    let writer = cluster.executor(&writer_table);
    let reader = cluster.executor(&reader_table);

    let seen_during = writer
        .execute(|| {
            writer_table.put(Put::new("r").add("c", "uncommitted"))?;
            Ok(read(&reader, &reader_table, "r", "c"))
        })
        .unwrap();
    assert_eq!(seen_during, None);
    assert_eq!(
        read(&reader, &reader_table, "r", "c"),
        Some("uncommitted".to_string())
    );

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_second_committer_of_overlapping_write_fails() {
    let cluster = Cluster::start().await;
    cluster
        .framework
        .add_instance(TABLE_TYPE, "race", DatasetProperties::new())
        .await
        .unwrap();

    let first_table = cluster.table("race");
    let second_table = cluster.table("race");
    let first = cluster.executor(&first_table);
    let second = cluster.executor(&second_table);

    let failure = first
        .execute(|| {
            first_table.put(Put::new("r").add("c", "first"))?;
            second
                .execute(|| Ok(second_table.put(Put::new("r").add("c", "second"))?))
                .map_err(anyhow::Error::new)?;
            Ok(())
        })
        .unwrap_err();
    assert!(failure.is_conflict(), "unexpected failure: {}", failure);
    assert!(matches!(failure, TransactionFailure::Conflict { .. }));

    assert_eq!(
        read(&first, &first_table, "r", "c"),
        Some("second".to_string())
    );
    assert_eq!(cluster.tx_manager.stats().in_progress, 0);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_unknown_operation_is_rejected() {
    let cluster = Cluster::start().await;
    cluster
        .framework
        .add_instance(TABLE_TYPE, "bob", DatasetProperties::new())
        .await
        .unwrap();

    let err = cluster
        .framework
        .client()
        .execute_raw("explode", "fabric.user.bob", None)
        .await
        .unwrap_err();
    match err {
        ClientError::BadRequest { message, .. } => {
            assert!(message.contains("explode"), "message: {}", message)
        }
        other => panic!("unexpected error: {:?}", other),
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_stop_is_idempotent_and_withdraws_announcement() {
    let cluster = Cluster::start().await;
    assert!(cluster.runner.probe());
    assert_eq!(cluster.discovery.discover(DATASET_EXECUTOR_SERVICE).len(), 1);

    cluster.runner.stop().await;
    cluster.runner.stop().await;
    assert!(!cluster.runner.probe());
    assert!(cluster.discovery.discover(DATASET_EXECUTOR_SERVICE).is_empty());

    let client =
        DatasetServiceClient::with_resolve_timeout(&cluster.discovery, Duration::from_millis(200))
            .unwrap();
    let started = std::time::Instant::now();
    let err = client.exists("fabric.user.bob").await.unwrap_err();
    assert!(matches!(err, ClientError::ServiceUnavailable(_)));
    assert!(started.elapsed() >= Duration::from_millis(200));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_dropped_handle_fails_after_delete() {
    let cluster = Cluster::start().await;
    cluster
        .framework
        .add_instance(TABLE_TYPE, "gone", DatasetProperties::new())
        .await
        .unwrap();
    let table = cluster.table("gone");
    cluster.framework.delete_instance("gone").await.unwrap();

    let executor = cluster.executor(&table);
    let failure = executor
        .execute(|| Ok(table.get(Get::new("r"))?))
        .unwrap_err();
    let cause = failure.into_cause().unwrap();
    assert!(matches!(
        cause.downcast_ref::<DatasetError>(),
        Some(DatasetError::Dropped(_))
    ));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_names_cannot_reach_other_instances_or_routes() {
    let cluster = Cluster::start().await;
    let framework = &cluster.framework;
    framework
        .add_instance(TABLE_TYPE, "bob", DatasetProperties::new())
        .await
        .unwrap();

    let err = framework.has_instance("bob/admin/drop#").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Dataset(DatasetError::InvalidName(_))
    ));
    assert!(framework.has_instance("bob").await.unwrap());

    let err = framework
        .add_instance(TABLE_TYPE, "a/b", DatasetProperties::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Dataset(DatasetError::InvalidName(ref name)) if name == "fabric.user.a/b"
    ));

    let err = framework.delete_instance("bob?x=1").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Dataset(DatasetError::InvalidName(_))
    ));
    assert!(framework.has_instance("bob").await.unwrap());

    cluster.shutdown().await;
}
