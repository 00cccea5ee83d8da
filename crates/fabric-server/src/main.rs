//! Main entry point of the fabric server.
//!
//! Loads configuration, starts the dataset executor service and the stats
//! reporter, and runs until Ctrl+C or SIGTERM.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use fabric_dataset::{InMemoryDatasetFramework, LocalDatasetOpExecutor};
use fabric_discovery::DiscoveryService;
use fabric_server::startup::{self, Cli, LoggingConfig, ShutdownSignal};
use fabric_server::{DatasetOpExecutorService, ServiceApplication, StatsReporter};
use fabric_tx::InMemoryTransactionManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let configuration = startup::load_configuration(&cli)?;

    let _logging_guard = startup::init_logging(&LoggingConfig::from_configuration(&configuration))?;
    fabric_server::metrics::init_metrics();

    let discovery = DiscoveryService::new();
    let tx_manager = Arc::new(InMemoryTransactionManager::new());
    let framework = Arc::new(InMemoryDatasetFramework::default());
    let executor = Arc::new(LocalDatasetOpExecutor::new(framework));

    let spec = ServiceApplication::new("fabric")
        .with_handler(Arc::new(DatasetOpExecutorService::new(executor)))
        .with_worker(Arc::new(StatsReporter::new(
            tx_manager,
            configuration.stats_interval(),
        )))
        .configure()?;

    let shutdown = ShutdownSignal::new();
    let mut shutdown_rx = shutdown.subscribe();
    startup::listen_for_os_signals(shutdown.clone());

    let mut deployment = match spec.launch(&configuration, &discovery, &shutdown).await {
        Ok(deployment) => deployment,
        Err(e) => {
            error!(error = %e, "Failed to start fabric server");
            discovery.close();
            return Err(e.into());
        }
    };

    info!(
        namespace = %configuration.dataset_namespace(),
        "Fabric server started"
    );

    let _ = shutdown_rx.recv().await;

    deployment.shutdown().await;
    discovery.close();
    info!("Fabric server stopped");
    Ok(())
}
