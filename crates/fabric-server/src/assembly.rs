//! Deployment assembly
//!
//! A [`ServiceApplication`] names one primary request handler (a
//! [`RegisteredServer`]) and any number of background workers.
//! [`ServiceApplication::configure`] validates it into a
//! [`DeploymentSpecification`], which [`launch`](DeploymentSpecification::launch)
//! brings up in-process.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use fabric_common::Configuration;
use fabric_discovery::DiscoveryService;

use crate::error::{Result, ServerError};
use crate::runner::ServerRunner;
use crate::startup::ShutdownSignal;
use crate::transport::RegisteredServer;

/// A long-running background task of a deployment
#[async_trait]
pub trait BackgroundWorker: Send + Sync {
    fn name(&self) -> &str;

    /// Run until `shutdown` fires
    async fn run(&self, shutdown: broadcast::Receiver<()>) -> anyhow::Result<()>;
}

/// One runnable unit of a deployment
#[derive(Clone)]
pub enum RunnableSpec {
    Server(Arc<dyn RegisteredServer>),
    Worker(Arc<dyn BackgroundWorker>),
}

impl RunnableSpec {
    pub fn name(&self) -> &str {
        match self {
            RunnableSpec::Server(server) => server.service_name(),
            RunnableSpec::Worker(worker) => worker.name(),
        }
    }
}

/// Application definition: a name, a primary handler, background workers
pub struct ServiceApplication {
    name: String,
    handler: Option<Arc<dyn RegisteredServer>>,
    workers: Vec<Arc<dyn BackgroundWorker>>,
}

impl ServiceApplication {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            handler: None,
            workers: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn RegisteredServer>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_worker(mut self, worker: Arc<dyn BackgroundWorker>) -> Self {
        self.workers.push(worker);
        self
    }

    /// Validate and produce the deployable specification
    pub fn configure(self) -> Result<DeploymentSpecification> {
        if self.name.trim().is_empty() {
            return Err(ServerError::InvalidDeployment(
                "application name is empty".to_string(),
            ));
        }
        let handler = self.handler.ok_or_else(|| {
            ServerError::InvalidDeployment(format!(
                "application '{}' has no primary request handler",
                self.name
            ))
        })?;

        let mut runnables = vec![RunnableSpec::Server(handler)];
        runnables.extend(self.workers.into_iter().map(RunnableSpec::Worker));

        Ok(DeploymentSpecification {
            name: self.name,
            runnables,
        })
    }
}

/// Validated deployment: the runnables to launch, in no particular order
#[derive(Clone)]
pub struct DeploymentSpecification {
    name: String,
    runnables: Vec<RunnableSpec>,
}

impl DeploymentSpecification {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runnables(&self) -> &[RunnableSpec] {
        &self.runnables
    }

    /// Start every runnable in this process.
    ///
    /// Servers are announced through `discovery`; workers run until
    /// `shutdown` fires. If a server fails to start, everything already
    /// launched is shut down again.
    pub async fn launch(
        &self,
        configuration: &Configuration,
        discovery: &DiscoveryService,
        shutdown: &ShutdownSignal,
    ) -> Result<Deployment> {
        let mut deployment = Deployment {
            name: self.name.clone(),
            runners: Vec::new(),
            workers: Vec::new(),
            shutdown: shutdown.clone(),
        };

        for runnable in &self.runnables {
            match runnable {
                RunnableSpec::Server(server) => {
                    let runner = ServerRunner::new(server.clone(), discovery.clone());
                    if let Err(e) = runner.start(configuration).await {
                        error!(
                            application = %self.name,
                            runnable = %runnable.name(),
                            error = %e,
                            "Failed to launch server"
                        );
                        deployment.shutdown().await;
                        return Err(e);
                    }
                    deployment.runners.push(runner);
                }
                RunnableSpec::Worker(worker) => {
                    let worker = worker.clone();
                    let receiver = shutdown.subscribe();
                    deployment.workers.push(tokio::spawn(async move {
                        if let Err(e) = worker.run(receiver).await {
                            error!(worker = %worker.name(), error = %e, "Background worker failed");
                        }
                    }));
                }
            }
        }

        info!(
            application = %self.name,
            servers = deployment.runners.len(),
            workers = deployment.workers.len(),
            "Deployment launched"
        );
        Ok(deployment)
    }
}

/// A launched deployment
pub struct Deployment {
    name: String,
    runners: Vec<ServerRunner>,
    workers: Vec<JoinHandle<()>>,
    shutdown: ShutdownSignal,
}

impl Deployment {
    pub fn runners(&self) -> &[ServerRunner] {
        &self.runners
    }

    /// Whether every server of the deployment is serving
    pub fn probe(&self) -> bool {
        !self.runners.is_empty() && self.runners.iter().all(ServerRunner::probe)
    }

    /// Stop servers (withdrawing their announcements) and wait for workers
    pub async fn shutdown(&mut self) {
        self.shutdown.shutdown();
        for runner in &self.runners {
            runner.stop().await;
        }
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        info!(application = %self.name, "Deployment stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ServerBinding;
    use fabric_discovery::ServicePayload;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeServer {
        running: AtomicBool,
    }

    #[async_trait]
    impl RegisteredServer for FakeServer {
        fn service_name(&self) -> &str {
            "fake"
        }

        async fn configure(&self, _configuration: &Configuration) -> Result<ServerBinding> {
            Ok(ServerBinding {
                port: 1,
                payload: ServicePayload::new(),
            })
        }

        async fn start(&self) -> Result<()> {
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) {
            self.running.store(false, Ordering::SeqCst);
        }

        fn probe(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct CountingWorker {
        runs: AtomicUsize,
        stopped: AtomicBool,
    }

    #[async_trait]
    impl BackgroundWorker for CountingWorker {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let _ = shutdown.recv().await;
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_missing_handler_is_rejected() {
        let err = ServiceApplication::new("app")
            .with_worker(Arc::new(CountingWorker::default()))
            .configure()
            .err()
            .unwrap();
        assert!(matches!(err, ServerError::InvalidDeployment(_)));
    }

    #[test]
    fn test_configure_lists_runnables() {
        let spec = ServiceApplication::new("app")
            .with_worker(Arc::new(CountingWorker::default()))
            .with_handler(Arc::new(FakeServer::default()))
            .configure()
            .unwrap();

        assert_eq!(spec.name(), "app");
        let mut names: Vec<&str> = spec.runnables().iter().map(RunnableSpec::name).collect();
        names.sort();
        assert_eq!(names, vec!["counting", "fake"]);
    }

    #[tokio::test]
    async fn test_launch_and_shutdown() {
        let server = Arc::new(FakeServer::default());
        let worker = Arc::new(CountingWorker::default());
        let spec = ServiceApplication::new("app")
            .with_handler(server.clone())
            .with_worker(worker.clone())
            .configure()
            .unwrap();

        let discovery = DiscoveryService::new();
        let shutdown = ShutdownSignal::new();
        let mut deployment = spec
            .launch(&Configuration::default(), &discovery, &shutdown)
            .await
            .unwrap();

        assert!(deployment.probe());
        assert_eq!(discovery.discover("fake").len(), 1);

        deployment.shutdown().await;
        assert!(!deployment.probe());
        assert!(discovery.discover("fake").is_empty());
        assert_eq!(worker.runs.load(Ordering::SeqCst), 1);
        assert!(worker.stopped.load(Ordering::SeqCst));
    }
}
