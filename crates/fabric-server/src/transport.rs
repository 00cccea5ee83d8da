//! RPC transport server
//!
//! [`DatasetOpExecutorService`] binds its listener in `configure`, runs the
//! actix server on a dedicated thread with its own actix system in `start`,
//! and tears it down in `stop`. The lifecycle is
//! `STOPPED → CONFIGURED → SERVING → STOPPED`.

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpServer, web};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use fabric_common::{Configuration, DATASET_EXECUTOR_SERVICE};
use fabric_dataset::DatasetOpExecutor;
use fabric_discovery::ServicePayload;
use fabric_discovery::model::THREADS_METADATA_KEY;

use crate::error::{Result, ServerError};
use crate::handler;

/// What a configured server reports for announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerBinding {
    pub port: u16,
    pub payload: ServicePayload,
}

/// A server that is announced through service discovery while it runs
#[async_trait]
pub trait RegisteredServer: Send + Sync {
    /// Discovery name the server is announced under
    fn service_name(&self) -> &str;

    /// Bind resources and report the chosen port plus announcement metadata.
    ///
    /// A bind failure is fatal: the server is stopped and the error returned.
    async fn configure(&self, configuration: &Configuration) -> Result<ServerBinding>;

    /// Start serving on dedicated execution.
    ///
    /// Returns once the server accepts requests; the caller's runtime is never
    /// blocked while it comes up.
    async fn start(&self) -> Result<()>;

    /// Release everything. Idempotent, and safe before `configure`.
    async fn stop(&self);

    /// Whether the server exists and is accepting requests
    fn probe(&self) -> bool;
}

#[derive(Default)]
struct TransportState {
    listener: Option<TcpListener>,
    threads: usize,
    handle: Option<ServerHandle>,
    thread: Option<JoinHandle<()>>,
    starting: bool,
    /// Bumped by every `stop`, so a start that raced a stop can tell
    generation: u64,
}

/// HTTP transport exposing a [`DatasetOpExecutor`] to remote clients
pub struct DatasetOpExecutorService {
    executor: Arc<dyn DatasetOpExecutor>,
    state: Mutex<TransportState>,
    serving: Arc<AtomicBool>,
}

impl DatasetOpExecutorService {
    pub fn new(executor: Arc<dyn DatasetOpExecutor>) -> Self {
        Self {
            executor,
            state: Mutex::new(TransportState::default()),
            serving: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn join_server_thread(&self, thread: JoinHandle<()>) {
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => {}
            _ => warn!(service = %self.service_name(), "Server thread did not exit cleanly"),
        }
    }
}

#[async_trait]
impl RegisteredServer for DatasetOpExecutorService {
    fn service_name(&self) -> &str {
        DATASET_EXECUTOR_SERVICE
    }

    async fn configure(&self, configuration: &Configuration) -> Result<ServerBinding> {
        let address = configuration.executor_address();
        let port = configuration.executor_port();
        let threads = configuration.executor_threads();

        if self.state.lock().handle.is_some() {
            return Err(ServerError::AlreadyRunning(self.service_name().to_string()));
        }

        let bound = TcpListener::bind((address.as_str(), port)).and_then(|listener| {
            listener.set_nonblocking(true)?;
            let port = listener.local_addr()?.port();
            Ok((listener, port))
        });

        let (listener, port) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                error!(
                    service = %self.service_name(),
                    address = %address,
                    port = port,
                    error = %source,
                    "Failed to bind, stopping"
                );
                self.stop().await;
                return Err(ServerError::Bind {
                    address: format!("{}:{}", address, port),
                    source,
                });
            }
        };

        {
            let mut state = self.state.lock();
            state.listener = Some(listener);
            state.threads = threads;
        }

        info!(
            service = %self.service_name(),
            address = %address,
            port = port,
            threads = threads,
            "Dataset executor service configured"
        );

        let mut payload = ServicePayload::new();
        payload.add(THREADS_METADATA_KEY, threads);
        Ok(ServerBinding { port, payload })
    }

    async fn start(&self) -> Result<()> {
        let name = self.service_name().to_string();
        let (listener, threads, generation) = {
            let mut state = self.state.lock();
            if state.handle.is_some() || state.starting {
                return Err(ServerError::AlreadyRunning(name));
            }
            let listener = state
                .listener
                .take()
                .ok_or_else(|| ServerError::NotConfigured(name.clone()))?;
            state.starting = true;
            (listener, state.threads, state.generation)
        };

        let executor = self.executor.clone();
        let serving = self.serving.clone();
        let (handle_tx, handle_rx) = oneshot::channel();

        let spawned = std::thread::Builder::new()
            .name(format!("{}-http", name))
            .spawn(move || {
                let system = actix_rt::System::new();
                system.block_on(async move {
                    let server = HttpServer::new(move || {
                        App::new()
                            .app_data(web::Data::new(executor.clone()))
                            .service(handler::admin_routes())
                            .service(handler::ping)
                    })
                    .workers(threads)
                    .disable_signals()
                    .listen(listener);

                    let server = match server {
                        Ok(server) => server.run(),
                        Err(e) => {
                            let _ = handle_tx.send(Err(e));
                            return;
                        }
                    };

                    serving.store(true, Ordering::Release);
                    let _ = handle_tx.send(Ok(server.handle()));

                    if let Err(e) = server.await {
                        error!(error = %e, "Dataset executor service terminated with error");
                    }
                    serving.store(false, Ordering::Release);
                });
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                self.state.lock().starting = false;
                return Err(e.into());
            }
        };

        let started = handle_rx.await;

        let stale = {
            let mut state = self.state.lock();
            state.starting = false;
            match started {
                Ok(Ok(handle)) if state.generation == generation => {
                    state.handle = Some(handle);
                    state.thread = Some(thread);
                    Ok(None)
                }
                Ok(Ok(handle)) => Ok(Some((handle, thread))),
                Ok(Err(e)) => Err((thread, e.to_string())),
                Err(_) => Err((thread, "server thread exited before serving".to_string())),
            }
        };

        match stale {
            Ok(None) => {}
            Ok(Some((handle, thread))) => {
                handle.stop(false).await;
                self.join_server_thread(thread).await;
                self.serving.store(false, Ordering::Release);
                warn!(service = %name, "Stop requested while starting, server shut down");
                return Err(ServerError::Start {
                    name,
                    message: "stopped while starting".to_string(),
                });
            }
            Err((thread, message)) => {
                self.join_server_thread(thread).await;
                return Err(ServerError::Start { name, message });
            }
        }

        info!(service = %name, "Dataset executor service started");
        Ok(())
    }

    async fn stop(&self) {
        let (handle, thread) = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.listener = None;
            (state.handle.take(), state.thread.take())
        };

        if let Some(handle) = handle {
            handle.stop(false).await;
            info!(service = %self.service_name(), "Dataset executor service stopped");
        }

        if let Some(thread) = thread {
            self.join_server_thread(thread).await;
        }

        self.serving.store(false, Ordering::Release);
    }

    fn probe(&self) -> bool {
        self.state.lock().handle.is_some() && self.serving.load(Ordering::Acquire)
    }
}
