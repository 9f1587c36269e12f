//! Main network handler

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::{wait_stopped, SimulationEngine};
use crate::Result;

use super::connection_pool::{ConnectionGuard, ConnectionPool};
use super::HttpHandler;

/// Accepts connections and serves the simulation endpoints
pub struct NetworkHandler {
    config: Arc<Config>,
    engine: Arc<SimulationEngine>,
    connection_pool: ConnectionPool,
    shutdown_tx: broadcast::Sender<()>,
    stopped_tx: watch::Sender<bool>,
}

impl NetworkHandler {
    /// Create a new network handler
    #[must_use]
    pub fn new(config: Config) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (stopped_tx, stopped_rx) = watch::channel(false);
        let engine = SimulationEngine::from_config(&config.simulation, stopped_rx);

        Self {
            connection_pool: ConnectionPool::new(config.limits.max_connections),
            config: Arc::new(config),
            engine: Arc::new(engine),
            shutdown_tx,
            stopped_tx,
        }
    }

    /// Sender that stops the server when a value is sent
    #[must_use]
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Bind the configured address and serve until shutdown
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or cannot be bound
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until shutdown
    ///
    /// # Errors
    ///
    /// Returns error if the listener's address cannot be read
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let Some(guard) = self.connection_pool.try_acquire() else {
                                warn!("Connection limit reached, rejecting {}", peer_addr);
                                drop(stream);
                                continue;
                            };

                            connections.spawn(Self::serve_connection(
                                stream,
                                peer_addr,
                                guard,
                                Arc::clone(&self.engine),
                                self.stopped_tx.subscribe(),
                            ));
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                Some(result) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = result {
                        warn!("Connection task failed: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, shutting down");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        drop(listener);

        // Latched, so requests that start waiting after this fail at once.
        self.stopped_tx.send_replace(true);

        info!(
            "Draining {} active connections",
            self.connection_pool.active_connections()
        );

        let shutdown_timeout = Duration::from_millis(self.config.limits.shutdown_timeout_ms);
        let drained = tokio::time::timeout(shutdown_timeout, async {
            while let Some(result) = connections.join_next().await {
                if let Err(e) = result {
                    warn!("Task cleanup error: {}", e);
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Shutdown timeout elapsed, aborting remaining connections");
            connections.shutdown().await;
        }

        info!("Shutdown complete");
        Ok(())
    }

    async fn serve_connection(
        stream: TcpStream,
        peer_addr: SocketAddr,
        _guard: ConnectionGuard,
        engine: Arc<SimulationEngine>,
        stopped: watch::Receiver<bool>,
    ) {
        debug!("Accepted connection from {}", peer_addr);

        let service = service_fn(move |request| {
            let engine = Arc::clone(&engine);
            async move { Ok::<_, Infallible>(HttpHandler::handle(&engine, request).await) }
        });

        let builder = auto::Builder::new(TokioExecutor::new());
        let connection = builder.serve_connection(TokioIo::new(stream), service);
        tokio::pin!(connection);

        let result = tokio::select! {
            result = connection.as_mut() => result,
            () = wait_stopped(stopped) => {
                connection.as_mut().graceful_shutdown();
                connection.await
            }
        };

        if let Err(e) = result {
            debug!("Connection from {} closed with error: {}", peer_addr, e);
        }
    }

    /// Whether shutdown has begun
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.stopped_tx.borrow()
    }

    /// Connection pool shared by all accepted connections
    #[must_use]
    pub fn connection_pool(&self) -> &ConnectionPool {
        &self.connection_pool
    }
}
