use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::connection::handle_connection;

/// Accepted connections waiting in the handoff. Full means the accept loop stalls.
const HANDOFF_CAPACITY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Graceful,
    /// The grace period ran out with handlers still running.
    TimedOut { in_flight: usize },
}

/// Held by every spawned connection task. Once all guards (and the dispatch
/// loop's original sender) are gone, the drain channel reports closed.
struct InFlightGuard {
    _done: mpsc::Sender<()>,
    count: Arc<AtomicUsize>,
}

impl InFlightGuard {
    fn new(done: mpsc::Sender<()>, count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self { _done: done, count }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct HttpServer {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    dispatch_task: JoinHandle<()>,
    drained_rx: mpsc::Receiver<()>,
    in_flight: Arc<AtomicUsize>,
    grace_period: Duration,
}

impl HttpServer {
    /// Binds the listener and starts the accept and dispatch loops. Returns as
    /// soon as both are running; a bind failure is the only error.
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.address)
            .await
            .with_context(|| format!("failed to listen on address {}", config.address))?;
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, directory = ?config.directory, "server listening");

        let grace_period = config.grace_period;
        let config = Arc::new(config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handoff_tx, handoff_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (drained_tx, drained_rx) = mpsc::channel(1);
        let in_flight = Arc::new(AtomicUsize::new(0));

        let accept_task = tokio::spawn(accept_loop(listener, handoff_tx, shutdown_rx.clone()));
        let dispatch_task = tokio::spawn(dispatch_loop(
            handoff_rx,
            shutdown_rx,
            config,
            drained_tx,
            in_flight.clone(),
        ));

        Ok(Self {
            local_addr,
            shutdown_tx,
            accept_task,
            dispatch_task,
            drained_rx,
            in_flight,
            grace_period,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connection handlers currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stops accepting, closes the listener, and waits up to the grace period
    /// for running handlers. Handlers still running afterwards are left alone.
    pub async fn stop(self) -> ShutdownOutcome {
        tracing::info!("shutting down server");
        let _ = self.shutdown_tx.send(true);

        let Self {
            accept_task,
            dispatch_task,
            mut drained_rx,
            in_flight,
            grace_period,
            ..
        } = self;
        let drained = async move {
            let _ = accept_task.await;
            let _ = dispatch_task.await;
            while drained_rx.recv().await.is_some() {}
        };

        match tokio::time::timeout(grace_period, drained).await {
            Ok(()) => {
                tracing::info!("server stopped");
                ShutdownOutcome::Graceful
            }
            Err(_) => {
                let in_flight = in_flight.load(Ordering::SeqCst);
                tracing::warn!(in_flight, "timed out waiting for connections to finish");
                ShutdownOutcome::TimedOut { in_flight }
            }
        }
    }
}

async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as shutdown.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn accept_loop(
    listener: TcpListener,
    handoff: mpsc::Sender<(TcpStream, SocketAddr)>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown) => break,
            result = listener.accept() => result,
        };

        match accepted {
            Ok(conn) => {
                tokio::select! {
                    biased;
                    _ = shutdown_signalled(&mut shutdown) => break,
                    sent = handoff.send(conn) => if sent.is_err() { break },
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "accept failed");
                continue;
            }
        }
    }
    drop(listener);
    tracing::debug!("accept loop exited, listener closed");
}

async fn dispatch_loop(
    mut handoff: mpsc::Receiver<(TcpStream, SocketAddr)>,
    mut shutdown: watch::Receiver<bool>,
    config: Arc<ServerConfig>,
    drained: mpsc::Sender<()>,
    in_flight: Arc<AtomicUsize>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown_signalled(&mut shutdown) => break,
            next = handoff.recv() => {
                let Some((conn, addr)) = next else { break };
                let config = config.clone();
                let guard = InFlightGuard::new(drained.clone(), in_flight.clone());
                tokio::spawn(async move {
                    let _guard = guard;
                    handle_connection(conn, addr, &config).await;
                });
            }
        }
    }
    tracing::debug!("dispatch loop exited");
}
