//! Liveness/readiness endpoints for external process supervisors.
//!
//! The server shares no state with the agent loop. During `goal-agent run`
//! it is served from a background thread with its own runtime.

use std::future::Future;
use std::net::SocketAddr;
use std::thread;

use anyhow::{Context, Result};
use axum::Router;
use axum::response::Json;
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Serialize)]
struct Probe {
    status: &'static str,
}

/// Build the probe router.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}

/// GET /health - process is up.
async fn health() -> Json<Probe> {
    Json(Probe { status: "alive" })
}

/// GET /ready - process accepts work.
async fn ready() -> Json<Probe> {
    Json(Probe { status: "ready" })
}

/// Parse `bind:port` into a socket address.
pub fn socket_addr(bind: &str, port: u16) -> Result<SocketAddr> {
    format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid health address {bind}:{port}"))
}

/// Serve the probe routes on `addr` until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind health endpoints on {addr}"))?;
    info!(%addr, "health endpoints listening");
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await
        .context("serve health endpoints")
}

/// Resolve once `signal` fires. A signal that cannot be installed is logged
/// and resolves immediately.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!(error = %err, "cannot listen for shutdown signal, stopping health endpoints");
    }
}

/// Serve the probe routes on a detached background thread.
///
/// Failures after the thread starts (e.g. the port is taken) are logged and
/// do not affect the caller.
pub fn spawn_background(addr: SocketAddr) -> Result<thread::JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("build health runtime")?;
    thread::Builder::new()
        .name("health".to_string())
        .spawn(move || {
            if let Err(err) = runtime.block_on(serve(addr, std::future::pending())) {
                warn!(error = %format!("{err:#}"), "health endpoints stopped");
            }
        })
        .context("spawn health thread")
}
