//! Stub server lifecycle.
//!
//! [`StubServer::spawn`] binds an ephemeral loopback port and serves in a
//! background task that is aborted when the handle drops; tests use it.
//! [`start_server`] serves on a fixed address until the process ends; the
//! `stellar-ads-stub` binary uses it.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::router::build_router;
use crate::state::StubState;

/// Address configuration for [`start_server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 3000,
        }
    }
}

/// A stub backend running in the background.
#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubServer {
    /// Serve `state` on `127.0.0.1` with an OS-assigned port.
    pub async fn spawn(state: Arc<StubState>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| ServerError::Bind(format!("bind failed on loopback: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

        let router = build_router(Arc::clone(&state));
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "stub server stopped");
            }
        });

        info!(%addr, "stub backend listening");
        Ok(Self { addr, state, task })
    }

    /// Base URL to point a client at, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bound socket address.
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The state behind the server, for scripting and assertions.
    pub fn state(&self) -> &StubState {
        &self.state
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serve `state` on the configured address until the process exits.
pub async fn start_server(config: &ServerConfig, state: Arc<StubState>) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "stub backend listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    Ok(())
}

/// Errors raised while starting or running the stub server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server hit a fatal I/O error.
    #[error("serve error: {0}")]
    Serve(String),
}
