//! Observer server startup helper for embedding in the engine binary.
//!
//! Provides [`spawn_observer`] which launches the Observer HTTP + `WebSocket`
//! server on a background Tokio task, so the API runs concurrently with the
//! tick loop.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bedgrid_observer::startup::spawn_observer;
//! use bedgrid_observer::state::AppState;
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::with_operator(hub, operator));
//! let handle = spawn_observer(&config.observer, state)?;
//! ```

use std::sync::Arc;

use bedgrid_core::config::ObserverConfig;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// Returns a [`JoinHandle`] so the caller can manage the server's
/// lifecycle alongside the tick loop. The server keeps serving the last
/// published snapshot after the loop ends.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address does not
/// parse. This is checked before the background task is spawned; a bind
/// failure inside the task is logged.
pub fn spawn_observer(
    config: &ObserverConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let config = ServerConfig::from(config);
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}
