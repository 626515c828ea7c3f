//! Operator REST API handlers for runtime tick-loop control.
//!
//! These endpoints are separate from the read-only API and from the
//! control inlets. They steer the scheduler, never the simulated state.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause the tick loop |
//! | `POST` | `/api/operator/resume` | Resume the tick loop |
//! | `POST` | `/api/operator/interval` | Set the jitter window (ms) |
//! | `GET` | `/api/operator/status` | Current loop status |
//! | `POST` | `/api/operator/stop` | Stop the tick loop |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use bedgrid_core::OperatorState;
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/interval`.
#[derive(Debug, serde::Deserialize)]
pub struct SetIntervalRequest {
    /// Shortest delay between ticks (minimum 100).
    pub min_interval_ms: u64,
    /// Longest delay between ticks.
    pub max_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or_else(|| ObserverError::Unavailable("operator state not available".to_owned()))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause the tick loop. Live state and history are kept as they are.
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.pause();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Tick loop paused".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/resume
// ---------------------------------------------------------------------------

/// Resume the tick loop after a pause.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.resume();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Tick loop resumed".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/interval
// ---------------------------------------------------------------------------

/// Change the jitter window at runtime.
///
/// The new window applies from the next inter-tick sleep.
pub async fn set_interval(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetIntervalRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let (prev_min, prev_max) =
        operator(&state)?.set_interval_window(body.min_interval_ms, body.max_interval_ms)?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!(
            "Tick window changed from {prev_min}-{prev_max}ms to {}-{}ms",
            body.min_interval_ms, body.max_interval_ms
        ),
        "previous": [prev_min, prev_max],
        "current": [body.min_interval_ms, body.max_interval_ms],
    })))
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return the loop status: tick, pause and stop flags, window, end reason.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;
    let tick = state.snapshot().map_or(0, |s| s.tick);
    Ok(Json(operator.status(tick).await))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Stop the tick loop.
///
/// The loop finishes its current tick and exits; the observer keeps
/// serving the last published snapshot.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.request_stop();
    info!("Operator requested stop via API");

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Stop requested".to_owned(),
    }))
}
