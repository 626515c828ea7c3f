//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{control, handlers, operator, ws};

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/ticks` -- `WebSocket` tick stream
/// - `GET /api/status`, `/api/history`, `/api/regions`
/// - `GET /api/hospitals`, `/api/hospitals/{id}`, `/api/hospitals/{id}/history`
/// - `GET /api/recommendations`, `/api/rankings`
/// - `GET|POST|DELETE /api/control/incident`, `/api/control/override`
/// - `/api/operator/*` -- pause, resume, interval, status, stop
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/ticks", get(ws::ws_ticks))
        // REST API
        .route("/api/status", get(handlers::get_status))
        .route("/api/hospitals", get(handlers::list_hospitals))
        .route("/api/hospitals/{id}", get(handlers::get_hospital))
        .route("/api/hospitals/{id}/history", get(handlers::get_hospital_history))
        .route("/api/history", get(handlers::get_history))
        .route("/api/regions", get(handlers::get_regions))
        .route("/api/recommendations", get(handlers::get_recommendations))
        .route("/api/rankings", get(handlers::get_rankings))
        // Control inlets
        .route(
            "/api/control/incident",
            get(control::get_incident)
                .post(control::set_incident)
                .delete(control::clear_incident),
        )
        .route(
            "/api/control/override",
            get(control::get_override)
                .post(control::set_override)
                .delete(control::clear_override),
        )
        // Operator
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/interval", post(operator::set_interval))
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/stop", post(operator::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
