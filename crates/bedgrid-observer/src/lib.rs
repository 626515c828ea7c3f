//! Observer API server for the `BedGrid` simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/ticks`) for real-time tick streaming
//!   via [`tokio::sync::broadcast`]
//! - **REST endpoints** for live hospital state, national and regional
//!   history, synthetic back-history, transfer recommendations, and the
//!   public ranking
//! - **Control endpoints** for the incident flag and nodal override
//! - **Operator endpoints** for pause, resume, tick window, and stop
//! - **Minimal HTML page** (`GET /`) showing the current tick and
//!   national occupancy
//!
//! # Architecture
//!
//! Every read is served from the hub's newest immutable snapshot, so the
//! observer never blocks the tick loop. The broadcast channel is attached
//! to the hub as an ordinary subscriber; `WebSocket` clients read from it
//! with automatic lag handling.

pub mod control;
pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_observer};
pub use state::{AppState, TickBroadcast};
