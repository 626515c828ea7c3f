//! Tick engine, update rule, and distribution for the `BedGrid` simulation.
//!
//! This crate owns the stochastic capacity model: it synthesizes a live
//! operational state for every catalog hospital, evolves it on a jittered
//! schedule, aggregates rolling national and regional history, and hands
//! immutable snapshots to any number of subscribers.
//!
//! # Modules
//!
//! - [`aggregate`] -- Capacity-weighted aggregation and the history ring.
//! - [`backfill`] -- Synthetic per-hospital daily history.
//! - [`clock`] -- [`Clock`] trait with system and manual implementations.
//! - [`cohort`] -- Swappable high-strain cohort strategies.
//! - [`config`] -- Configuration loading from `bedgrid-config.yaml`.
//! - [`engine`] -- The [`Engine`]: single writer of simulation state.
//! - [`hub`] -- [`SubscriptionHub`]: subscribers and control inlets.
//! - [`operator`] -- Pause, resume, stop, and tick-window controls.
//! - [`routing`] -- Transfer recommendation and public ranking.
//! - [`runner`] -- The async tick loop and background task handle.
//! - [`store`] -- Live-state table.
//! - [`update`] -- The per-hospital update rule.
//!
//! [`Clock`]: clock::Clock
//! [`Engine`]: engine::Engine
//! [`SubscriptionHub`]: hub::SubscriptionHub

pub mod aggregate;
pub mod backfill;
pub mod clock;
pub mod cohort;
pub mod config;
pub mod engine;
pub mod hub;
pub mod operator;
pub mod routing;
pub mod runner;
pub mod store;
pub mod update;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DynamicsConfig, SimulationConfig};
pub use engine::{Engine, EngineError, TickSummary};
pub use hub::{ControlError, ControlState, Subscription, SubscriptionHub};
pub use operator::{OperatorState, OperatorStatus, SimulationEndReason};
pub use runner::{RunResult, RunnerError, RunningEngine};
