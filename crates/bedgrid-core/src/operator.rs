//! Operator control state for runtime simulation management.
//!
//! This module provides shared atomic state used by the tick loop and the
//! operator REST API. The operator can pause/resume, change the jittered
//! tick window, and trigger a clean shutdown -- all without stopping the
//! process.
//!
//! # Architecture
//!
//! All mutable control fields use [`std::sync::atomic`] types so they can
//! be shared between the tick loop task and the Axum handler tasks without
//! locks on the hot path. Pause and stop each carry a [`Notify`] so the
//! loop wakes immediately instead of polling.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::{EngineConfig, MIN_TICK_INTERVAL_MS};

/// Reason why the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// Why a new jitter window was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    /// The lower bound is under the floor.
    #[error("min_interval_ms must be at least {MIN_TICK_INTERVAL_MS}, got {min_ms}")]
    TooShort {
        /// Requested lower bound.
        min_ms: u64,
    },
    /// The lower bound exceeds the upper bound.
    #[error("min_interval_ms ({min_ms}) exceeds max_interval_ms ({max_ms})")]
    Inverted {
        /// Requested lower bound.
        min_ms: u64,
        /// Requested upper bound.
        max_ms: u64,
    },
}

/// Shared operator control state.
///
/// This struct is wrapped in [`std::sync::Arc`] and shared between the tick
/// loop and operator API handlers.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the tick loop is currently paused.
    paused: AtomicBool,

    /// Notification used to wake the tick loop when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Notification used to cut short the inter-tick sleep on stop.
    stop_notify: Notify,

    /// Lower bound of the inter-tick delay.
    min_interval_ms: AtomicU64,

    /// Upper bound of the inter-tick delay.
    max_interval_ms: AtomicU64,

    /// Wall-clock time when the loop was created.
    started_at: DateTime<Utc>,

    /// Maximum number of live ticks (0 = unlimited).
    max_ticks: u64,

    /// Reason the loop ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create a new operator state from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            min_interval_ms: AtomicU64::new(config.min_interval_ms),
            max_interval_ms: AtomicU64::new(config.max_interval_ms),
            started_at: Utc::now(),
            max_ticks: config.max_ticks,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the tick loop is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the tick loop. It will sleep until resumed or stopped.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the tick loop and wake it.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the loop is no longer paused.
    ///
    /// Returns immediately if not paused. A stop request also ends the
    /// wait so a paused loop can shut down.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            tokio::select! {
                () = self.resume_notify.notified() => {}
                () = self.stop_notify.notified() => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop and wake any pending sleep.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
        self.stop_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolves once a stop is requested.
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.stop_notify.notified().await;
        }
    }

    /// Record the reason the loop ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the loop ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick window
    // -----------------------------------------------------------------------

    /// Current `(min, max)` inter-tick delay in milliseconds.
    pub fn interval_window(&self) -> (u64, u64) {
        (
            self.min_interval_ms.load(Ordering::Acquire),
            self.max_interval_ms.load(Ordering::Acquire),
        )
    }

    /// Replace the jitter window.
    ///
    /// Returns the previous window on success.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError`] when `min_ms` is under the floor or above
    /// `max_ms`; the window is left unchanged.
    pub fn set_interval_window(&self, min_ms: u64, max_ms: u64) -> Result<(u64, u64), IntervalError> {
        if min_ms < MIN_TICK_INTERVAL_MS {
            return Err(IntervalError::TooShort { min_ms });
        }
        if min_ms > max_ms {
            return Err(IntervalError::Inverted { min_ms, max_ms });
        }
        let prev_min = self.min_interval_ms.swap(min_ms, Ordering::AcqRel);
        let prev_max = self.max_interval_ms.swap(max_ms, Ordering::AcqRel);
        Ok((prev_min, prev_max))
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Check whether the tick limit has been reached.
    ///
    /// Returns `true` if `max_ticks > 0` and `live_ticks >= max_ticks`.
    pub const fn tick_limit_reached(&self, live_ticks: u64) -> bool {
        self.max_ticks > 0 && live_ticks >= self.max_ticks
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured max ticks.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Collect a serializable status report.
    pub async fn status(&self, tick: u64) -> OperatorStatus {
        let (min_interval_ms, max_interval_ms) = self.interval_window();
        OperatorStatus {
            tick,
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            min_interval_ms,
            max_interval_ms,
            elapsed_seconds: self.elapsed_seconds(),
            max_ticks: self.max_ticks,
            end_reason: self.end_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON-serializable status of the tick loop for the operator API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStatus {
    /// Current tick number.
    pub tick: u64,
    /// Whether the loop is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Lower bound of the inter-tick delay.
    pub min_interval_ms: u64,
    /// Upper bound of the inter-tick delay.
    pub max_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured maximum live ticks (0 = unlimited).
    pub max_ticks: u64,
    /// The reason the loop ended, if applicable.
    pub end_reason: Option<SimulationEndReason>,
    /// ISO 8601 timestamp of when the loop started.
    pub started_at: String,
}
