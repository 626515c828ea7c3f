//! Tick loop runner with operator controls.
//!
//! This module provides [`run_engine`], the async loop that drives a
//! bootstrapped [`Engine`] with support for:
//!
//! - **Jittered schedule**: each delay is drawn uniformly from the
//!   operator's `[min_interval_ms, max_interval_ms]` window
//! - **Bounded runs**: stop after `max_ticks` live ticks
//! - **Pause/resume**: operator can halt and continue the loop
//! - **Clean shutdown**: the inter-tick sleep races the stop notification
//!
//! [`spawn`] wraps the whole lifecycle (bootstrap, then the loop) in a
//! Tokio task and returns a [`RunningEngine`] handle.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::{Engine, TickSummary};
use crate::hub::SubscriptionHub;
use crate::operator::{OperatorState, SimulationEndReason};

/// Errors that can occur while running the loop.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The loop task panicked or was cancelled.
    #[error("engine task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Result of a run.
#[derive(Debug)]
pub struct RunResult {
    /// The reason the loop ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any live tick completed.
    pub final_summary: Option<TickSummary>,
    /// Live ticks executed (bootstrap excluded).
    pub live_ticks: u64,
}

/// Drive `engine` until the operator stops it or `max_ticks` is reached.
///
/// The engine should already be bootstrapped. Delays are drawn from
/// `jitter`, which is kept apart from the engine's own random source so the
/// simulated trajectory does not depend on the schedule.
pub async fn run_engine<R: RngCore>(
    engine: &mut Engine<R>,
    operator: &Arc<OperatorState>,
    jitter: &mut StdRng,
) -> RunResult {
    let mut last_summary: Option<TickSummary> = None;
    let mut live_ticks: u64 = 0;

    let (min_ms, max_ms) = operator.interval_window();
    info!(
        max_ticks = operator.max_ticks(),
        min_interval_ms = min_ms,
        max_interval_ms = max_ms,
        "Tick loop starting"
    );

    loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Tick loop paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!("Tick loop resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            return finish(operator, SimulationEndReason::OperatorStop, last_summary, live_ticks).await;
        }

        // --- Execute tick and publish ---
        let summary = engine.step();
        live_ticks = live_ticks.saturating_add(1);

        // --- Check tick limit (after tick) ---
        if operator.tick_limit_reached(live_ticks) {
            info!(
                tick = summary.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            return finish(operator, SimulationEndReason::MaxTicksReached, Some(summary), live_ticks).await;
        }
        last_summary = Some(summary);

        // --- Jittered sleep, cut short by a stop ---
        let delay = next_delay(operator, jitter);
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = operator.stopped() => {}
        }
    }
}

/// Draw the next inter-tick delay from the operator's current window.
pub fn next_delay<R: Rng + ?Sized>(operator: &OperatorState, rng: &mut R) -> std::time::Duration {
    let (min_ms, max_ms) = operator.interval_window();
    let ms = if min_ms < max_ms {
        rng.random_range(min_ms..=max_ms)
    } else {
        min_ms
    };
    std::time::Duration::from_millis(ms)
}

async fn finish(
    operator: &OperatorState,
    reason: SimulationEndReason,
    final_summary: Option<TickSummary>,
    live_ticks: u64,
) -> RunResult {
    operator.set_end_reason(reason).await;
    RunResult {
        end_reason: reason,
        final_summary,
        live_ticks,
    }
}

/// Log the end of a run.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        live_ticks = result.live_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Tick loop ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            avg_occupancy_pct = summary.point.avg_occupancy_pct,
            critical = summary.point.critical_hospital_count,
            "Final tick summary"
        );
    } else {
        warn!("Tick loop ended with no live ticks executed");
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

/// Handle to an engine running on a Tokio task.
#[derive(Debug)]
pub struct RunningEngine {
    hub: Arc<SubscriptionHub>,
    operator: Arc<OperatorState>,
    task: JoinHandle<RunResult>,
}

impl RunningEngine {
    /// The hub of the running engine.
    pub const fn hub(&self) -> &Arc<SubscriptionHub> {
        &self.hub
    }

    /// The shared operator controls.
    pub const fn operator(&self) -> &Arc<OperatorState> {
        &self.operator
    }

    /// Request a stop and wait for the loop to finish.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Join`] if the loop task panicked.
    pub async fn stop(self) -> Result<RunResult, RunnerError> {
        self.operator.request_stop();
        self.join().await
    }

    /// Wait for the loop to finish on its own.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Join`] if the loop task panicked.
    pub async fn join(self) -> Result<RunResult, RunnerError> {
        Ok(self.task.await?)
    }
}

/// Bootstrap `engine` and run it on a new Tokio task.
///
/// Bootstrap happens before this returns, so the hub is ready and holds a
/// snapshot by the time the caller sees it.
pub fn spawn(mut engine: Engine, operator: Arc<OperatorState>, jitter_seed: u64) -> RunningEngine {
    engine.bootstrap();
    let hub = Arc::clone(engine.hub());
    let loop_operator = Arc::clone(&operator);
    let task = tokio::spawn(async move {
        let mut jitter = StdRng::seed_from_u64(jitter_seed);
        let result = run_engine(&mut engine, &loop_operator, &mut jitter).await;
        log_run_end(&result);
        result
    });
    RunningEngine {
        hub,
        operator,
        task,
    }
}
