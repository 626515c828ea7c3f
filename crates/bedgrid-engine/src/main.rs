//! Engine binary for the `BedGrid` simulation.
//!
//! This is the main entry point that wires together the catalog, the
//! engine, the tick loop, operator controls, and the Observer API. It
//! loads configuration, bootstraps the network, and runs the loop until
//! the tick limit is reached, an operator stops it, or Ctrl-C arrives.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `bedgrid-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the engine from the catalog and dynamics profile
//! 4. Create operator state from the engine bounds
//! 5. Bootstrap and spawn the tick loop
//! 6. Start the Observer API server
//! 7. Wait for the loop to end or Ctrl-C
//! 8. Log the result

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use bedgrid_core::config::LoggingConfig;
use bedgrid_core::{Engine, OperatorState, SimulationConfig, runner};
use bedgrid_observer::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "bedgrid-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the tick loop fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("bedgrid-engine starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        seed = config.engine.seed,
        bootstrap_ticks = config.engine.bootstrap_ticks,
        history_len = config.engine.history_len,
        profile = ?config.dynamics.profile,
        "Engine configuration"
    );

    // 3. Build the engine.
    let engine = Engine::from_config(&config)?;

    // 4. Create operator state.
    let operator = Arc::new(OperatorState::new(&config.engine));
    let (min_ms, max_ms) = operator.interval_window();
    info!(
        max_ticks = operator.max_ticks(),
        min_interval_ms = min_ms,
        max_interval_ms = max_ms,
        "Operator state initialized"
    );

    // 5. Bootstrap and spawn the tick loop. The jitter stream is derived
    //    from the seed but kept apart from the engine's own.
    let jitter_seed = config.engine.seed.rotate_left(17) ^ 0x9E37_79B9_7F4A_7C15;
    let running = runner::spawn(engine, Arc::clone(&operator), jitter_seed);
    let hub = Arc::clone(running.hub());

    // 6. Start the Observer API server.
    let observer_handle = if config.observer.enabled {
        let app_state = Arc::new(AppState::with_operator(Arc::clone(&hub), Arc::clone(&operator)));
        let handle = bedgrid_observer::spawn_observer(&config.observer, app_state)?;
        info!(
            host = %config.observer.host,
            port = config.observer.port,
            "Observer API server started"
        );
        Some(handle)
    } else {
        info!("Observer API server disabled");
        None
    };

    // 7. Wait for the loop to end, or stop it on Ctrl-C.
    let join = running.join();
    tokio::pin!(join);
    let mut interrupted = false;
    let result = tokio::select! {
        result = &mut join => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Ctrl-C received, stopping tick loop");
            interrupted = true;
            operator.request_stop();
            join.await?
        }
    };

    // 8. Log results.
    runner::log_run_end(&result);

    if let Some(handle) = observer_handle {
        if !interrupted {
            info!("Tick loop finished; observer keeps serving the last snapshot until Ctrl-C");
            tokio::signal::ctrl_c().await?;
        }
        handle.abort();
    }

    info!(
        end_reason = ?result.end_reason,
        live_ticks = result.live_ticks,
        subscriber_faults = hub.fault_count(),
        "bedgrid-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `BEDGRID_CONFIG` or `bedgrid-config.yaml`.
///
/// Returns the path that was read, or `None` when no file exists and the
/// defaults (plus environment overrides) are used.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), AppError> {
    let path = std::env::var_os("BEDGRID_CONFIG")
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok((config, None))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
