//! Error types for the engine binary.
//!
//! [`AppError`] is the top-level error type that wraps all possible
//! failure modes during startup and the run.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: bedgrid_core::ConfigError,
    },

    /// Catalog loading or engine construction failed.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: bedgrid_core::EngineError,
    },

    /// The tick loop task failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: bedgrid_core::RunnerError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: bedgrid_observer::StartupError,
    },

    /// Installing the Ctrl-C handler failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
