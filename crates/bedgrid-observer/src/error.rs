//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bedgrid_core::ControlError;
use bedgrid_core::operator::IntervalError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An invalid query parameter was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A control inlet refused the input.
    #[error(transparent)]
    Rejected(#[from] ControlError),

    /// The operator refused a new tick window.
    #[error(transparent)]
    Interval(#[from] IntervalError),

    /// The engine has not bootstrapped or no tick loop is attached.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidQuery(_) | Self::Rejected(_) | Self::Interval(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let message = match &self {
            Self::NotFound(msg) | Self::InvalidQuery(msg) | Self::Unavailable(msg) => msg.clone(),
            Self::Rejected(e) => e.to_string(),
            Self::Interval(e) => e.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
