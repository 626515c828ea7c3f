//! Control inlet handlers: incident flag and nodal override.
//!
//! Writes are staged in the hub and take effect at the start of the next
//! tick. Rejected input comes back as `400` with a JSON error body and
//! leaves the staged state untouched.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/control/incident` | Staged incident flag |
//! | `POST` | `/api/control/incident` | Raise an incident |
//! | `DELETE` | `/api/control/incident` | Clear the incident |
//! | `GET` | `/api/control/override` | Staged nodal override |
//! | `POST` | `/api/control/override` | Impose an override |
//! | `DELETE` | `/api/control/override` | Withdraw the override |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use bedgrid_types::{HospitalId, IncidentState, NodalOverride};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::ObserverError;
use crate::state::AppState;

/// Request body for `POST /api/control/override`.
///
/// Exactly one of `active_until` and `active_for_minutes` sets the expiry.
#[derive(Debug, serde::Deserialize)]
pub struct OverrideRequest {
    /// Target hospital.
    pub hospital_id: HospitalId,
    /// Replacement general-ward bed count.
    pub total_beds: u32,
    /// Replacement ICU bed count.
    pub total_icu_beds: u32,
    /// Replacement oxygen stock, in days.
    pub oxygen_supply_days: f64,
    /// Absolute expiry.
    pub active_until: Option<DateTime<Utc>>,
    /// Expiry relative to now.
    pub active_for_minutes: Option<i64>,
}

impl OverrideRequest {
    fn resolve(self, now: DateTime<Utc>) -> Result<NodalOverride, ObserverError> {
        let active_until = match (self.active_until, self.active_for_minutes) {
            (Some(at), None) => at,
            (None, Some(minutes)) => Duration::try_minutes(minutes)
                .and_then(|d| now.checked_add_signed(d))
                .ok_or_else(|| {
                    ObserverError::InvalidQuery(format!("active_for_minutes out of range: {minutes}"))
                })?,
            _ => {
                return Err(ObserverError::InvalidQuery(
                    "give exactly one of active_until or active_for_minutes".to_owned(),
                ));
            }
        };
        Ok(NodalOverride {
            hospital_id: self.hospital_id,
            total_beds: self.total_beds,
            total_icu_beds: self.total_icu_beds,
            oxygen_supply_days: self.oxygen_supply_days,
            active_until,
        })
    }
}

/// Staged override plus whether it is still honored.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OverrideStatus {
    /// The staged override, if any.
    pub nodal_override: Option<NodalOverride>,
    /// Whether the override is honored at the hub's current time.
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Incident
// ---------------------------------------------------------------------------

/// Return the staged incident flag.
pub async fn get_incident(State(state): State<Arc<AppState>>) -> Json<IncidentState> {
    Json(state.hub.incident_state())
}

/// Stage a new incident flag.
pub async fn set_incident(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IncidentState>,
) -> Result<Json<IncidentState>, ObserverError> {
    state.hub.set_incident_state(body)?;
    Ok(Json(body))
}

/// Clear the incident flag.
pub async fn clear_incident(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IncidentState>, ObserverError> {
    let cleared = IncidentState::default();
    state.hub.set_incident_state(cleared)?;
    Ok(Json(cleared))
}

// ---------------------------------------------------------------------------
// Nodal override
// ---------------------------------------------------------------------------

fn override_status(state: &AppState) -> OverrideStatus {
    let nodal_override = state.hub.nodal_override();
    let now = state.hub.now();
    let active = nodal_override
        .as_ref()
        .is_some_and(|o| o.applies_to(o.hospital_id, now));
    OverrideStatus {
        nodal_override,
        active,
    }
}

/// Return the staged override.
pub async fn get_override(State(state): State<Arc<AppState>>) -> Json<OverrideStatus> {
    Json(override_status(&state))
}

/// Stage a nodal override.
pub async fn set_override(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OverrideRequest>,
) -> Result<Json<OverrideStatus>, ObserverError> {
    let nodal_override = body.resolve(state.hub.now()).inspect_err(|e| {
        debug!(error = %e, "Override request has no usable expiry");
    })?;
    state.hub.set_nodal_override(Some(nodal_override))?;
    Ok(Json(override_status(&state)))
}

/// Withdraw the staged override.
pub async fn clear_override(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OverrideStatus>, ObserverError> {
    state.hub.set_nodal_override(None)?;
    Ok(Json(override_status(&state)))
}
