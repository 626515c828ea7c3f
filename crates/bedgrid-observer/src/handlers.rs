//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read the newest immutable snapshot from the hub via the
//! shared [`AppState`]; none of them block the tick loop.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | Tick, readiness, latest summary |
//! | `GET` | `/api/hospitals` | Profiles with live state |
//! | `GET` | `/api/hospitals/{id}` | One hospital |
//! | `GET` | `/api/hospitals/{id}/history` | Synthetic daily back-history |
//! | `GET` | `/api/history` | National history ring |
//! | `GET` | `/api/regions` | Per-region totals |
//! | `GET` | `/api/recommendations` | Transfer candidates |
//! | `GET` | `/api/rankings` | Public-portal ranking |

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use bedgrid_core::backfill::hospital_history;
use bedgrid_core::routing::{TransferQuery, rank_hospitals, recommend_transfer};
use bedgrid_types::{
    BedStatus, EngineSnapshot, GeoPoint, HistoryPoint, HospitalHistoryPoint, HospitalId,
    HospitalProfile, IncidentState, LiveState, NodalOverride, RankedHospital, Region,
    TransferCandidate,
};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::ObserverError;
use crate::state::{AppState, RegionSummary, region_summaries};

const DEFAULT_HISTORY_DAYS: u32 = 30;
const MAX_HISTORY_DAYS: u32 = 365;
const DEFAULT_RANKING_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/hospitals`.
#[derive(Debug, serde::Deserialize)]
pub struct HospitalsQuery {
    /// Only hospitals in this region.
    pub region: Option<Region>,
    /// Only hospitals currently in this status band.
    pub status: Option<BedStatus>,
}

/// Query parameters for `GET /api/hospitals/{id}/history`.
#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    /// Number of daily points (default 30, at most 365).
    pub days: Option<u32>,
}

/// Query parameters for `GET /api/recommendations`.
#[derive(Debug, serde::Deserialize)]
pub struct RecommendationsQuery {
    /// Patient latitude.
    pub lat: f64,
    /// Patient longitude.
    pub lon: f64,
    /// Critical-care patient (default false).
    #[serde(default)]
    pub critical: bool,
    /// Source hospital to leave out.
    pub exclude: Option<u32>,
    /// Restrict to one district.
    pub district: Option<String>,
    /// Traffic multiplier (default 1.0).
    pub traffic: Option<f64>,
    /// Distance cutoff override.
    pub max_distance_km: Option<f64>,
}

/// Query parameters for `GET /api/rankings`.
#[derive(Debug, serde::Deserialize)]
pub struct RankingsQuery {
    /// Caller latitude.
    pub lat: f64,
    /// Caller longitude.
    pub lon: f64,
    /// Number of results (default 5).
    pub limit: Option<usize>,
    /// Comma-separated ids of hospitals the caller marked as blocked.
    pub blocked: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Static profile plus live state of one hospital.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HospitalView {
    /// Catalog profile.
    pub profile: HospitalProfile,
    /// Live operational state.
    pub state: LiveState,
}

/// Response body for `GET /api/status`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusResponse {
    /// Tick counter, bootstrap included.
    pub tick: u64,
    /// Timestamp of the current snapshot.
    pub generated_at: DateTime<Utc>,
    /// Hospitals in the network.
    pub hospital_count: usize,
    /// Registered hub subscribers.
    pub subscribers: usize,
    /// Subscriber callbacks that have panicked so far.
    pub subscriber_faults: u64,
    /// Newest national summary.
    pub latest: Option<HistoryPoint>,
    /// Staged incident flag.
    pub incident: IncidentState,
    /// Staged nodal override, possibly lapsed.
    pub nodal_override: Option<NodalOverride>,
}

fn current(state: &AppState) -> Result<Arc<EngineSnapshot>, ObserverError> {
    state
        .snapshot()
        .ok_or_else(|| ObserverError::Unavailable("engine has not bootstrapped".to_owned()))
}

fn view(state: &AppState, live: &LiveState) -> Option<HospitalView> {
    let profile = state.hub.catalog().get(live.hospital_id)?;
    Some(HospitalView {
        profile: profile.clone(),
        state: live.clone(),
    })
}

fn parse_blocked(raw: Option<&str>) -> Result<BTreeSet<HospitalId>, ObserverError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map(HospitalId)
                .map_err(|e| ObserverError::InvalidQuery(format!("invalid hospital id {s}: {e}")))
        })
        .collect()
}

fn origin(lat: f64, lon: f64) -> Result<GeoPoint, ObserverError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ObserverError::InvalidQuery(format!(
            "coordinates out of range: {lat}, {lon}"
        )));
    }
    Ok(GeoPoint { lat, lon })
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing network status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot();
    let tick = snapshot.as_ref().map_or(0, |s| s.tick);
    let hospitals = state.hub.catalog().len();
    let latest = snapshot.as_ref().and_then(|s| s.latest().cloned());
    let occupancy = latest
        .as_ref()
        .map_or_else(|| "--".to_owned(), |p| format!("{:.1}%", p.avg_occupancy_pct));
    let critical = latest.as_ref().map_or(0, |p| p.critical_hospital_count);
    let incident = state.hub.incident_state();
    let incident_label = match (incident.is_active, incident.region) {
        (true, Some(region)) => format!("ACTIVE ({region})"),
        _ => "none".to_owned(),
    };
    let status = if state.hub.is_ready() { "RUNNING" } else { "STARTING" };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>BedGrid Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>BedGrid Observer</h1>
    <p class="subtitle">Hospital bed capacity simulation</p>

    <p>Status: <span class="status">{status}</span></p>

    <div>
        <div class="metric"><div class="label">Tick</div><div class="value">{tick}</div></div>
        <div class="metric"><div class="label">Hospitals</div><div class="value">{hospitals}</div></div>
        <div class="metric"><div class="label">Occupancy</div><div class="value">{occupancy}</div></div>
        <div class="metric"><div class="label">Critical</div><div class="value">{critical}</div></div>
        <div class="metric"><div class="label">Incident</div><div class="value">{incident_label}</div></div>
    </div>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/status">/api/status</a></li>
        <li><a href="/api/hospitals">/api/hospitals</a></li>
        <li><a href="/api/history">/api/history</a></li>
        <li><a href="/api/regions">/api/regions</a></li>
        <li><code>ws://host:port/ws/ticks</code> -- live tick stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return the current tick, subscriber counts, and staged control inputs.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ObserverError> {
    let snapshot = current(&state)?;
    Ok(Json(StatusResponse {
        tick: snapshot.tick,
        generated_at: snapshot.generated_at,
        hospital_count: snapshot.hospitals.len(),
        subscribers: state.hub.subscriber_count(),
        subscriber_faults: state.hub.fault_count(),
        latest: snapshot.latest().cloned(),
        incident: state.hub.incident_state(),
        nodal_override: state.hub.nodal_override(),
    }))
}

// ---------------------------------------------------------------------------
// Hospitals
// ---------------------------------------------------------------------------

/// List hospitals with their live state, optionally filtered.
pub async fn list_hospitals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HospitalsQuery>,
) -> Result<Json<Vec<HospitalView>>, ObserverError> {
    let snapshot = current(&state)?;
    let hospitals = snapshot
        .hospitals
        .iter()
        .filter(|h| query.region.is_none_or(|r| h.region == r))
        .filter(|h| query.status.is_none_or(|s| h.bed_status == s))
        .filter_map(|h| view(&state, h))
        .collect();
    Ok(Json(hospitals))
}

/// Return one hospital's profile and live state.
pub async fn get_hospital(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<HospitalView>, ObserverError> {
    let snapshot = current(&state)?;
    snapshot
        .hospital(HospitalId(id))
        .and_then(|h| view(&state, h))
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound(format!("hospital {id} not found")))
}

/// Return synthetic daily history ending at the live state.
///
/// The noise is seeded from the hospital id and the current tick, so
/// repeated requests within one tick agree.
pub async fn get_hospital_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HospitalHistoryPoint>>, ObserverError> {
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    if days == 0 || days > MAX_HISTORY_DAYS {
        return Err(ObserverError::InvalidQuery(format!(
            "days must be between 1 and {MAX_HISTORY_DAYS}, got {days}"
        )));
    }

    let snapshot = current(&state)?;
    let hospital_id = HospitalId(id);
    let not_found = || ObserverError::NotFound(format!("hospital {id} not found"));
    let live = snapshot.hospital(hospital_id).ok_or_else(not_found)?;
    let profile = state.hub.catalog().get(hospital_id).ok_or_else(not_found)?;

    let mut rng = StdRng::seed_from_u64(snapshot.tick ^ (u64::from(id) << 32));
    let today = snapshot.generated_at.date_naive();
    Ok(Json(hospital_history(profile, live, days, today, &mut rng)))
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Return the national history ring, oldest first.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryPoint>>, ObserverError> {
    let snapshot = current(&state)?;
    Ok(Json(snapshot.history.clone()))
}

/// Return per-region totals.
pub async fn get_regions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<Region, RegionSummary>>, ObserverError> {
    let snapshot = current(&state)?;
    Ok(Json(region_summaries(&snapshot, state.hub.incident_state())))
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Recommend transfer destinations for a patient.
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<Vec<TransferCandidate>>, ObserverError> {
    let mut transfer = TransferQuery::new(origin(query.lat, query.lon)?);
    transfer.critical = query.critical;
    transfer.exclude = query.exclude.map(HospitalId);
    transfer.districts = query.district.into_iter().collect();
    if let Some(traffic) = query.traffic {
        if !traffic.is_finite() || traffic <= 0.0 {
            return Err(ObserverError::InvalidQuery(format!(
                "traffic must be positive, got {traffic}"
            )));
        }
        transfer.traffic = traffic;
    }
    if let Some(max) = query.max_distance_km {
        if !max.is_finite() || max < 0.0 {
            return Err(ObserverError::InvalidQuery(format!(
                "max_distance_km must be non-negative, got {max}"
            )));
        }
        transfer.max_distance_km = max;
    }

    let snapshot = current(&state)?;
    Ok(Json(recommend_transfer(
        &transfer,
        &snapshot,
        state.hub.catalog(),
    )))
}

/// Rank hospitals for a member of the public.
pub async fn get_rankings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RankingsQuery>,
) -> Result<Json<Vec<RankedHospital>>, ObserverError> {
    let at = origin(query.lat, query.lon)?;
    let blocked = parse_blocked(query.blocked.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_RANKING_LIMIT);

    let snapshot = current(&state)?;
    Ok(Json(rank_hospitals(
        at,
        &snapshot,
        state.hub.catalog(),
        state.hub.incident_state(),
        &blocked,
        limit,
    )))
}
