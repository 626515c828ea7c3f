//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bedgrid_catalog::Catalog;
use bedgrid_core::{Engine, ManualClock, OperatorState, SimulationConfig};
use bedgrid_observer::router::build_router;
use bedgrid_observer::state::AppState;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

const CONFIG: &str = "engine:\n  seed: 9\n  bootstrap_ticks: 3\n  history_len: 20\n";

struct Fixture {
    engine: Engine,
    state: Arc<AppState>,
}

fn make_fixture(bootstrap: bool) -> Fixture {
    let config = SimulationConfig::parse(CONFIG).unwrap();
    let start = Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).single().unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let catalog = Arc::new(Catalog::builtin().unwrap());
    let mut engine = Engine::new(&config, catalog, clock).unwrap();
    if bootstrap {
        engine.bootstrap();
    }
    let operator = Arc::new(OperatorState::new(&config.engine));
    let state = Arc::new(AppState::with_operator(Arc::clone(engine.hub()), operator));
    Fixture { engine, state }
}

fn make_test_state() -> Arc<AppState> {
    make_fixture(true).state
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn send(state: &Arc<AppState>, method: &str, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = build_router(Arc::clone(state)).oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_status_before_bootstrap_is_unavailable() {
    let state = make_fixture(false).state;
    let (status, json) = get(&state, "/api/status").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], 503);
}

#[tokio::test]
async fn test_get_status() {
    let state = make_test_state();
    let (status, json) = get(&state, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tick"], 3);
    assert_eq!(json["hospital_count"], 57);
    assert_eq!(json["incident"]["is_active"], false);
    assert!(json["nodal_override"].is_null());
    assert!(json["latest"]["avg_occupancy_pct"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_list_hospitals() {
    let state = make_test_state();
    let (status, json) = get(&state, "/api/hospitals").await;

    assert_eq!(status, StatusCode::OK);
    let hospitals = json.as_array().unwrap();
    assert_eq!(hospitals.len(), 57);
    assert_eq!(hospitals[0]["profile"]["id"], hospitals[0]["state"]["hospital_id"]);
}

#[tokio::test]
async fn test_list_hospitals_filter_region() {
    let state = make_test_state();
    let (status, json) = get(&state, "/api/hospitals?region=South").await;

    assert_eq!(status, StatusCode::OK);
    let hospitals = json.as_array().unwrap();
    assert!(!hospitals.is_empty());
    assert!(hospitals.iter().all(|h| h["state"]["region"] == "South"));
}

#[tokio::test]
async fn test_list_hospitals_bad_region_is_rejected() {
    let state = make_test_state();
    let response = build_router(state)
        .oneshot(
            Request::get("/api/hospitals?region=Atlantis")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_hospital_by_id() {
    let state = make_test_state();
    let (status, json) = get(&state, "/api/hospitals/150").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["profile"]["id"], 150);
    assert_eq!(json["profile"]["total_beds"], 1100);
    assert_eq!(json["state"]["capacity"]["beds"], 1100);
}

#[tokio::test]
async fn test_get_hospital_not_found() {
    let state = make_test_state();
    let (status, json) = get(&state, "/api/hospitals/9999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_hospital_history() {
    let state = make_test_state();
    let (status, json) = get(&state, "/api/hospitals/31/history?days=7").await;
    assert_eq!(status, StatusCode::OK);
    let points = json.as_array().unwrap();
    assert_eq!(points.len(), 7);
    assert_eq!(points[6]["date"], "2025-02-10");

    let (_, live) = get(&state, "/api/hospitals/31").await;
    assert_eq!(points[6]["occupancy_pct"], live["state"]["bed_occupancy_pct"]);

    // Same tick, same noise.
    let (_, again) = get(&state, "/api/hospitals/31/history?days=7").await;
    assert_eq!(json, again);
}

#[tokio::test]
async fn test_hospital_history_rejects_zero_days() {
    let state = make_test_state();
    let (status, _) = get(&state, "/api/hospitals/31/history?days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_has_configured_length() {
    let state = make_test_state();
    let (status, json) = get(&state, "/api/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_regions_cover_every_zone() {
    let state = make_test_state();
    let (status, json) = get(&state, "/api/regions").await;

    assert_eq!(status, StatusCode::OK);
    let regions = json.as_object().unwrap();
    assert_eq!(regions.len(), 5);
    let total: u64 = regions
        .values()
        .map(|r| r["hospital_count"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 57);
}

#[tokio::test]
async fn test_recommendations_exclude_source_and_stay_in_range() {
    let state = make_test_state();
    let (status, json) = get(
        &state,
        "/api/recommendations?lat=9.959&lon=77.4468&critical=true&exclude=150",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    for candidate in json.as_array().unwrap() {
        assert_ne!(candidate["hospital_id"], 150);
        assert!(candidate["distance_km"].as_f64().unwrap() <= 85.0);
        assert_ne!(candidate["bed_status"], "Critical");
        assert_ne!(candidate["bed_status"], "AtCapacity");
    }
}

#[tokio::test]
async fn test_recommendations_reject_bad_coordinates() {
    let state = make_test_state();
    let (status, _) = get(&state, "/api/recommendations?lat=120&lon=77.4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rankings_push_blocked_hospital_down() {
    let state = make_test_state();
    let (status, open) = get(&state, "/api/rankings?lat=9.959&lon=77.4468&limit=3").await;
    assert_eq!(status, StatusCode::OK);
    let open = open.as_array().unwrap();
    assert_eq!(open.len(), 3);
    let best = open[0]["hospital_id"].as_u64().unwrap();

    let uri = format!("/api/rankings?lat=9.959&lon=77.4468&limit=3&blocked={best}");
    let (_, blocked) = get(&state, &uri).await;
    assert!(
        blocked
            .as_array()
            .unwrap()
            .iter()
            .all(|h| h["hospital_id"].as_u64().unwrap() != best)
    );
}

#[tokio::test]
async fn test_incident_round_trip() {
    let state = make_test_state();

    let (status, json) = send(
        &state,
        "POST",
        "/api/control/incident",
        &json!({"is_active": true, "region": null}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("region"));

    let (status, _) = send(
        &state,
        "POST",
        "/api/control/incident",
        &json!({"is_active": true, "region": "North"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = get(&state, "/api/control/incident").await;
    assert_eq!(json["region"], "North");

    let (status, json) = send(&state, "DELETE", "/api/control/incident", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_active"], false);
}

#[tokio::test]
async fn test_override_round_trip() {
    let state = make_test_state();

    let (status, _) = send(
        &state,
        "POST",
        "/api/control/override",
        &json!({
            "hospital_id": 9999,
            "total_beds": 100,
            "total_icu_beds": 10,
            "oxygen_supply_days": 2.0,
            "active_for_minutes": 30
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.hub.nodal_override().is_none());

    let (status, json) = send(
        &state,
        "POST",
        "/api/control/override",
        &json!({
            "hospital_id": 150,
            "total_beds": 1400,
            "total_icu_beds": 150,
            "oxygen_supply_days": 2.5,
            "active_for_minutes": 30
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], true);
    assert_eq!(json["nodal_override"]["total_beds"], 1400);

    let (status, json) = send(&state, "DELETE", "/api/control/override", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["nodal_override"].is_null());
    assert_eq!(json["active"], false);
}

#[tokio::test]
async fn test_override_needs_an_expiry() {
    let state = make_test_state();
    let (status, _) = send(
        &state,
        "POST",
        "/api/control/override",
        &json!({
            "hospital_id": 150,
            "total_beds": 1400,
            "total_icu_beds": 150,
            "oxygen_supply_days": 2.5
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_operator_controls() {
    let state = make_test_state();

    let (status, json) = send(&state, "POST", "/api/operator/pause", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    let (_, json) = get(&state, "/api/operator/status").await;
    assert_eq!(json["paused"], true);
    assert_eq!(json["tick"], 3);

    let (status, _) = send(
        &state,
        "POST",
        "/api/operator/interval",
        &json!({"min_interval_ms": 50, "max_interval_ms": 100}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        "POST",
        "/api/operator/interval",
        &json!({"min_interval_ms": 200, "max_interval_ms": 400}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = get(&state, "/api/operator/status").await;
    assert_eq!(json["min_interval_ms"], 200);
    assert_eq!(json["max_interval_ms"], 400);

    let (status, _) = send(&state, "POST", "/api/operator/stop", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = get(&state, "/api/operator/status").await;
    assert_eq!(json["stop_requested"], true);
}

#[tokio::test]
async fn test_operator_without_loop_is_unavailable() {
    let fixture = make_fixture(true);
    let state = Arc::new(AppState::new(Arc::clone(fixture.engine.hub())));
    let (status, _) = send(&state, "POST", "/api/operator/pause", &json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_broadcast_channel() {
    let mut fixture = make_fixture(true);
    let mut rx = fixture.state.subscribe();

    fixture.engine.step();

    let received = rx.recv().await.unwrap();
    assert_eq!(received.tick, 4);
    assert_eq!(received.hospitals.len(), 57);

    fixture.state.detach();
    fixture.engine.step();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(
            Request::get("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
