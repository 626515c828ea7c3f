//! Shared application state for the Observer API server.
//!
//! [`AppState`] wraps the engine's [`SubscriptionHub`] for reads and control
//! writes, and owns the broadcast channel that feeds `WebSocket` clients.
//! The channel is attached to the hub as an ordinary subscriber, so the
//! observer never touches the tick loop directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use bedgrid_core::{OperatorState, Subscription, SubscriptionHub};
use bedgrid_types::{EngineSnapshot, HistoryPoint, IncidentState, LiveState, Region};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel for tick messages.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// JSON message pushed over the `WebSocket` for every published snapshot.
///
/// Carries the live state table and the newest history point; the full
/// history ring is available from `GET /api/history`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TickBroadcast {
    /// The tick number.
    pub tick: u64,
    /// Timestamp of the tick.
    pub generated_at: DateTime<Utc>,
    /// Newest national summary.
    pub latest: Option<HistoryPoint>,
    /// Incident flag in force when the message was built.
    pub incident: IncidentState,
    /// Live state of every hospital.
    pub hospitals: Vec<LiveState>,
}

impl TickBroadcast {
    /// Project a snapshot into a tick message.
    pub fn from_snapshot(snapshot: &EngineSnapshot, incident: IncidentState) -> Self {
        Self {
            tick: snapshot.tick,
            generated_at: snapshot.generated_at,
            latest: snapshot.latest().cloned(),
            incident,
            hospitals: snapshot.hospitals.clone(),
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for published snapshots.
    pub tx: broadcast::Sender<Arc<EngineSnapshot>>,
    /// The engine's hub: snapshot reads and control inlets.
    pub hub: Arc<SubscriptionHub>,
    /// Shared operator control state (present when the tick loop is running).
    pub operator_state: Option<Arc<OperatorState>>,
    bridge: Subscription,
}

impl AppState {
    /// Create application state bridged to `hub`.
    pub fn new(hub: Arc<SubscriptionHub>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let sender = tx.clone();
        let bridge = hub.subscribe(move |snapshot| {
            // Err only means no WebSocket client is connected.
            let _ = sender.send(Arc::clone(snapshot));
        });
        Self {
            tx,
            hub,
            operator_state: None,
            bridge,
        }
    }

    /// Create application state with operator control state attached.
    pub fn with_operator(hub: Arc<SubscriptionHub>, operator: Arc<OperatorState>) -> Self {
        Self {
            operator_state: Some(operator),
            ..Self::new(hub)
        }
    }

    /// Subscribe to the snapshot broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EngineSnapshot>> {
        self.tx.subscribe()
    }

    /// Detach the broadcast channel from the hub.
    pub fn detach(&self) {
        self.bridge.unsubscribe();
    }

    /// Current snapshot, or `None` before bootstrap.
    pub fn snapshot(&self) -> Option<Arc<EngineSnapshot>> {
        self.hub.snapshot()
    }
}

impl core::fmt::Debug for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState")
            .field("receivers", &self.tx.receiver_count())
            .field("hub", &self.hub)
            .field("operator_state", &self.operator_state.is_some())
            .field("bridge", &self.bridge.id())
            .finish()
    }
}

/// Occupancy summary for one region, served by `GET /api/regions`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RegionSummary {
    /// Hospitals in the region.
    pub hospital_count: usize,
    /// Capacity-weighted occupancy from the newest history point.
    pub occupancy_pct: f64,
    /// Free general-ward beds.
    pub available_beds: f64,
    /// Free ICU beds.
    pub available_icu_beds: f64,
    /// Hospitals currently Critical or `AtCapacity`.
    pub strained_count: usize,
    /// Whether an incident is active in the region.
    pub incident: bool,
}

/// Per-region totals for `snapshot`, every region present.
pub fn region_summaries(
    snapshot: &EngineSnapshot,
    incident: IncidentState,
) -> BTreeMap<Region, RegionSummary> {
    let latest = snapshot.latest();
    let mut out: BTreeMap<Region, RegionSummary> = Region::ALL
        .iter()
        .map(|region| {
            let occupancy_pct = latest
                .and_then(|p| p.regional_occupancy.get(region).copied())
                .unwrap_or(0.0);
            (
                *region,
                RegionSummary {
                    hospital_count: 0,
                    occupancy_pct,
                    available_beds: 0.0,
                    available_icu_beds: 0.0,
                    strained_count: 0,
                    incident: incident.affects(*region),
                },
            )
        })
        .collect();

    for state in &snapshot.hospitals {
        if let Some(summary) = out.get_mut(&state.region) {
            summary.hospital_count = summary.hospital_count.saturating_add(1);
            summary.available_beds += state.available_beds;
            summary.available_icu_beds += state.available_icu_beds;
            if state.bed_status.refuses_transfers() {
                summary.strained_count = summary.strained_count.saturating_add(1);
            }
        }
    }
    out
}
