//! Core entity structs for the `BedGrid` capacity simulation.
//!
//! Covers the immutable [`HospitalProfile`], the per-tick [`LiveState`],
//! the two control inputs ([`NodalOverride`], [`IncidentState`]), the
//! aggregated [`HistoryPoint`], and the [`EngineSnapshot`] handed to every
//! observer.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BedStatus, Ownership, PpeLevel, Region};
use crate::ids::HospitalId;

// ---------------------------------------------------------------------------
// Catalog profile
// ---------------------------------------------------------------------------

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Latitude, degrees north.
    pub lat: f64,
    /// Longitude, degrees east.
    pub lon: f64,
}

/// Immutable attributes of one hospital, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HospitalProfile {
    /// Catalog id.
    pub id: HospitalId,
    /// Display name.
    pub name: String,
    /// Ownership category.
    pub ownership: Ownership,
    /// Zone the hospital belongs to.
    pub region: Region,
    /// Free-text locality used by routing filters. May be empty.
    #[serde(default)]
    pub district: String,
    /// Nominal general-ward bed count.
    pub total_beds: u32,
    /// Nominal ICU bed count.
    pub total_icu_beds: u32,
    /// Baseline emergency wait in minutes.
    pub avg_wait_minutes: f64,
    /// Profile average length of stay in days.
    pub avg_length_of_stay_days: f64,
    /// Emergency department arrivals per day.
    pub ed_throughput_per_day: f64,
    /// Site location.
    pub coordinates: GeoPoint,
    /// Oxygen stock at startup, in days of supply.
    #[serde(default = "default_oxygen_days")]
    pub oxygen_supply_days: f64,
    /// PPE stock at startup.
    #[serde(default = "default_ppe_level")]
    pub ppe_stock_level: PpeLevel,
}

const fn default_oxygen_days() -> f64 {
    7.0
}

const fn default_ppe_level() -> PpeLevel {
    PpeLevel::Good
}

// ---------------------------------------------------------------------------
// Live state
// ---------------------------------------------------------------------------

/// Bed and ICU capacity currently in force for a hospital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EffectiveCapacity {
    /// General-ward beds.
    pub beds: u32,
    /// ICU beds.
    pub icu_beds: u32,
}

/// Mutable operational state of one hospital, rewritten every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LiveState {
    /// Hospital this record belongs to.
    pub hospital_id: HospitalId,
    /// Zone of the hospital, copied from the profile for aggregation.
    pub region: Region,
    /// Occupied general-ward beds.
    pub occupied_beds: f64,
    /// Occupied ICU beds.
    pub occupied_icu_beds: f64,
    /// Bed occupancy rate, percent of effective capacity.
    pub bed_occupancy_pct: f64,
    /// ICU occupancy rate, percent of effective ICU capacity.
    pub icu_occupancy_pct: f64,
    /// Unoccupied general-ward beds. Zero when at capacity.
    pub available_beds: f64,
    /// Unoccupied ICU beds.
    pub available_icu_beds: f64,
    /// Staff fatigue score, 10 to 100.
    pub staff_fatigue_score: f64,
    /// Patient satisfaction, 30 to 95 percent.
    pub patient_satisfaction_pct: f64,
    /// Current emergency wait, 20 to 300 minutes.
    pub current_wait_minutes: f64,
    /// Remaining oxygen, in days of supply.
    pub oxygen_supply_days: f64,
    /// Current PPE stock level.
    pub ppe_stock_level: PpeLevel,
    /// Live average length of stay feeding the next discharge rate.
    pub length_of_stay_days: f64,
    /// Status band derived from `bed_occupancy_pct`.
    pub bed_status: BedStatus,
    /// Capacity in force this tick.
    pub capacity: EffectiveCapacity,
    /// Whether a nodal override supplied `capacity`.
    pub override_active: bool,
}

// ---------------------------------------------------------------------------
// Control inputs
// ---------------------------------------------------------------------------

/// Temporary capacity figures imposed on one hospital by a nodal officer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NodalOverride {
    /// Target hospital.
    pub hospital_id: HospitalId,
    /// Replacement general-ward bed count.
    pub total_beds: u32,
    /// Replacement ICU bed count.
    pub total_icu_beds: u32,
    /// Replacement oxygen stock, in days.
    pub oxygen_supply_days: f64,
    /// Last instant at which the override is honored.
    pub active_until: DateTime<Utc>,
}

impl NodalOverride {
    /// Whether the override applies to `id` at `now`.
    pub fn applies_to(&self, id: HospitalId, now: DateTime<Utc>) -> bool {
        self.hospital_id == id && now <= self.active_until
    }
}

/// Mass-casualty incident flag, optionally scoped to a region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct IncidentState {
    /// Whether an incident is in progress.
    pub is_active: bool,
    /// Affected region.
    pub region: Option<Region>,
}

impl IncidentState {
    /// An active incident in `region`.
    pub const fn active(region: Region) -> Self {
        Self {
            is_active: true,
            region: Some(region),
        }
    }

    /// Whether hospitals in `region` are under incident load.
    pub fn affects(&self, region: Region) -> bool {
        self.is_active && self.region == Some(region)
    }
}

// ---------------------------------------------------------------------------
// History and snapshots
// ---------------------------------------------------------------------------

/// Network-wide summary appended to the history ring once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HistoryPoint {
    /// Tick timestamp.
    pub timestamp: DateTime<Utc>,
    /// Capacity-weighted national bed occupancy.
    pub avg_occupancy_pct: f64,
    /// Mean staff fatigue.
    pub avg_staff_fatigue: f64,
    /// Mean patient satisfaction.
    pub avg_satisfaction: f64,
    /// Mean emergency wait.
    pub avg_wait_minutes: f64,
    /// Capacity-weighted occupancy per region.
    pub regional_occupancy: BTreeMap<Region, f64>,
    /// Hospitals above the critical-count threshold.
    pub critical_hospital_count: u32,
}

impl HistoryPoint {
    /// An all-zero point used to pre-fill the history ring.
    pub fn zero(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            avg_occupancy_pct: 0.0,
            avg_staff_fatigue: 0.0,
            avg_satisfaction: 0.0,
            avg_wait_minutes: 0.0,
            regional_occupancy: Region::ALL.iter().map(|r| (*r, 0.0)).collect(),
            critical_hospital_count: 0,
        }
    }
}

/// Immutable view of the whole network after one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EngineSnapshot {
    /// Tick counter; bootstrap ticks included.
    pub tick: u64,
    /// Timestamp of the tick that produced this snapshot.
    pub generated_at: DateTime<Utc>,
    /// One record per catalog hospital, in catalog order.
    pub hospitals: Vec<LiveState>,
    /// History ring contents, oldest first.
    pub history: Vec<HistoryPoint>,
}

impl EngineSnapshot {
    /// Live state of one hospital.
    pub fn hospital(&self, id: HospitalId) -> Option<&LiveState> {
        self.hospitals.iter().find(|h| h.hospital_id == id)
    }

    /// Most recent history point.
    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.history.last()
    }
}

/// One day of a hospital's synthetic back-history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HospitalHistoryPoint {
    /// Calendar day.
    pub date: NaiveDate,
    /// Bed occupancy percent.
    pub occupancy_pct: f64,
    /// ICU occupancy percent.
    pub icu_occupancy_pct: f64,
    /// Emergency wait.
    pub wait_minutes: f64,
    /// Staff fatigue score.
    pub staff_fatigue: f64,
    /// Patient satisfaction.
    pub satisfaction: f64,
}

// ---------------------------------------------------------------------------
// Routing results
// ---------------------------------------------------------------------------

/// A destination proposed for a patient transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TransferCandidate {
    /// Destination hospital.
    pub hospital_id: HospitalId,
    /// Destination name.
    pub name: String,
    /// Great-circle distance from the origin.
    pub distance_km: f64,
    /// Estimated travel time.
    pub eta_minutes: f64,
    /// Preference tier; lower is preferred.
    pub tier: f64,
    /// Free general-ward beds at the destination.
    pub available_beds: f64,
    /// Free ICU beds at the destination.
    pub available_icu_beds: f64,
    /// Destination status band.
    pub bed_status: BedStatus,
}

/// A hospital scored for the public "nearest good option" list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RankedHospital {
    /// Hospital being ranked.
    pub hospital_id: HospitalId,
    /// Hospital name.
    pub name: String,
    /// Great-circle distance from the origin.
    pub distance_km: f64,
    /// Estimated travel time.
    pub eta_minutes: f64,
    /// Composite score; higher is better.
    pub score: f64,
}
