//! Transfer routing over a published snapshot.
//!
//! Two consumers read the same live data differently: ambulance crews want
//! the best transfer destination for a patient (tiered for critical cases,
//! nearest for routine ones), and the public portal wants a short scored
//! list of nearby hospitals. Both are pure functions of a snapshot and the
//! catalog.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use bedgrid_catalog::Catalog;
use bedgrid_types::{
    EngineSnapshot, GeoPoint, HospitalId, HospitalProfile, IncidentState, Ownership,
    RankedHospital, TransferCandidate,
};

/// Farthest destination considered for a transfer.
pub const MAX_TRANSFER_DISTANCE_KM: f64 = 85.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Ambulance ETA under live traffic.
///
/// 45 km/h average, scaled by `1.1 + (traffic - 1) * 0.4`, plus 5 minutes
/// of handover.
pub fn dynamic_eta_minutes(distance_km: f64, traffic: f64) -> f64 {
    let factor = 1.1 + (traffic - 1.0) * 0.4;
    distance_km / 45.0 * 60.0 * factor + 5.0
}

/// Conservative ETA for the public portal: 35 km/h with a fixed 1.5
/// traffic factor, plus 5 minutes.
pub fn fixed_eta_minutes(distance_km: f64) -> f64 {
    distance_km / 35.0 * 60.0 * 1.5 + 5.0
}

/// Transfer preference tier. Lower is preferred.
pub fn hospital_tier(profile: &HospitalProfile) -> f64 {
    match profile.ownership {
        Ownership::StateGovernment if profile.total_beds >= 1500 => 1.0,
        Ownership::PrivateLarge if profile.total_beds >= 1000 => 1.5,
        Ownership::PrivateTrust => 2.0,
        Ownership::PrivateMid => 2.5,
        Ownership::StateGovernment => 3.0,
        Ownership::PrivateSpeciality => 3.5,
        _ => 4.0,
    }
}

// ---------------------------------------------------------------------------
// Transfer recommendation
// ---------------------------------------------------------------------------

/// Parameters of a transfer search.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferQuery {
    /// Patient location.
    pub origin: GeoPoint,
    /// Whether the patient needs critical care.
    pub critical: bool,
    /// Hospital the patient is leaving, never recommended.
    pub exclude: Option<HospitalId>,
    /// Restrict destinations to these districts. Empty means any.
    pub districts: Vec<String>,
    /// Distance cutoff.
    pub max_distance_km: f64,
    /// Live traffic multiplier; 1.0 is normal.
    pub traffic: f64,
}

impl TransferQuery {
    /// A routine search from `origin` with default limits.
    pub const fn new(origin: GeoPoint) -> Self {
        Self {
            origin,
            critical: false,
            exclude: None,
            districts: Vec::new(),
            max_distance_km: MAX_TRANSFER_DISTANCE_KM,
            traffic: 1.0,
        }
    }

    fn allows_district(&self, district: &str) -> bool {
        self.districts.is_empty() || self.districts.iter().any(|d| d.eq_ignore_ascii_case(district))
    }
}

/// Candidate destinations, best first.
///
/// Hospitals beyond the cutoff, the excluded source, and hospitals whose
/// status refuses transfers are left out. Critical patients are ordered by
/// tier, then free ICU beds (more first), then distance; routine patients
/// by distance alone.
pub fn recommend_transfer(
    query: &TransferQuery,
    snapshot: &EngineSnapshot,
    catalog: &Catalog,
) -> Vec<TransferCandidate> {
    let mut candidates: Vec<TransferCandidate> = snapshot
        .hospitals
        .iter()
        .filter(|state| Some(state.hospital_id) != query.exclude)
        .filter(|state| !state.bed_status.refuses_transfers())
        .filter_map(|state| {
            let profile = catalog.get(state.hospital_id)?;
            if !query.allows_district(&profile.district) {
                return None;
            }
            let distance_km = haversine_km(query.origin, profile.coordinates);
            (distance_km <= query.max_distance_km).then(|| TransferCandidate {
                hospital_id: state.hospital_id,
                name: profile.name.clone(),
                distance_km,
                eta_minutes: dynamic_eta_minutes(distance_km, query.traffic),
                tier: hospital_tier(profile),
                available_beds: state.available_beds,
                available_icu_beds: state.available_icu_beds,
                bed_status: state.bed_status,
            })
        })
        .collect();

    if query.critical {
        candidates.sort_by(critical_order);
    } else {
        candidates.sort_by(routine_order);
    }
    candidates
}

fn critical_order(a: &TransferCandidate, b: &TransferCandidate) -> Ordering {
    a.tier
        .total_cmp(&b.tier)
        .then_with(|| b.available_icu_beds.total_cmp(&a.available_icu_beds))
        .then_with(|| routine_order(a, b))
}

fn routine_order(a: &TransferCandidate, b: &TransferCandidate) -> Ordering {
    a.distance_km
        .total_cmp(&b.distance_km)
        .then_with(|| a.hospital_id.cmp(&b.hospital_id))
}

// ---------------------------------------------------------------------------
// Public ranking
// ---------------------------------------------------------------------------

/// Score every hospital for a member of the public at `origin` and return
/// the best `limit`, highest score first.
///
/// The score starts at 100 and loses two points per minute of ETA, half a
/// point per occupancy percent, 0.3 per fatigue point, 50 each for fewer
/// than 10 free beds or fewer than 2 free ICU beds, 300 inside an active
/// incident region, and 500 when the hospital is blocked.
pub fn rank_hospitals(
    origin: GeoPoint,
    snapshot: &EngineSnapshot,
    catalog: &Catalog,
    incident: IncidentState,
    blocked: &BTreeSet<HospitalId>,
    limit: usize,
) -> Vec<RankedHospital> {
    let mut ranked: Vec<RankedHospital> = snapshot
        .hospitals
        .iter()
        .filter_map(|state| {
            let profile = catalog.get(state.hospital_id)?;
            let distance_km = haversine_km(origin, profile.coordinates);
            let eta_minutes = fixed_eta_minutes(distance_km);

            let mut score = 100.0
                - eta_minutes * 2.0
                - state.bed_occupancy_pct * 0.5
                - state.staff_fatigue_score * 0.3;
            if state.available_beds < 10.0 {
                score -= 50.0;
            }
            if state.available_icu_beds < 2.0 {
                score -= 50.0;
            }
            if incident.affects(state.region) {
                score -= 300.0;
            }
            if blocked.contains(&state.hospital_id) {
                score -= 500.0;
            }

            Some(RankedHospital {
                hospital_id: state.hospital_id,
                name: profile.name.clone(),
                distance_km,
                eta_minutes,
                score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.hospital_id.cmp(&b.hospital_id))
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bedgrid_types::{BedStatus, LiveState, Region};
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::DynamicsConfig;
    use crate::update::initial_state;

    const THENI: GeoPoint = GeoPoint {
        lat: 9.959,
        lon: 77.4468,
    };

    fn snapshot(catalog: &Catalog) -> EngineSnapshot {
        let d = DynamicsConfig::national();
        let mut rng = StdRng::seed_from_u64(9);
        let hospitals: Vec<LiveState> = catalog
            .iter()
            .map(|p| initial_state(p, &d, None, &mut rng))
            .collect();
        EngineSnapshot {
            tick: 0,
            generated_at: Utc::now(),
            hospitals,
            history: Vec::new(),
        }
    }

    fn set_status(snapshot: &mut EngineSnapshot, id: u32, status: BedStatus) {
        let state = snapshot
            .hospitals
            .iter_mut()
            .find(|s| s.hospital_id == HospitalId(id))
            .unwrap();
        state.bed_status = status;
    }

    #[test]
    fn haversine_matches_known_distance() {
        let delhi = GeoPoint {
            lat: 28.6139,
            lon: 77.2090,
        };
        let mumbai = GeoPoint {
            lat: 19.0760,
            lon: 72.8777,
        };
        let d = haversine_km(delhi, mumbai);
        assert!((d - 1153.0).abs() < 10.0);
        assert!(haversine_km(delhi, delhi).abs() < 1e-9);
    }

    #[test]
    fn eta_formulas() {
        assert!((dynamic_eta_minutes(45.0, 1.0) - 71.0).abs() < 1e-9);
        assert!((fixed_eta_minutes(35.0) - 95.0).abs() < 1e-9);
    }

    #[test]
    fn tiers() {
        let catalog = Catalog::builtin().unwrap();
        assert!((hospital_tier(catalog.get(HospitalId(31)).unwrap()) - 1.0).abs() < f64::EPSILON);
        assert!((hospital_tier(catalog.get(HospitalId(33)).unwrap()) - 1.5).abs() < f64::EPSILON);
        assert!((hospital_tier(catalog.get(HospitalId(150)).unwrap()) - 3.0).abs() < f64::EPSILON);
        assert!((hospital_tier(catalog.get(HospitalId(55)).unwrap()) - 3.5).abs() < f64::EPSILON);
        assert!((hospital_tier(catalog.get(HospitalId(1)).unwrap()) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn routine_transfer_is_nearest_first() {
        let catalog = Catalog::builtin().unwrap();
        let mut snap = snapshot(&catalog);
        for s in &mut snap.hospitals {
            s.bed_status = BedStatus::Available;
        }
        let mut query = TransferQuery::new(THENI);
        query.exclude = Some(HospitalId(150));

        let candidates = recommend_transfer(&query, &snap, &catalog);
        assert!(!candidates.is_empty());
        assert_eq!(candidates.first().unwrap().hospital_id, HospitalId(67));
        assert!(candidates.iter().all(|c| c.hospital_id != HospitalId(150)));
        assert!(candidates.iter().all(|c| c.distance_km <= MAX_TRANSFER_DISTANCE_KM));
        assert!(candidates.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn critical_transfer_prefers_tier() {
        let catalog = Catalog::builtin().unwrap();
        let mut snap = snapshot(&catalog);
        for s in &mut snap.hospitals {
            s.bed_status = BedStatus::Available;
        }
        let mut query = TransferQuery::new(THENI);
        query.critical = true;
        query.exclude = Some(HospitalId(150));

        let candidates = recommend_transfer(&query, &snap, &catalog);
        assert_eq!(candidates.first().unwrap().hospital_id, HospitalId(31));
    }

    #[test]
    fn saturated_hospitals_are_skipped() {
        let catalog = Catalog::builtin().unwrap();
        let mut snap = snapshot(&catalog);
        for s in &mut snap.hospitals {
            s.bed_status = BedStatus::Available;
        }
        set_status(&mut snap, 31, BedStatus::Critical);
        set_status(&mut snap, 33, BedStatus::AtCapacity);
        let mut query = TransferQuery::new(THENI);
        query.critical = true;

        let ids: Vec<_> = recommend_transfer(&query, &snap, &catalog)
            .into_iter()
            .map(|c| c.hospital_id)
            .collect();
        assert!(!ids.contains(&HospitalId(31)));
        assert!(!ids.contains(&HospitalId(33)));
    }

    #[test]
    fn district_filter() {
        let catalog = Catalog::builtin().unwrap();
        let snap = snapshot(&catalog);
        let mut query = TransferQuery::new(THENI);
        query.districts = vec!["dindigul".to_owned()];
        let candidates = recommend_transfer(&query, &snap, &catalog);
        assert!(candidates.iter().all(|c| {
            catalog.get(c.hospital_id).unwrap().district == "Dindigul"
        }));
    }

    #[test]
    fn ranking_penalizes_incident_and_block() {
        let catalog = Catalog::builtin().unwrap();
        let snap = snapshot(&catalog);
        let plain = rank_hospitals(
            THENI,
            &snap,
            &catalog,
            IncidentState::default(),
            &BTreeSet::new(),
            3,
        );
        assert_eq!(plain.len(), 3);
        assert!(plain.windows(2).all(|w| w[0].score >= w[1].score));

        let top = plain.first().unwrap().hospital_id;
        let blocked: BTreeSet<_> = [top].into_iter().collect();
        let reranked = rank_hospitals(
            THENI,
            &snap,
            &catalog,
            IncidentState::default(),
            &blocked,
            3,
        );
        assert_ne!(reranked.first().unwrap().hospital_id, top);

        let south = rank_hospitals(
            THENI,
            &snap,
            &catalog,
            IncidentState::active(Region::South),
            &BTreeSet::new(),
            100,
        );
        let theni = south.iter().find(|r| r.hospital_id == HospitalId(150)).unwrap();
        let theni_plain = rank_hospitals(
            THENI,
            &snap,
            &catalog,
            IncidentState::default(),
            &BTreeSet::new(),
            100,
        )
        .into_iter()
        .find(|r| r.hospital_id == HospitalId(150))
        .unwrap();
        assert!((theni_plain.score - theni.score - 300.0).abs() < 1e-9);
    }
}
