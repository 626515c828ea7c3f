//! The per-hospital update rule.
//!
//! One call advances one hospital by one tick. The rule is a pure function
//! of the previous [`LiveState`], the immutable profile, the staged control
//! inputs, the cohort flag, the [`DynamicsConfig`] table, and a random
//! source. Every call consumes exactly [`DRAWS_PER_UPDATE`] random numbers
//! whatever branches it takes, so two runs that differ only in control
//! inputs stay on the same random stream.
//!
//! # Steps
//!
//! 1. Effective capacity (nodal override or nominal)
//! 2. Raw bed-flow delta: discharges minus admissions plus noise
//! 3. Incident shock (never positive)
//! 4. Rate limiting of the flow delta
//! 5. Asymmetric drift toward the sector/cohort/anchor target, then the
//!    combined step clamp
//! 6. ICU coupling
//! 7. Fatigue and satisfaction recurrences
//! 8. Wait time
//! 9. Oxygen and PPE
//! 10. Percentages and status band
//! 11. Length-of-stay feedback

use std::collections::BTreeMap;

use bedgrid_types::{
    BedStatus, EffectiveCapacity, HospitalId, HospitalProfile, IncidentState, LiveState,
    NodalOverride, PpeLevel,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::config::{AnchorConfig, DynamicsConfig};

/// Random numbers consumed by every [`update_hospital`] call.
pub const DRAWS_PER_UPDATE: usize = 13;

/// Random numbers consumed by every [`initial_state`] call.
pub const DRAWS_PER_INIT: usize = 4;

/// Staff fatigue bounds.
pub const FATIGUE_RANGE: (f64, f64) = (10.0, 100.0);
/// Patient satisfaction bounds.
pub const SATISFACTION_RANGE: (f64, f64) = (30.0, 95.0);
/// Emergency wait bounds, minutes.
pub const WAIT_RANGE: (f64, f64) = (20.0, 300.0);

/// Anchor settings keyed by hospital.
pub type Anchors = BTreeMap<HospitalId, AnchorConfig>;

/// Index anchor settings by hospital id.
pub fn anchor_map(anchors: &[AnchorConfig]) -> Anchors {
    anchors
        .iter()
        .map(|a| (HospitalId(a.hospital_id), a.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Tick-wide inputs shared by every hospital.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// Constant table.
    pub dynamics: &'a DynamicsConfig,
    /// Incident staged for this tick.
    pub incident: IncidentState,
    /// Override staged for this tick.
    pub nodal_override: Option<&'a NodalOverride>,
    /// Instant the tick is computed at.
    pub now: DateTime<Utc>,
}

/// Per-hospital inputs.
#[derive(Debug, Clone, Copy)]
pub struct HospitalInput<'a> {
    /// Immutable attributes.
    pub profile: &'a HospitalProfile,
    /// State at the end of the previous tick.
    pub previous: &'a LiveState,
    /// Whether the hospital is in this tick's high-strain cohort.
    pub in_cohort: bool,
    /// Fixed baselines, if the hospital is an anchor.
    pub anchor: Option<&'a AnchorConfig>,
}

/// The bed-flow terms that produced one tick's occupancy change.
///
/// Positive deltas free beds; negative deltas fill them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowBreakdown {
    /// Beds freed by discharges this tick.
    pub discharge: f64,
    /// Beds filled by admissions this tick.
    pub admission: f64,
    /// Zero-mean random term.
    pub noise: f64,
    /// Incident contribution. Always zero or negative.
    pub incident_shock: f64,
    /// `discharge - admission + noise + incident_shock`.
    pub raw_delta: f64,
    /// `raw_delta` after rate limiting.
    pub limited_delta: f64,
}

/// Result of one [`update_hospital`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// The new live state.
    pub state: LiveState,
    /// How the bed-flow delta was composed.
    pub flow: FlowBreakdown,
}

// ---------------------------------------------------------------------------
// Random helpers
// ---------------------------------------------------------------------------

/// Uniform in `[-amplitude / 2, amplitude / 2)`.
fn noise<R: Rng + ?Sized>(rng: &mut R, amplitude: f64) -> f64 {
    (rng.random::<f64>() - 0.5) * amplitude
}

/// Uniform in `[-spread, spread)`.
fn spread<R: Rng + ?Sized>(rng: &mut R, half_width: f64) -> f64 {
    (rng.random::<f64>() - 0.5) * 2.0 * half_width
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Synthesize the starting state of one hospital.
pub fn initial_state<R: Rng + ?Sized>(
    profile: &HospitalProfile,
    dynamics: &DynamicsConfig,
    anchor: Option<&AnchorConfig>,
    rng: &mut R,
) -> LiveState {
    let occupancy_draw = spread(rng, dynamics.initial_spread_pct);
    let icu_draw = spread(rng, dynamics.icu_initial_spread_pct);
    let fatigue_draw = spread(rng, dynamics.initial_score_spread);
    let satisfaction_draw = spread(rng, dynamics.initial_score_spread);

    let capacity = EffectiveCapacity {
        beds: profile.total_beds,
        icu_beds: profile.total_icu_beds,
    };
    let beds = f64::from(capacity.beds);
    let icu_beds = f64::from(capacity.icu_beds);

    let sector_pct = if profile.ownership.is_public() {
        dynamics.public_initial_pct
    } else {
        dynamics.private_initial_pct
    };
    let start_pct = anchor
        .map_or(sector_pct + occupancy_draw, |a| a.occupancy_pct)
        .clamp(0.0, dynamics.initial_cap_pct.min(100.0));
    let occupied_beds = start_pct / 100.0 * beds;
    let bed_pct = percent(occupied_beds, beds);

    let occupied_icu_beds = ((bed_pct + icu_draw) / 100.0 * icu_beds).clamp(0.0, icu_beds);

    let (fatigue, satisfaction, wait) = anchor.map_or_else(
        || {
            (
                dynamics.initial_fatigue + fatigue_draw,
                dynamics.initial_satisfaction + satisfaction_draw,
                profile.avg_wait_minutes * (1.0 + (bed_pct - 75.0) / 100.0),
            )
        },
        |a| (a.fatigue, a.satisfaction, a.initial_wait_minutes),
    );

    finalize(
        profile,
        dynamics,
        Finished {
            capacity,
            override_active: false,
            occupied_beds,
            occupied_icu_beds,
            fatigue,
            satisfaction,
            wait,
            oxygen: profile.oxygen_supply_days,
            ppe: profile.ppe_stock_level,
            length_of_stay: profile.avg_length_of_stay_days,
        },
    )
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Advance one hospital by one tick.
#[allow(clippy::too_many_lines)]
pub fn update_hospital<R: Rng + ?Sized>(
    ctx: &TickContext<'_>,
    input: &HospitalInput<'_>,
    rng: &mut R,
) -> UpdateOutcome {
    let d = ctx.dynamics;
    let profile = input.profile;
    let prev = input.previous;

    // Fixed draw order; every value is drawn even when unused.
    let alos_jitter = spread(rng, d.alos_jitter_days);
    let flow_noise = noise(
        rng,
        if input.in_cohort {
            d.strain_noise_amplitude
        } else {
            d.noise_amplitude
        },
    );
    let icu_target_noise = spread(rng, d.icu_noise_pct);
    let icu_admit_roll: f64 = rng.random();
    let icu_discharge_roll: f64 = rng.random();
    let fatigue_noise_draw: f64 = rng.random();
    let wait_noise_draw: f64 = rng.random();
    let satisfaction_noise_draw: f64 = rng.random();
    let resupply_roll: f64 = rng.random();
    let resupply_amount_draw: f64 = rng.random();
    let ppe_step_roll: f64 = rng.random();
    let ppe_improve_roll: f64 = rng.random();
    let ppe_worsen_roll: f64 = rng.random();

    // 1. Effective capacity.
    let active_override = ctx
        .nodal_override
        .filter(|ov| ov.applies_to(profile.id, ctx.now));
    let (capacity, mut oxygen) = active_override.map_or_else(
        || {
            (
                EffectiveCapacity {
                    beds: profile.total_beds,
                    icu_beds: profile.total_icu_beds,
                },
                prev.oxygen_supply_days,
            )
        },
        |ov| {
            (
                EffectiveCapacity {
                    beds: ov.total_beds,
                    icu_beds: ov.total_icu_beds,
                },
                ov.oxygen_supply_days,
            )
        },
    );
    let beds = f64::from(capacity.beds);
    let icu_beds = f64::from(capacity.icu_beds);
    let floor = d.min_occupied_beds.min(beds);
    let prev_occupied = prev.occupied_beds.clamp(0.0, beds);

    // 2. Raw bed-flow delta.
    let alos = (prev.length_of_stay_days + alos_jitter).max(d.min_alos_days);
    let discharge = prev_occupied / alos / 24.0;
    let admission = profile.ed_throughput_per_day / 24.0 * d.admission_fraction;

    // 3. Incident shock.
    let incident_shock = if ctx.incident.affects(profile.region) {
        -(d.incident_shock_beds + d.incident_shock_pct / 100.0 * beds)
    } else {
        0.0
    };
    let raw_delta = discharge - admission + flow_noise + incident_shock;

    // 4. Rate limiting.
    let limited_delta = raw_delta.clamp(-d.max_bed_change_per_tick, d.max_bed_change_per_tick);
    let after_flow = (prev_occupied - limited_delta).clamp(floor, beds);

    // 5. Drift, then the combined step clamp.
    let target_pct = input.anchor.map_or_else(
        || baseline_pct(d, profile, input.in_cohort),
        |a| a.occupancy_pct,
    );
    let current_pct = percent(after_flow, beds);
    let coefficient = if input.in_cohort {
        d.drift_climb
    } else if current_pct > target_pct {
        d.drift_release
    } else {
        d.drift_recovery
    };
    let drift_beds = (target_pct - current_pct) * coefficient / 100.0 * beds;
    let max_step = d.max_step_pct / 100.0 * beds;
    let occupied_beds = (after_flow + drift_beds)
        .clamp(prev_occupied - max_step, prev_occupied + max_step)
        .clamp(floor, beds);
    let bed_pct = percent(occupied_beds, beds);

    // 6. ICU coupling.
    let in_incident = ctx.incident.affects(profile.region);
    let occupied_icu_beds = if icu_beds > 0.0 {
        let prev_icu = prev.occupied_icu_beds.clamp(0.0, icu_beds);
        let icu_target =
            input
                .anchor
                .map_or(bed_pct + d.icu_bias_pct + icu_target_noise, |a| {
                    a.icu_occupancy_pct
                });
        let icu_pct = percent(prev_icu, icu_beds);
        let mut icu = prev_icu + (icu_target - icu_pct) * d.icu_drift / 100.0 * icu_beds;
        let pressure = if in_incident {
            d.incident_icu_pressure
        } else {
            1.0
        };
        if icu_admit_roll < (d.icu_jitter_probability * pressure).min(1.0) {
            icu += 1.0;
        }
        if icu_discharge_roll < d.icu_jitter_probability {
            icu -= 1.0;
        }
        icu.clamp(0.0, icu_beds)
    } else {
        0.0
    };

    // 7 and 8. Fatigue, wait, satisfaction.
    let strain = occupied_beds / beds;
    let prev_fatigue = prev.staff_fatigue_score;
    let prev_satisfaction = prev.patient_satisfaction_pct;
    let (fatigue, wait, satisfaction) = if let Some(anchor) = input.anchor {
        let fatigue_change = d.anchor_fatigue_strain_weight * (strain - d.anchor_reference_strain)
            + d.anchor_fatigue_recovery_rate * (anchor.fatigue - prev_fatigue)
            + (fatigue_noise_draw - 0.5) * d.anchor_fatigue_noise;
        let fatigue = clamp_range(
            prev_fatigue + fatigue_change.clamp(-d.max_fatigue_change, d.max_fatigue_change),
            FATIGUE_RANGE,
        );

        let wait = clamp_range(
            anchor.wait_minutes + (wait_noise_draw - 0.5) * d.anchor_wait_noise,
            WAIT_RANGE,
        );

        let satisfaction_change = d.anchor_satisfaction_recovery_rate
            * (anchor.satisfaction - prev_satisfaction)
            - d.anchor_satisfaction_wait_weight * (wait / anchor.wait_minutes.max(1.0) - 1.0)
            + (satisfaction_noise_draw - 0.5) * d.anchor_satisfaction_noise;
        let satisfaction = clamp_range(
            prev_satisfaction
                + satisfaction_change
                    .clamp(-d.max_satisfaction_change, d.max_satisfaction_change),
            SATISFACTION_RANGE,
        );
        (fatigue, wait, satisfaction)
    } else {
        let fatigue_change = d.fatigue_strain_weight * (strain - d.fatigue_reference_strain)
            + d.fatigue_recovery_rate * (d.fatigue_recovery_target - prev_fatigue)
            + (fatigue_noise_draw - 0.5) * d.fatigue_noise;
        let fatigue = clamp_range(
            prev_fatigue + fatigue_change.clamp(-d.max_fatigue_change, d.max_fatigue_change),
            FATIGUE_RANGE,
        );

        let wait = clamp_range(
            profile.avg_wait_minutes
                * occupancy_wait_factor(d, strain)
                * (1.0 + fatigue / 100.0 * d.wait_fatigue_weight),
            WAIT_RANGE,
        );

        let satisfaction_change = d.satisfaction_recovery_rate
            * (d.satisfaction_recovery_target - prev_satisfaction)
            - d.satisfaction_fatigue_weight * (fatigue - d.fatigue_recovery_target)
            - d.satisfaction_wait_weight * (wait / profile.avg_wait_minutes - 1.0)
            + (satisfaction_noise_draw - 0.5) * d.satisfaction_noise;
        let satisfaction = clamp_range(
            prev_satisfaction
                + satisfaction_change
                    .clamp(-d.max_satisfaction_change, d.max_satisfaction_change),
            SATISFACTION_RANGE,
        );
        (fatigue, wait, satisfaction)
    };

    // 9. Resources.
    let icu_ratio = if icu_beds > 0.0 {
        occupied_icu_beds / icu_beds
    } else {
        0.0
    };
    oxygen = (oxygen - (icu_ratio * d.oxygen_icu_burn + strain * d.oxygen_bed_burn)).max(0.0);
    if oxygen < d.resupply_threshold_days && resupply_roll < d.resupply_probability {
        oxygen += d.resupply_min_days
            + resupply_amount_draw * (d.resupply_max_days - d.resupply_min_days);
    }

    let mut ppe = prev.ppe_stock_level;
    if ppe_step_roll < d.ppe_step_probability {
        if ppe != PpeLevel::Good && ppe_improve_roll < d.ppe_improve_probability {
            ppe = ppe.improved();
        } else if ppe != PpeLevel::Stockout && ppe_worsen_roll < d.ppe_worsen_probability {
            ppe = ppe.worsened();
        }
    }

    // 11. Length-of-stay feedback.
    let length_of_stay = (profile.avg_length_of_stay_days
        + d.alos_strain_weight * (strain - d.alos_reference_strain)
        + d.alos_fatigue_weight * (fatigue / 100.0 - d.alos_reference_fatigue))
        .max(d.min_alos_days);

    // 10. Percentages and status.
    let state = finalize(
        profile,
        d,
        Finished {
            capacity,
            override_active: active_override.is_some(),
            occupied_beds,
            occupied_icu_beds,
            fatigue,
            satisfaction,
            wait,
            oxygen,
            ppe,
            length_of_stay,
        },
    );

    UpdateOutcome {
        state,
        flow: FlowBreakdown {
            discharge,
            admission,
            noise: flow_noise,
            incident_shock,
            raw_delta,
            limited_delta,
        },
    }
}

/// Drift target for a non-anchor hospital.
fn baseline_pct(d: &DynamicsConfig, profile: &HospitalProfile, in_cohort: bool) -> f64 {
    match (profile.ownership.is_public(), in_cohort) {
        (true, true) => d.public_strain_baseline_pct,
        (true, false) => d.public_baseline_pct,
        (false, true) => d.private_strain_baseline_pct,
        (false, false) => d.private_baseline_pct,
    }
}

/// Wait multiplier from occupancy strain.
///
/// Flat below the threshold, then linear plus quadratic in the excess.
pub fn occupancy_wait_factor(d: &DynamicsConfig, strain: f64) -> f64 {
    if strain > d.wait_strain_threshold {
        let excess = strain - d.wait_strain_threshold;
        excess.mul_add(d.wait_strain_slope, 1.0) + d.wait_strain_curvature * excess * excess
    } else {
        1.0
    }
}

/// Map bed occupancy to a status band.
pub fn classify(d: &DynamicsConfig, bed_pct: f64) -> BedStatus {
    if bed_pct >= d.at_capacity_pct {
        BedStatus::AtCapacity
    } else if bed_pct > d.critical_pct {
        BedStatus::Critical
    } else if bed_pct > d.high_occupancy_pct {
        BedStatus::HighOccupancy
    } else {
        BedStatus::Available
    }
}

// ---------------------------------------------------------------------------
// Derived fields
// ---------------------------------------------------------------------------

/// Raw values before percentages, availability, and status are derived.
struct Finished {
    capacity: EffectiveCapacity,
    override_active: bool,
    occupied_beds: f64,
    occupied_icu_beds: f64,
    fatigue: f64,
    satisfaction: f64,
    wait: f64,
    oxygen: f64,
    ppe: PpeLevel,
    length_of_stay: f64,
}

fn finalize(profile: &HospitalProfile, d: &DynamicsConfig, raw: Finished) -> LiveState {
    let beds = f64::from(raw.capacity.beds);
    let icu_beds = f64::from(raw.capacity.icu_beds);
    let occupied_beds = raw.occupied_beds.clamp(0.0, beds);
    let occupied_icu_beds = raw.occupied_icu_beds.clamp(0.0, icu_beds);

    let bed_occupancy_pct = percent(occupied_beds, beds);
    let bed_status = classify(d, bed_occupancy_pct);
    let available_beds = if bed_status == BedStatus::AtCapacity {
        0.0
    } else {
        (beds - occupied_beds).max(0.0)
    };

    LiveState {
        hospital_id: profile.id,
        region: profile.region,
        occupied_beds,
        occupied_icu_beds,
        bed_occupancy_pct,
        icu_occupancy_pct: percent(occupied_icu_beds, icu_beds),
        available_beds,
        available_icu_beds: (icu_beds - occupied_icu_beds).max(0.0),
        staff_fatigue_score: clamp_range(raw.fatigue, FATIGUE_RANGE),
        patient_satisfaction_pct: clamp_range(raw.satisfaction, SATISFACTION_RANGE),
        current_wait_minutes: clamp_range(raw.wait, WAIT_RANGE),
        oxygen_supply_days: raw.oxygen.max(0.0),
        ppe_stock_level: raw.ppe,
        length_of_stay_days: raw.length_of_stay.max(d.min_alos_days),
        bed_status,
        capacity: raw.capacity,
        override_active: raw.override_active,
    }
}

/// `part / whole * 100`, clamped to `[0, 100]`; 0 when `whole` is 0.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn clamp_range(value: f64, (lo, hi): (f64, f64)) -> f64 {
    value.clamp(lo, hi)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bedgrid_types::{GeoPoint, Ownership, Region};
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn profile(id: u32, region: Region, ownership: Ownership, beds: u32) -> HospitalProfile {
        HospitalProfile {
            id: HospitalId(id),
            name: format!("Hospital {id}"),
            ownership,
            region,
            district: String::new(),
            total_beds: beds,
            total_icu_beds: beds / 10,
            avg_wait_minutes: 60.0,
            avg_length_of_stay_days: 5.0,
            ed_throughput_per_day: f64::from(beds) * 0.4,
            coordinates: GeoPoint { lat: 20.0, lon: 78.0 },
            oxygen_supply_days: 8.0,
            ppe_stock_level: PpeLevel::Low,
        }
    }

    fn ctx(d: &DynamicsConfig) -> TickContext<'_> {
        TickContext {
            dynamics: d,
            incident: IncidentState::default(),
            nodal_override: None,
            now: Utc::now(),
        }
    }

    fn assert_bounds(state: &LiveState) {
        let beds = f64::from(state.capacity.beds);
        let icu = f64::from(state.capacity.icu_beds);
        assert!((0.0..=beds).contains(&state.occupied_beds));
        assert!((0.0..=icu).contains(&state.occupied_icu_beds));
        assert!((10.0..=100.0).contains(&state.staff_fatigue_score));
        assert!((30.0..=95.0).contains(&state.patient_satisfaction_pct));
        assert!((20.0..=300.0).contains(&state.current_wait_minutes));
        assert!((0.0..=100.0).contains(&state.bed_occupancy_pct));
        assert!(state.oxygen_supply_days >= 0.0);
        assert!(state.length_of_stay_days >= 1.0);
        if state.bed_status == BedStatus::AtCapacity {
            assert!(state.available_beds.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn long_run_stays_in_bounds() {
        let d = DynamicsConfig::national();
        let mut rng = StdRng::seed_from_u64(11);
        let p = profile(1, Region::West, Ownership::StateGovernment, 40);
        let mut state = initial_state(&p, &d, None, &mut rng);
        for tick in 0..2000 {
            let input = HospitalInput {
                profile: &p,
                previous: &state,
                in_cohort: tick % 3 == 0,
                anchor: None,
            };
            state = update_hospital(&ctx(&d), &input, &mut rng).state;
            assert_bounds(&state);
        }
    }

    #[test]
    fn flow_is_rate_limited() {
        let d = DynamicsConfig::national();
        let mut rng = StdRng::seed_from_u64(12);
        let p = profile(2, Region::South, Ownership::PrivateLarge, 800);
        let state = initial_state(&p, &d, None, &mut rng);
        for _ in 0..200 {
            let input = HospitalInput {
                profile: &p,
                previous: &state,
                in_cohort: true,
                anchor: None,
            };
            let out = update_hospital(&ctx(&d), &input, &mut rng);
            assert!(out.flow.limited_delta.abs() <= d.max_bed_change_per_tick);
            let step = (out.state.occupied_beds - state.occupied_beds).abs();
            assert!(step <= d.max_step_pct / 100.0 * 800.0 + 1e-9);
        }
    }

    #[test]
    fn incident_shock_is_non_positive_and_regional() {
        let d = DynamicsConfig::national();
        let north = profile(3, Region::North, Ownership::CentralGovernment, 500);
        let south = profile(4, Region::South, Ownership::CentralGovernment, 500);
        let mut rng = StdRng::seed_from_u64(13);
        let north_state = initial_state(&north, &d, None, &mut rng);
        let south_state = initial_state(&south, &d, None, &mut rng);

        let mut incident_ctx = ctx(&d);
        incident_ctx.incident = IncidentState::active(Region::North);

        let mut rng = StdRng::seed_from_u64(14);
        let hit = update_hospital(
            &incident_ctx,
            &HospitalInput {
                profile: &north,
                previous: &north_state,
                in_cohort: false,
                anchor: None,
            },
            &mut rng,
        );
        let spared = update_hospital(
            &incident_ctx,
            &HospitalInput {
                profile: &south,
                previous: &south_state,
                in_cohort: false,
                anchor: None,
            },
            &mut rng,
        );
        assert!(hit.flow.incident_shock < 0.0);
        assert!(spared.flow.incident_shock.abs() < f64::EPSILON);
    }

    #[test]
    fn override_substitutes_capacity_until_expiry() {
        let d = DynamicsConfig::national();
        let p = profile(5, Region::East, Ownership::StateGovernment, 300);
        let mut rng = StdRng::seed_from_u64(15);
        let state = initial_state(&p, &d, None, &mut rng);
        let now = Utc::now();
        let ov = NodalOverride {
            hospital_id: p.id,
            total_beds: 350,
            total_icu_beds: 40,
            oxygen_supply_days: 2.0,
            active_until: now + Duration::minutes(5),
        };

        let mut active = ctx(&d);
        active.nodal_override = Some(&ov);
        active.now = now;
        let input = HospitalInput {
            profile: &p,
            previous: &state,
            in_cohort: false,
            anchor: None,
        };
        let out = update_hospital(&active, &input, &mut rng);
        assert!(out.state.override_active);
        assert_eq!(out.state.capacity.beds, 350);
        assert_eq!(out.state.capacity.icu_beds, 40);
        assert!(out.state.oxygen_supply_days <= 2.0 + d.resupply_max_days);

        active.now = now + Duration::minutes(6);
        let out = update_hospital(&active, &input, &mut rng);
        assert!(!out.state.override_active);
        assert_eq!(out.state.capacity.beds, 300);
    }

    #[test]
    fn override_shrinking_capacity_clamps_occupancy() {
        let d = DynamicsConfig::national();
        let p = profile(6, Region::East, Ownership::PrivateMid, 200);
        let mut rng = StdRng::seed_from_u64(16);
        let state = initial_state(&p, &d, None, &mut rng);
        let ov = NodalOverride {
            hospital_id: p.id,
            total_beds: 20,
            total_icu_beds: 2,
            oxygen_supply_days: 5.0,
            active_until: Utc::now() + Duration::minutes(5),
        };
        let mut active = ctx(&d);
        active.nodal_override = Some(&ov);
        let out = update_hospital(
            &active,
            &HospitalInput {
                profile: &p,
                previous: &state,
                in_cohort: false,
                anchor: None,
            },
            &mut rng,
        );
        assert_bounds(&out.state);
        assert!(out.state.occupied_beds <= 20.0);
    }

    #[test]
    fn anchor_holds_its_targets() {
        let d = DynamicsConfig::national();
        let anchor = AnchorConfig::new(150);
        let p = profile(150, Region::South, Ownership::StateGovernment, 1100);
        let mut rng = StdRng::seed_from_u64(17);
        let mut state = initial_state(&p, &d, Some(&anchor), &mut rng);
        assert!((state.bed_occupancy_pct - 75.0).abs() < 1e-9);
        assert!((state.current_wait_minutes - 120.0).abs() < 1e-9);

        for _ in 0..300 {
            let input = HospitalInput {
                profile: &p,
                previous: &state,
                in_cohort: false,
                anchor: Some(&anchor),
            };
            state = update_hospital(&ctx(&d), &input, &mut rng).state;
        }
        assert!((state.bed_occupancy_pct - 75.0).abs() < 10.0);
        assert!((state.current_wait_minutes - 131.0).abs() <= 1.5 + 1e-9);
    }

    #[test]
    fn cohort_members_climb() {
        let d = DynamicsConfig {
            noise_amplitude: 0.0,
            strain_noise_amplitude: 0.0,
            ..DynamicsConfig::national()
        };
        let p = profile(7, Region::Central, Ownership::StateGovernment, 1000);
        let mut rng = StdRng::seed_from_u64(18);
        let mut state = initial_state(&p, &d, None, &mut rng);
        for _ in 0..60 {
            let input = HospitalInput {
                profile: &p,
                previous: &state,
                in_cohort: true,
                anchor: None,
            };
            state = update_hospital(&ctx(&d), &input, &mut rng).state;
        }
        assert!(state.bed_occupancy_pct > 85.0);
    }

    #[test]
    fn status_thresholds() {
        let d = DynamicsConfig::national();
        assert_eq!(classify(&d, 50.0), BedStatus::Available);
        assert_eq!(classify(&d, 80.0), BedStatus::Available);
        assert_eq!(classify(&d, 80.1), BedStatus::HighOccupancy);
        assert_eq!(classify(&d, 95.1), BedStatus::Critical);
        assert_eq!(classify(&d, 100.0), BedStatus::AtCapacity);
    }

    #[test]
    fn wait_factor_is_flat_then_superlinear() {
        let d = DynamicsConfig::strategic_portal();
        assert!((occupancy_wait_factor(&d, 0.5) - 1.0).abs() < f64::EPSILON);
        let step1 = occupancy_wait_factor(&d, 0.85) - occupancy_wait_factor(&d, 0.8);
        let step2 = occupancy_wait_factor(&d, 0.9) - occupancy_wait_factor(&d, 0.85);
        assert!(step2 > step1);
    }

    #[test]
    fn zero_icu_capacity_reports_zero() {
        let d = DynamicsConfig::national();
        let mut p = profile(8, Region::West, Ownership::PrivateTrust, 50);
        p.total_icu_beds = 0;
        let mut rng = StdRng::seed_from_u64(19);
        let state = initial_state(&p, &d, None, &mut rng);
        let out = update_hospital(
            &ctx(&d),
            &HospitalInput {
                profile: &p,
                previous: &state,
                in_cohort: false,
                anchor: None,
            },
            &mut rng,
        );
        assert!(out.state.icu_occupancy_pct.abs() < f64::EPSILON);
        assert!(out.state.occupied_icu_beds.abs() < f64::EPSILON);
    }

    #[test]
    fn consumes_fixed_draws() {
        let d = DynamicsConfig::national();
        let p = profile(9, Region::North, Ownership::PrivateMid, 100);
        let mut seed_rng = StdRng::seed_from_u64(20);
        let state = initial_state(&p, &d, None, &mut seed_rng);

        let mut incident_ctx = ctx(&d);
        incident_ctx.incident = IncidentState::active(Region::North);
        let input = HospitalInput {
            profile: &p,
            previous: &state,
            in_cohort: false,
            anchor: None,
        };

        let mut a = StdRng::seed_from_u64(21);
        let mut b = StdRng::seed_from_u64(21);
        let _ = update_hospital(&ctx(&d), &input, &mut a);
        let _ = update_hospital(&incident_ctx, &input, &mut b);
        assert_eq!(a.random::<u64>(), b.random::<u64>());
    }
}
