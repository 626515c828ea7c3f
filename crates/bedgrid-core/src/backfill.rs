//! Synthetic per-hospital back-history for drill-down views.

use bedgrid_types::{HospitalHistoryPoint, HospitalProfile, LiveState};
use chrono::{Days, NaiveDate};
use rand::Rng;

const BASELINE_FATIGUE: f64 = 61.0;
const BASELINE_SATISFACTION: f64 = 71.0;

/// Produce `days` daily points ending at `today`, oldest first.
///
/// The final point is the live state itself. Earlier points ramp toward it
/// with noise and are clamped to plausible ranges.
pub fn hospital_history<R: Rng + ?Sized>(
    profile: &HospitalProfile,
    state: &LiveState,
    days: u32,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<HospitalHistoryPoint> {
    let span = f64::from(days);
    (0..days)
        .rev()
        .map(|ago| {
            let date = today
                .checked_sub_days(Days::new(u64::from(ago)))
                .unwrap_or(NaiveDate::MIN);
            if ago == 0 {
                return HospitalHistoryPoint {
                    date,
                    occupancy_pct: state.bed_occupancy_pct,
                    icu_occupancy_pct: state.icu_occupancy_pct,
                    wait_minutes: state.current_wait_minutes,
                    staff_fatigue: state.staff_fatigue_score,
                    satisfaction: state.patient_satisfaction_pct,
                };
            }

            let progress = (span - f64::from(ago)) / span;
            let occupancy = state.bed_occupancy_pct * (0.95 + progress * 0.05)
                + (rng.random::<f64>() - 0.5) * 4.0;
            let icu = occupancy + 5.0 + (rng.random::<f64>() - 0.5) * 5.0;
            let wait = profile.avg_wait_minutes * (0.9 + progress * 0.1)
                + (rng.random::<f64>() - 0.5) * 10.0;
            let fatigue = BASELINE_FATIGUE + (rng.random::<f64>() - 0.5) * 5.0;
            let satisfaction = BASELINE_SATISFACTION - (1.0 - progress) * 3.0
                + rng.random_range(-1.0..1.0);

            HospitalHistoryPoint {
                date,
                occupancy_pct: occupancy.clamp(50.0, 98.0),
                icu_occupancy_pct: icu.clamp(40.0, 100.0),
                wait_minutes: wait.max(30.0),
                staff_fatigue: fatigue.clamp(10.0, 95.0),
                satisfaction: satisfaction.clamp(30.0, 95.0),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bedgrid_catalog::Catalog;
    use bedgrid_types::HospitalId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::DynamicsConfig;
    use crate::update::initial_state;

    #[test]
    fn ends_at_live_state_and_stays_clamped() {
        let catalog = Catalog::builtin().unwrap();
        let profile = catalog.get(HospitalId(150)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let state = initial_state(profile, &DynamicsConfig::national(), None, &mut rng);
        let today = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();

        let history = hospital_history(profile, &state, 30, today, &mut rng);
        assert_eq!(history.len(), 30);

        let last = history.last().unwrap();
        assert_eq!(last.date, today);
        assert!((last.occupancy_pct - state.bed_occupancy_pct).abs() < f64::EPSILON);
        assert!((last.wait_minutes - state.current_wait_minutes).abs() < f64::EPSILON);

        assert_eq!(
            history.first().unwrap().date,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );
        for point in history.iter().take(29) {
            assert!((50.0..=98.0).contains(&point.occupancy_pct));
            assert!((40.0..=100.0).contains(&point.icu_occupancy_pct));
            assert!(point.wait_minutes >= 30.0);
            assert!((10.0..=95.0).contains(&point.staff_fatigue));
            assert!((30.0..=95.0).contains(&point.satisfaction));
        }
    }

    #[test]
    fn zero_days_is_empty() {
        let catalog = Catalog::builtin().unwrap();
        let profile = catalog.get(HospitalId(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let state = initial_state(profile, &DynamicsConfig::national(), None, &mut rng);
        let today = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        assert!(hospital_history(profile, &state, 0, today, &mut rng).is_empty());
    }
}
