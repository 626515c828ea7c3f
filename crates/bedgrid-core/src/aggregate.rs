//! Network-wide aggregation and the fixed-length history ring.

use std::collections::{BTreeMap, VecDeque};

use bedgrid_types::{HistoryPoint, LiveState, Region};
use chrono::{DateTime, Utc};

use crate::update::percent;

/// Summarize one tick's states into a [`HistoryPoint`].
///
/// Occupancy figures are weighted by effective capacity; fatigue,
/// satisfaction, and wait are plain means. Hospitals strictly above
/// `critical_count_pct` count as critical. An empty slice yields zeros.
pub fn aggregate(
    states: &[LiveState],
    timestamp: DateTime<Utc>,
    critical_count_pct: f64,
) -> HistoryPoint {
    if states.is_empty() {
        return HistoryPoint::zero(timestamp);
    }
    let n = states.len() as f64;

    let (occupied, capacity) = occupancy_totals(states.iter());
    let regional_occupancy: BTreeMap<Region, f64> = Region::ALL
        .iter()
        .map(|region| {
            let (occ, cap) = occupancy_totals(states.iter().filter(|s| s.region == *region));
            (*region, percent(occ, cap))
        })
        .collect();

    let critical = states
        .iter()
        .filter(|s| s.bed_occupancy_pct > critical_count_pct)
        .count();

    HistoryPoint {
        timestamp,
        avg_occupancy_pct: percent(occupied, capacity),
        avg_staff_fatigue: states.iter().map(|s| s.staff_fatigue_score).sum::<f64>() / n,
        avg_satisfaction: states
            .iter()
            .map(|s| s.patient_satisfaction_pct)
            .sum::<f64>()
            / n,
        avg_wait_minutes: states.iter().map(|s| s.current_wait_minutes).sum::<f64>() / n,
        regional_occupancy,
        critical_hospital_count: u32::try_from(critical).unwrap_or(u32::MAX),
    }
}

fn occupancy_totals<'a>(states: impl Iterator<Item = &'a LiveState>) -> (f64, f64) {
    states.fold((0.0, 0.0), |(occ, cap), s| {
        (occ + s.occupied_beds, cap + f64::from(s.capacity.beds))
    })
}

/// Fixed-length ring of history points, oldest first.
///
/// Starts full of zero points so its length never changes.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl HistoryBuffer {
    /// A ring of `capacity` zero points stamped `timestamp`. A capacity of
    /// zero is raised to one.
    pub fn new(capacity: usize, timestamp: DateTime<Utc>) -> Self {
        let capacity = capacity.max(1);
        let points = std::iter::repeat_with(|| HistoryPoint::zero(timestamp))
            .take(capacity)
            .collect();
        Self { points, capacity }
    }

    /// Append a point, evicting the oldest.
    pub fn push(&mut self, point: HistoryPoint) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Number of points held. Always equals [`Self::capacity`].
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Never true; the ring is pre-filled.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Configured length.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest point.
    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    /// Points oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Owned copy for a snapshot.
    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bedgrid_types::{BedStatus, EffectiveCapacity, HospitalId, PpeLevel};

    use super::*;

    fn state(id: u32, region: Region, beds: u32, occupied: f64, fatigue: f64) -> LiveState {
        LiveState {
            hospital_id: HospitalId(id),
            region,
            occupied_beds: occupied,
            occupied_icu_beds: 0.0,
            bed_occupancy_pct: percent(occupied, f64::from(beds)),
            icu_occupancy_pct: 0.0,
            available_beds: f64::from(beds) - occupied,
            available_icu_beds: 0.0,
            staff_fatigue_score: fatigue,
            patient_satisfaction_pct: 70.0,
            current_wait_minutes: 60.0,
            oxygen_supply_days: 5.0,
            ppe_stock_level: PpeLevel::Good,
            length_of_stay_days: 4.0,
            bed_status: BedStatus::Available,
            capacity: EffectiveCapacity {
                beds,
                icu_beds: 0,
            },
            override_active: false,
        }
    }

    #[test]
    fn occupancy_is_capacity_weighted() {
        let states = vec![
            state(1, Region::North, 100, 90.0, 60.0),
            state(2, Region::North, 900, 450.0, 80.0),
            state(3, Region::South, 100, 88.0, 70.0),
        ];
        let point = aggregate(&states, Utc::now(), 85.0);
        // (90 + 450 + 88) / 1100
        assert!((point.avg_occupancy_pct - 628.0 / 1100.0 * 100.0).abs() < 1e-9);
        assert!((point.avg_staff_fatigue - 70.0).abs() < 1e-9);
        assert!((point.regional_occupancy[&Region::North] - 54.0).abs() < 1e-9);
        assert!((point.regional_occupancy[&Region::South] - 88.0).abs() < 1e-9);
        assert!(point.regional_occupancy[&Region::East].abs() < f64::EPSILON);
        assert_eq!(point.critical_hospital_count, 2);
    }

    #[test]
    fn empty_input_is_zero() {
        let point = aggregate(&[], Utc::now(), 85.0);
        assert!(point.avg_occupancy_pct.abs() < f64::EPSILON);
        assert_eq!(point.regional_occupancy.len(), 5);
    }

    #[test]
    fn ring_length_is_constant() {
        let now = Utc::now();
        let mut ring = HistoryBuffer::new(30, now);
        assert_eq!(ring.len(), 30);
        for i in 0..100_u32 {
            let mut p = HistoryPoint::zero(now);
            p.critical_hospital_count = i;
            ring.push(p);
            assert_eq!(ring.len(), 30);
        }
        assert_eq!(ring.latest().unwrap().critical_hospital_count, 99);
        assert_eq!(ring.iter().next().unwrap().critical_hospital_count, 70);
    }
}
