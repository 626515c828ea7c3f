//! Mutable live-state table, one record per catalog hospital.

use std::collections::BTreeMap;

use bedgrid_catalog::Catalog;
use bedgrid_types::{HospitalId, LiveState};
use rand::Rng;

use crate::config::DynamicsConfig;
use crate::update::{Anchors, initial_state};

/// Live state for every hospital, kept in catalog order.
#[derive(Debug, Clone, Default)]
pub struct LiveStateStore {
    states: Vec<LiveState>,
    index: BTreeMap<HospitalId, usize>,
}

impl LiveStateStore {
    /// Synthesize starting states for the whole catalog.
    pub fn initialize<R: Rng + ?Sized>(
        catalog: &Catalog,
        dynamics: &DynamicsConfig,
        anchors: &Anchors,
        rng: &mut R,
    ) -> Self {
        let states = catalog
            .iter()
            .map(|profile| initial_state(profile, dynamics, anchors.get(&profile.id), rng))
            .collect();
        Self::from_states(states)
    }

    /// Wrap states that are already in catalog order.
    pub fn from_states(states: Vec<LiveState>) -> Self {
        let index = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.hospital_id, i))
            .collect();
        Self { states, index }
    }

    /// State of one hospital.
    pub fn get(&self, id: HospitalId) -> Option<&LiveState> {
        self.index.get(&id).and_then(|i| self.states.get(*i))
    }

    /// All states, in catalog order.
    pub fn as_slice(&self) -> &[LiveState] {
        &self.states
    }

    /// Number of hospitals tracked.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Swap in a full tick's worth of new states.
    ///
    /// `states` must be in the same order as the current contents.
    pub(crate) fn replace(&mut self, states: Vec<LiveState>) {
        debug_assert_eq!(states.len(), self.states.len());
        self.states = states;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::AnchorConfig;
    use crate::update::anchor_map;

    #[test]
    fn initializes_every_hospital_in_order() {
        let catalog = Catalog::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let store = LiveStateStore::initialize(
            &catalog,
            &DynamicsConfig::national(),
            &Anchors::new(),
            &mut rng,
        );
        assert_eq!(store.len(), catalog.len());
        for (profile, state) in catalog.iter().zip(store.as_slice()) {
            assert_eq!(profile.id, state.hospital_id);
            assert!(state.bed_occupancy_pct <= 96.0 + 1e-9);
            assert!(state.occupied_icu_beds <= f64::from(profile.total_icu_beds));
        }
    }

    #[test]
    fn anchors_start_at_their_baseline() {
        let catalog = Catalog::builtin().unwrap();
        let anchors = anchor_map(&[AnchorConfig::new(150)]);
        let mut rng = StdRng::seed_from_u64(42);
        let store = LiveStateStore::initialize(
            &catalog,
            &DynamicsConfig::national(),
            &anchors,
            &mut rng,
        );
        let theni = store.get(HospitalId(150)).unwrap();
        assert!((theni.bed_occupancy_pct - 75.0).abs() < 1e-9);
        assert!((theni.staff_fatigue_score - 70.0).abs() < 1e-9);
        assert!((theni.patient_satisfaction_pct - 68.0).abs() < 1e-9);
    }

    #[test]
    fn lookup_misses_unknown_ids() {
        let store = LiveStateStore::default();
        assert!(store.get(HospitalId(1)).is_none());
        assert!(store.is_empty());
    }
}
