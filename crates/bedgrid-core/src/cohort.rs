//! High-strain cohort selection.
//!
//! Each tick the engine asks its [`StrainCohortStrategy`] which hospitals
//! are surging. Members get a higher drift target, a faster climb, and
//! louder flow noise. The strategy is swappable so tests and calmer
//! deployments can pin or disable the cohort.

use std::collections::BTreeSet;

use bedgrid_catalog::Catalog;
use bedgrid_types::{HospitalId, Sector};
use rand::RngCore;
use rand::seq::IndexedRandom;
use tracing::warn;

use crate::config::CohortConfig;

/// Policy that picks the high-strain cohort for one tick.
pub trait StrainCohortStrategy: Send + Sync {
    /// Short name for logs and status reports.
    fn name(&self) -> &'static str;

    /// Select this tick's cohort.
    fn select(&mut self, rng: &mut dyn RngCore) -> BTreeSet<HospitalId>;
}

/// Build the strategy named by configuration.
pub fn from_config(config: &CohortConfig, catalog: &Catalog) -> Box<dyn StrainCohortStrategy> {
    match config {
        CohortConfig::Rotating { public, private } => {
            Box::new(RotatingCohort::new(catalog, *public, *private))
        }
        CohortConfig::Static { ids } => Box::new(StaticCohort::new(
            catalog,
            ids.iter().copied().map(HospitalId),
        )),
        CohortConfig::None => Box::new(NoStrain),
    }
}

// ---------------------------------------------------------------------------
// Rotating
// ---------------------------------------------------------------------------

/// Re-draws a fixed number of public and private hospitals every tick.
#[derive(Debug, Clone)]
pub struct RotatingCohort {
    public: Vec<HospitalId>,
    private: Vec<HospitalId>,
    public_count: usize,
    private_count: usize,
}

impl RotatingCohort {
    /// Draw `public_count` public and `private_count` private hospitals per
    /// tick. Counts larger than a sector select the whole sector.
    pub fn new(catalog: &Catalog, public_count: usize, private_count: usize) -> Self {
        Self {
            public: catalog.sector_ids(Sector::Public),
            private: catalog.sector_ids(Sector::Private),
            public_count,
            private_count,
        }
    }
}

impl StrainCohortStrategy for RotatingCohort {
    fn name(&self) -> &'static str {
        "rotating"
    }

    fn select(&mut self, rng: &mut dyn RngCore) -> BTreeSet<HospitalId> {
        let mut cohort: BTreeSet<HospitalId> = self
            .public
            .choose_multiple(rng, self.public_count)
            .copied()
            .collect();
        cohort.extend(self.private.choose_multiple(rng, self.private_count).copied());
        cohort
    }
}

// ---------------------------------------------------------------------------
// Static
// ---------------------------------------------------------------------------

/// The same hospitals every tick.
#[derive(Debug, Clone)]
pub struct StaticCohort {
    ids: BTreeSet<HospitalId>,
}

impl StaticCohort {
    /// Fix the cohort to `ids`. Ids missing from the catalog are dropped.
    pub fn new(catalog: &Catalog, ids: impl IntoIterator<Item = HospitalId>) -> Self {
        let ids = ids
            .into_iter()
            .filter(|id| {
                let known = catalog.contains(*id);
                if !known {
                    warn!(hospital_id = %id, "Static cohort names unknown hospital, skipping");
                }
                known
            })
            .collect();
        Self { ids }
    }
}

impl StrainCohortStrategy for StaticCohort {
    fn name(&self) -> &'static str {
        "static"
    }

    fn select(&mut self, _rng: &mut dyn RngCore) -> BTreeSet<HospitalId> {
        self.ids.clone()
    }
}

// ---------------------------------------------------------------------------
// None
// ---------------------------------------------------------------------------

/// Nobody is ever in the cohort.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStrain;

impl StrainCohortStrategy for NoStrain {
    fn name(&self) -> &'static str {
        "none"
    }

    fn select(&mut self, _rng: &mut dyn RngCore) -> BTreeSet<HospitalId> {
        BTreeSet::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    #[test]
    fn rotating_respects_sector_counts() {
        let catalog = catalog();
        let mut strategy = RotatingCohort::new(&catalog, 6, 9);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            let cohort = strategy.select(&mut rng);
            let public = cohort
                .iter()
                .filter(|id| catalog.get(**id).unwrap().ownership.is_public())
                .count();
            assert_eq!(public, 6);
            assert_eq!(cohort.len(), 15);
        }
    }

    #[test]
    fn rotating_changes_between_ticks() {
        let catalog = catalog();
        let mut strategy = RotatingCohort::new(&catalog, 6, 9);
        let mut rng = StdRng::seed_from_u64(2);
        let draws: Vec<_> = (0..5).map(|_| strategy.select(&mut rng)).collect();
        assert!(draws.windows(2).any(|w| w.first() != w.get(1)));
    }

    #[test]
    fn oversized_counts_take_whole_sector() {
        let catalog = catalog();
        let mut strategy = RotatingCohort::new(&catalog, 10_000, 0);
        let mut rng = StdRng::seed_from_u64(3);
        let cohort = strategy.select(&mut rng);
        assert_eq!(cohort.len(), catalog.sector_ids(Sector::Public).len());
    }

    #[test]
    fn static_drops_unknown_ids() {
        let catalog = catalog();
        let mut strategy = StaticCohort::new(&catalog, [HospitalId(9), HospitalId(9999)]);
        let mut rng = StdRng::seed_from_u64(4);
        let cohort = strategy.select(&mut rng);
        assert_eq!(cohort.into_iter().collect::<Vec<_>>(), vec![HospitalId(9)]);
    }

    #[test]
    fn none_is_empty() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(NoStrain.select(&mut rng).is_empty());
    }

    #[test]
    fn config_selects_strategy() {
        let catalog = catalog();
        assert_eq!(from_config(&CohortConfig::default(), &catalog).name(), "rotating");
        assert_eq!(from_config(&CohortConfig::None, &catalog).name(), "none");
        let static_cfg = CohortConfig::Static { ids: vec![10] };
        assert_eq!(from_config(&static_cfg, &catalog).name(), "static");
    }
}
