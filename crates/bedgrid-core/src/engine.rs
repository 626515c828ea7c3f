//! The simulation engine.
//!
//! [`Engine`] owns the live-state store, the history ring, the cohort
//! strategy, and the random source. It is the single writer of all
//! simulation state. Each tick:
//!
//! 1. Copy the staged [`ControlState`] from the hub
//! 2. Select the high-strain cohort
//! 3. Run the update rule over every hospital, in catalog order
//! 4. Aggregate into a [`HistoryPoint`] and push it onto the ring
//! 5. Build an immutable [`EngineSnapshot`] and publish it
//!
//! [`ControlState`]: crate::hub::ControlState

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bedgrid_catalog::{Catalog, CatalogError};
use bedgrid_types::{EngineSnapshot, HistoryPoint, HospitalId};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{HistoryBuffer, aggregate};
use crate::clock::{Clock, SystemClock};
use crate::cohort::{self, StrainCohortStrategy};
use crate::config::{ConfigError, DynamicsConfig, SimulationConfig};
use crate::hub::SubscriptionHub;
use crate::store::LiveStateStore;
use crate::update::{self, Anchors, FlowBreakdown, HospitalInput, TickContext};

/// Errors raised while building an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The profile catalog could not be loaded.
    #[error("catalog error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: CatalogError,
    },

    /// The configuration is invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// Initial state could not be synthesized from the inputs.
    #[error("invalid initial state: {reason}")]
    InvalidInitialState {
        /// What was wrong.
        reason: String,
    },
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSummary {
    /// Tick counter after this tick.
    pub tick: u64,
    /// Instant the tick was computed at.
    pub timestamp: DateTime<Utc>,
    /// Hospitals in this tick's high-strain cohort.
    pub cohort: BTreeSet<HospitalId>,
    /// Per-hospital bed-flow breakdown.
    pub flows: BTreeMap<HospitalId, FlowBreakdown>,
    /// The history point appended by this tick.
    pub point: HistoryPoint,
}

/// The hospital-capacity simulation engine.
pub struct Engine<R = StdRng> {
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    hub: Arc<SubscriptionHub>,
    dynamics: DynamicsConfig,
    anchors: Anchors,
    cohort: Box<dyn StrainCohortStrategy>,
    store: LiveStateStore,
    history: HistoryBuffer,
    rng: R,
    tick: u64,
    last_tick_at: DateTime<Utc>,
    bootstrap_ticks: u32,
    bootstrap_spacing_secs: u64,
}

impl<R> std::fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("hospitals", &self.store.len())
            .field("tick", &self.tick)
            .field("cohort", &self.cohort.name())
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Engine<StdRng> {
    /// Build an engine from configuration, loading the catalog it names
    /// and reading the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the catalog cannot be loaded or the
    /// configuration is invalid.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, EngineError> {
        let catalog = match &config.catalog.path {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::builtin()?,
        };
        Self::new(config, Arc::new(catalog), Arc::new(SystemClock))
    }

    /// Build an engine seeded from `config.engine.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the dynamics table is invalid or an
    /// anchor names an unknown hospital.
    pub fn new(
        config: &SimulationConfig,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let rng = StdRng::seed_from_u64(config.engine.seed);
        Self::with_rng(config, catalog, clock, rng)
    }
}

impl<R: RngCore> Engine<R> {
    /// Build an engine over an injected random source.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the dynamics table is invalid or an
    /// anchor names an unknown hospital.
    pub fn with_rng(
        config: &SimulationConfig,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        mut rng: R,
    ) -> Result<Self, EngineError> {
        let dynamics = config.dynamics.resolve()?;
        let anchors = update::anchor_map(&config.anchors);
        if let Some(unknown) = anchors.keys().find(|id| !catalog.contains(**id)) {
            return Err(EngineError::InvalidInitialState {
                reason: format!("anchor hospital {unknown} is not in the catalog"),
            });
        }

        let store = LiveStateStore::initialize(&catalog, &dynamics, &anchors, &mut rng);
        let now = clock.now();
        let history = HistoryBuffer::new(config.engine.history_len, now);
        let strategy = cohort::from_config(&config.cohort, &catalog);
        let hub = Arc::new(SubscriptionHub::new(Arc::clone(&catalog), Arc::clone(&clock)));

        info!(
            hospitals = catalog.len(),
            profile = ?config.dynamics.profile,
            cohort = strategy.name(),
            anchors = anchors.len(),
            history_len = history.capacity(),
            "Engine initialized"
        );

        Ok(Self {
            catalog,
            clock,
            hub,
            dynamics,
            anchors,
            cohort: strategy,
            store,
            history,
            rng,
            tick: 0,
            last_tick_at: now,
            bootstrap_ticks: config.engine.bootstrap_ticks,
            bootstrap_spacing_secs: config.engine.bootstrap_spacing_secs,
        })
    }

    /// Replace the cohort strategy.
    #[must_use]
    pub fn with_cohort(mut self, strategy: Box<dyn StrainCohortStrategy>) -> Self {
        self.cohort = strategy;
        self
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Run the bootstrap ticks with back-dated timestamps, mark the hub
    /// ready, and publish the first snapshot.
    ///
    /// Calling it again after the engine is ready only republishes.
    pub fn bootstrap(&mut self) -> Arc<EngineSnapshot> {
        if self.hub.is_ready() {
            return self.publish();
        }

        let now = self.clock.now();
        for step in 0..self.bootstrap_ticks {
            let remaining = self.bootstrap_ticks.saturating_sub(step).saturating_sub(1);
            let back_secs = self
                .bootstrap_spacing_secs
                .saturating_mul(u64::from(remaining));
            let offset = i64::try_from(back_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or_else(Duration::zero);
            let at = now.checked_sub_signed(offset).unwrap_or(now);
            self.tick_at(at);
        }

        self.hub.mark_ready();
        let snapshot = self.publish();
        info!(
            ticks = self.bootstrap_ticks,
            avg_occupancy_pct = self.history.latest().map_or(0.0, |p| p.avg_occupancy_pct),
            "Bootstrap complete"
        );
        snapshot
    }

    /// Advance one tick at the clock's current instant, without publishing.
    pub fn tick(&mut self) -> TickSummary {
        let now = self.clock.now();
        self.tick_at(now)
    }

    /// Advance one tick and publish the resulting snapshot.
    pub fn step(&mut self) -> TickSummary {
        let summary = self.tick();
        self.publish();
        summary
    }

    fn tick_at(&mut self, now: DateTime<Utc>) -> TickSummary {
        let control = self.hub.staged_control();
        let cohort = self.cohort.select(&mut self.rng);

        let ctx = TickContext {
            dynamics: &self.dynamics,
            incident: control.incident,
            nodal_override: control.nodal_override.as_ref(),
            now,
        };

        let mut flows = BTreeMap::new();
        let mut next = Vec::with_capacity(self.store.len());
        for (profile, previous) in self.catalog.iter().zip(self.store.as_slice()) {
            let input = HospitalInput {
                profile,
                previous,
                in_cohort: cohort.contains(&profile.id),
                anchor: self.anchors.get(&profile.id),
            };
            let outcome = update::update_hospital(&ctx, &input, &mut self.rng);
            flows.insert(profile.id, outcome.flow);
            next.push(outcome.state);
        }
        self.store.replace(next);

        let point = aggregate(
            self.store.as_slice(),
            now,
            self.dynamics.critical_count_pct,
        );
        self.history.push(point.clone());
        self.tick = self.tick.saturating_add(1);
        self.last_tick_at = now;

        debug!(
            tick = self.tick,
            cohort = cohort.len(),
            avg_occupancy_pct = point.avg_occupancy_pct,
            critical = point.critical_hospital_count,
            incident = control.incident.is_active,
            "Tick complete"
        );

        TickSummary {
            tick: self.tick,
            timestamp: now,
            cohort,
            flows,
            point,
        }
    }

    /// Build the current snapshot and hand it to the hub.
    pub fn publish(&self) -> Arc<EngineSnapshot> {
        let snapshot = Arc::new(self.snapshot());
        self.hub.publish(&snapshot);
        snapshot
    }

    /// Build an immutable snapshot of the current state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            tick: self.tick,
            generated_at: self.last_tick_at,
            hospitals: self.store.as_slice().to_vec(),
            history: self.history.to_vec(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The hub consumers subscribe to.
    pub const fn hub(&self) -> &Arc<SubscriptionHub> {
        &self.hub
    }

    /// Ticks run so far, bootstrap included.
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Current live states.
    pub const fn store(&self) -> &LiveStateStore {
        &self.store
    }

    /// Current history ring.
    pub const fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// The immutable catalog.
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Resolved dynamics table.
    pub const fn dynamics(&self) -> &DynamicsConfig {
        &self.dynamics
    }

    /// Name of the active cohort strategy.
    pub fn cohort_name(&self) -> &'static str {
        self.cohort.name()
    }
}
