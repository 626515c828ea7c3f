//! Snapshot distribution and the two control inlets.
//!
//! The [`SubscriptionHub`] is the engine's only outward boundary. Consumers
//! register callbacks, read the latest [`EngineSnapshot`], and stage
//! incident and nodal-override changes. The engine copies the staged
//! [`ControlState`] once at the start of each tick, so control writes never
//! affect a tick that is already running.
//!
//! # Delivery
//!
//! Every tick publishes one immutable `Arc<EngineSnapshot>`. The callback
//! list is cloned out of the registry lock before delivery, so callbacks may
//! subscribe or unsubscribe from inside a delivery. Each call is wrapped in
//! [`std::panic::catch_unwind`]; a panicking callback is logged and counted
//! and the remaining callbacks still run.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bedgrid_catalog::Catalog;
use bedgrid_types::{
    EngineSnapshot, HistoryPoint, HospitalId, IncidentState, LiveState, NodalOverride,
    SubscriptionId,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::clock::Clock;

/// Callback invoked with every published snapshot.
pub type SnapshotCallback = Arc<dyn Fn(&Arc<EngineSnapshot>) + Send + Sync>;

/// Rejected control input. The staged value is left unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    /// The override names a hospital that is not in the catalog.
    #[error("unknown hospital id {id}")]
    UnknownHospital {
        /// The unknown id.
        id: HospitalId,
    },

    /// The override's `active_until` is already in the past.
    #[error("override for hospital {id} expired at {active_until}")]
    OverrideExpired {
        /// Target hospital.
        id: HospitalId,
        /// The stale expiry.
        active_until: DateTime<Utc>,
    },

    /// The override carries unusable capacity figures.
    #[error("invalid override for hospital {id}: {reason}")]
    InvalidOverride {
        /// Target hospital.
        id: HospitalId,
        /// What was wrong.
        reason: String,
    },

    /// An active incident must name the affected region.
    #[error("an active incident must name a region")]
    IncidentWithoutRegion,
}

/// Control inputs staged for the next tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlState {
    /// Current incident declaration.
    pub incident: IncidentState,
    /// Current nodal override, if any.
    pub nodal_override: Option<NodalOverride>,
}

/// Registry of snapshot subscribers plus the staged control inputs.
pub struct SubscriptionHub {
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    control: Mutex<ControlState>,
    snapshot: RwLock<Option<Arc<EngineSnapshot>>>,
    subscribers: Mutex<BTreeMap<SubscriptionId, SnapshotCallback>>,
    ready: AtomicBool,
    faults: AtomicU64,
}

impl fmt::Debug for SubscriptionHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHub")
            .field("hospitals", &self.catalog.len())
            .field("control", &*self.control.lock())
            .field("subscribers", &self.subscriber_count())
            .field("ready", &self.is_ready())
            .field("faults", &self.fault_count())
            .finish_non_exhaustive()
    }
}

impl SubscriptionHub {
    /// Create an empty hub over `catalog`, reading time from `clock`.
    pub fn new(catalog: Arc<Catalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            clock,
            control: Mutex::new(ControlState::default()),
            snapshot: RwLock::new(None),
            subscribers: Mutex::new(BTreeMap::new()),
            ready: AtomicBool::new(false),
            faults: AtomicU64::new(0),
        }
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register `callback` for every future snapshot.
    ///
    /// If the engine has already bootstrapped, the current snapshot is
    /// delivered immediately, before this returns.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&Arc<EngineSnapshot>) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let callback: SnapshotCallback = Arc::new(callback);
        self.subscribers.lock().insert(id, Arc::clone(&callback));
        debug!(subscription_id = %id, "Subscriber registered");

        if self.is_ready() {
            if let Some(snapshot) = self.snapshot() {
                self.deliver(id, &callback, &snapshot);
            }
        }

        Subscription {
            id,
            hub: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber. Unknown or already-removed ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.subscribers.lock().remove(&id).is_some() {
            debug!(subscription_id = %id, "Subscriber removed");
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Number of callback invocations that panicked.
    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    // -----------------------------------------------------------------------
    // Publication (engine side)
    // -----------------------------------------------------------------------

    /// Swap in a new snapshot and deliver it to every current subscriber.
    pub(crate) fn publish(&self, snapshot: &Arc<EngineSnapshot>) {
        *self.snapshot.write() = Some(Arc::clone(snapshot));

        let callbacks: Vec<(SubscriptionId, SnapshotCallback)> = self
            .subscribers
            .lock()
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();

        for (id, callback) in &callbacks {
            self.deliver(*id, callback, snapshot);
        }
    }

    /// Mark the engine as bootstrapped.
    pub(crate) fn mark_ready(&self) {
        if !self.ready.swap(true, Ordering::AcqRel) {
            info!(hospitals = self.catalog.len(), "Engine ready");
        }
    }

    /// Copy of the staged control inputs.
    pub(crate) fn staged_control(&self) -> ControlState {
        self.control.lock().clone()
    }

    fn deliver(&self, id: SubscriptionId, callback: &SnapshotCallback, snapshot: &Arc<EngineSnapshot>) {
        let outcome = catch_unwind(AssertUnwindSafe(|| callback(snapshot)));
        if outcome.is_err() {
            self.faults.fetch_add(1, Ordering::Relaxed);
            warn!(
                subscription_id = %id,
                tick = snapshot.tick,
                "Subscriber panicked during delivery"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Control inlets
    // -----------------------------------------------------------------------

    /// Replace the incident declaration, effective from the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::IncidentWithoutRegion`] for an active
    /// incident with no region.
    pub fn set_incident_state(&self, state: IncidentState) -> Result<(), ControlError> {
        if state.is_active && state.region.is_none() {
            warn!("Rejected incident without a region");
            return Err(ControlError::IncidentWithoutRegion);
        }
        self.control.lock().incident = state;
        info!(active = state.is_active, region = ?state.region, "Incident state staged");
        Ok(())
    }

    /// Replace or clear the nodal override, effective from the next tick.
    ///
    /// # Errors
    ///
    /// Returns a [`ControlError`] when the hospital is unknown, the expiry
    /// is already past, or the capacity figures are unusable.
    pub fn set_nodal_override(&self, nodal_override: Option<NodalOverride>) -> Result<(), ControlError> {
        if let Some(ov) = &nodal_override {
            if let Err(e) = self.check_override(ov) {
                warn!(hospital_id = %ov.hospital_id, error = %e, "Rejected nodal override");
                return Err(e);
            }
        }
        match &nodal_override {
            Some(ov) => info!(
                hospital_id = %ov.hospital_id,
                total_beds = ov.total_beds,
                total_icu_beds = ov.total_icu_beds,
                active_until = %ov.active_until,
                "Nodal override staged"
            ),
            None => info!("Nodal override cleared"),
        }
        self.control.lock().nodal_override = nodal_override;
        Ok(())
    }

    fn check_override(&self, ov: &NodalOverride) -> Result<(), ControlError> {
        let id = ov.hospital_id;
        if !self.catalog.contains(id) {
            return Err(ControlError::UnknownHospital { id });
        }
        if ov.active_until < self.clock.now() {
            return Err(ControlError::OverrideExpired {
                id,
                active_until: ov.active_until,
            });
        }
        let reason = if ov.total_beds == 0 {
            Some("total_beds must be positive")
        } else if ov.total_icu_beds > ov.total_beds {
            Some("total_icu_beds exceeds total_beds")
        } else if !ov.oxygen_supply_days.is_finite() || ov.oxygen_supply_days < 0.0 {
            Some("oxygen_supply_days must be a finite, non-negative number")
        } else {
            None
        };
        reason.map_or(Ok(()), |reason| {
            Err(ControlError::InvalidOverride {
                id,
                reason: reason.to_owned(),
            })
        })
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Option<Arc<EngineSnapshot>> {
        self.snapshot.read().clone()
    }

    /// Live states from the latest snapshot; empty before bootstrap.
    pub fn live_state(&self) -> Vec<LiveState> {
        self.snapshot()
            .map(|s| s.hospitals.clone())
            .unwrap_or_default()
    }

    /// Live state of one hospital from the latest snapshot.
    pub fn hospital(&self, id: HospitalId) -> Option<LiveState> {
        self.snapshot().and_then(|s| s.hospital(id).cloned())
    }

    /// History ring from the latest snapshot; empty before bootstrap.
    pub fn history(&self) -> Vec<HistoryPoint> {
        self.snapshot()
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// Staged incident declaration.
    pub fn incident_state(&self) -> IncidentState {
        self.control.lock().incident
    }

    /// Staged nodal override.
    pub fn nodal_override(&self) -> Option<NodalOverride> {
        self.control.lock().nodal_override.clone()
    }

    /// Whether the engine has bootstrapped.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// The immutable profile catalog.
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Current instant according to the engine clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Handle returned by [`SubscriptionHub::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    hub: Weak<SubscriptionHub>,
}

impl Subscription {
    /// Registry id.
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop receiving snapshots. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}
