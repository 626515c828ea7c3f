//! Configuration loading and typed config structures for `BedGrid`.
//!
//! The canonical configuration lives in `bedgrid-config.yaml` at the project
//! root. Every section is optional; missing sections and fields fall back to
//! the national defaults. The update-rule constants are grouped into named
//! per-deployment tables ([`DynamicsProfile`]) that individual fields can
//! override.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A dynamics override did not fit the constant table.
    #[error("invalid dynamics override: {source}")]
    Override {
        /// The underlying conversion error.
        #[from]
        source: serde_json::Error,
    },

    /// A value is out of its permitted range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `bedgrid-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Tick loop and random-seed settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Where hospital profiles come from.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Update-rule constant table selection.
    #[serde(default)]
    pub dynamics: DynamicsSection,

    /// High-strain cohort policy.
    #[serde(default)]
    pub cohort: CohortConfig,

    /// Hospitals pinned to fixed baselines.
    #[serde(default = "default_anchors")]
    pub anchors: Vec<AnchorConfig>,

    /// Observer HTTP/WebSocket server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            catalog: CatalogConfig::default(),
            dynamics: DynamicsSection::default(),
            cohort: CohortConfig::default(),
            anchors: default_anchors(),
            observer: ObserverConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `BEDGRID_SEED` overrides `engine.seed`
    /// - `BEDGRID_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or a
    /// validation error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Environment overrides are not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `BEDGRID_*` environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override fields from an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("BEDGRID_SEED") {
            match val.trim().parse() {
                Ok(seed) => self.engine.seed = seed,
                Err(_) => warn!(value = %val, "Ignoring unparseable BEDGRID_SEED"),
            }
        }
        if let Some(val) = lookup("BEDGRID_PORT") {
            match val.trim().parse() {
                Ok(port) => self.observer.port = port,
                Err(_) => warn!(value = %val, "Ignoring unparseable BEDGRID_PORT"),
            }
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.dynamics.resolve()?;
        if matches!(&self.cohort, CohortConfig::Static { ids } if ids.is_empty()) {
            return Err(invalid("cohort.ids must not be empty for the static strategy"));
        }
        for anchor in &self.anchors {
            anchor.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Tick loop, history, and seeding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Ticks run synchronously before the first publication.
    #[serde(default = "default_bootstrap_ticks")]
    pub bootstrap_ticks: u32,

    /// Spacing between back-dated bootstrap timestamps.
    #[serde(default = "default_bootstrap_spacing_secs")]
    pub bootstrap_spacing_secs: u64,

    /// Fixed length of the history ring.
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    /// Lower bound of the jittered inter-tick delay.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Upper bound of the jittered inter-tick delay.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Stop after this many live ticks. 0 means unlimited.
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            bootstrap_ticks: default_bootstrap_ticks(),
            bootstrap_spacing_secs: default_bootstrap_spacing_secs(),
            history_len: default_history_len(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            max_ticks: 0,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_len == 0 {
            return Err(invalid("engine.history_len must be at least 1"));
        }
        if self.min_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(invalid(format!(
                "engine.min_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            )));
        }
        if self.min_interval_ms > self.max_interval_ms {
            return Err(invalid("engine.min_interval_ms exceeds engine.max_interval_ms"));
        }
        Ok(())
    }
}

/// Smallest inter-tick delay the loop accepts, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Profile source selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// JSON or YAML file of profiles. The built-in dataset is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Cohort
// ---------------------------------------------------------------------------

/// How the high-strain cohort is chosen each tick.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CohortConfig {
    /// Re-draw a fixed number of public and private hospitals every tick.
    Rotating {
        /// Public-sector hospitals per draw.
        #[serde(default = "default_cohort_public")]
        public: usize,
        /// Private-sector hospitals per draw.
        #[serde(default = "default_cohort_private")]
        private: usize,
    },
    /// A fixed list of hospital ids.
    Static {
        /// Cohort members.
        #[serde(default = "default_static_cohort")]
        ids: Vec<u32>,
    },
    /// No hospital is ever in the cohort.
    None,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self::Rotating {
            public: default_cohort_public(),
            private: default_cohort_private(),
        }
    }
}

// ---------------------------------------------------------------------------
// Anchors
// ---------------------------------------------------------------------------

/// Fixed baselines for one demo-stable hospital.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnchorConfig {
    /// The pinned hospital.
    pub hospital_id: u32,

    /// Initial and target bed occupancy.
    #[serde(default = "default_anchor_occupancy_pct")]
    pub occupancy_pct: f64,

    /// Target ICU occupancy.
    #[serde(default = "default_anchor_icu_occupancy_pct")]
    pub icu_occupancy_pct: f64,

    /// Initial and target staff fatigue.
    #[serde(default = "default_anchor_fatigue")]
    pub fatigue: f64,

    /// Initial and target patient satisfaction.
    #[serde(default = "default_anchor_satisfaction")]
    pub satisfaction: f64,

    /// Wait time at startup.
    #[serde(default = "default_anchor_initial_wait")]
    pub initial_wait_minutes: f64,

    /// Wait time held during the run.
    #[serde(default = "default_anchor_wait")]
    pub wait_minutes: f64,
}

impl AnchorConfig {
    /// Anchor with the default baselines.
    pub const fn new(hospital_id: u32) -> Self {
        Self {
            hospital_id,
            occupancy_pct: default_anchor_occupancy_pct(),
            icu_occupancy_pct: default_anchor_icu_occupancy_pct(),
            fatigue: default_anchor_fatigue(),
            satisfaction: default_anchor_satisfaction(),
            initial_wait_minutes: default_anchor_initial_wait(),
            wait_minutes: default_anchor_wait(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let pct_fields = [
            ("occupancy_pct", self.occupancy_pct),
            ("icu_occupancy_pct", self.icu_occupancy_pct),
        ];
        for (name, value) in pct_fields {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(format!(
                    "anchor {}: {name} must be within 0..=100",
                    self.hospital_id
                )));
            }
        }
        if !self.wait_minutes.is_finite() || !self.initial_wait_minutes.is_finite() {
            return Err(invalid(format!(
                "anchor {}: wait times must be finite",
                self.hospital_id
            )));
        }
        if !self.fatigue.is_finite() || !self.satisfaction.is_finite() {
            return Err(invalid(format!(
                "anchor {}: score targets must be finite",
                self.hospital_id
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dynamics
// ---------------------------------------------------------------------------

/// Named per-deployment constant tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicsProfile {
    /// Strategic national overview: strong rotating surges.
    #[default]
    National,
    /// Citizen-facing portal: calmer, slower-moving numbers.
    PublicPortal,
    /// Strategic command view: faster reversion, sharper wait penalty.
    StrategicPortal,
}

/// The `dynamics` config section: a profile plus per-field overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DynamicsSection {
    /// Base constant table.
    #[serde(default)]
    pub profile: DynamicsProfile,

    /// Field-name to value overrides applied on top of the profile.
    #[serde(default)]
    pub overrides: serde_json::Map<String, serde_json::Value>,
}

impl DynamicsSection {
    /// Resolve the profile table with overrides applied, then validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Override`] for unknown field names or
    /// mistyped values, and [`ConfigError::Invalid`] if the resolved table
    /// fails [`DynamicsConfig::validate`].
    pub fn resolve(&self) -> Result<DynamicsConfig, ConfigError> {
        let base = DynamicsConfig::for_profile(self.profile);
        let dynamics = if self.overrides.is_empty() {
            base
        } else {
            let mut table = serde_json::to_value(base)?;
            if let serde_json::Value::Object(fields) = &mut table {
                for (key, value) in &self.overrides {
                    fields.insert(key.clone(), value.clone());
                }
            }
            serde_json::from_value(table)?
        };
        dynamics.validate()?;
        Ok(dynamics)
    }
}

/// Every tunable constant of the update rule.
///
/// Amplitudes written as "spread" are half-widths: the draw is uniform in
/// `[-spread, spread]`. Noise amplitudes are full widths, so the draw is
/// `(u - 0.5) * amplitude`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DynamicsConfig {
    // Initialization
    /// Starting occupancy for public hospitals.
    pub public_initial_pct: f64,
    /// Starting occupancy for private hospitals.
    pub private_initial_pct: f64,
    /// Half-width of the starting occupancy draw.
    pub initial_spread_pct: f64,
    /// Ceiling on starting occupancy.
    pub initial_cap_pct: f64,
    /// Half-width of the starting ICU offset from general occupancy.
    pub icu_initial_spread_pct: f64,
    /// Starting staff fatigue.
    pub initial_fatigue: f64,
    /// Starting patient satisfaction.
    pub initial_satisfaction: f64,
    /// Half-width of the starting fatigue and satisfaction draws.
    pub initial_score_spread: f64,

    // Bed flow
    /// Half-width of the per-tick length-of-stay jitter.
    pub alos_jitter_days: f64,
    /// Share of ED arrivals that become admissions.
    pub admission_fraction: f64,
    /// Flow noise amplitude for ordinary hospitals.
    pub noise_amplitude: f64,
    /// Flow noise amplitude for cohort members.
    pub strain_noise_amplitude: f64,
    /// Beds of extra admissions per tick in an incident region.
    pub incident_shock_beds: f64,
    /// Extra admissions in an incident region, percent of capacity.
    pub incident_shock_pct: f64,
    /// Clamp on the absolute bed-flow delta.
    pub max_bed_change_per_tick: f64,
    /// Clamp on the combined flow and drift change, percent of capacity.
    pub max_step_pct: f64,
    /// Floor on occupied beds.
    pub min_occupied_beds: f64,

    // Drift
    /// Public resting target.
    pub public_baseline_pct: f64,
    /// Public cohort target.
    pub public_strain_baseline_pct: f64,
    /// Private resting target.
    pub private_baseline_pct: f64,
    /// Private cohort target.
    pub private_strain_baseline_pct: f64,
    /// Drift coefficient for cohort members.
    pub drift_climb: f64,
    /// Drift coefficient above target.
    pub drift_release: f64,
    /// Drift coefficient at or below target.
    pub drift_recovery: f64,

    // ICU
    /// Offset of the ICU target from general occupancy.
    pub icu_bias_pct: f64,
    /// Half-width of the ICU target noise.
    pub icu_noise_pct: f64,
    /// ICU drift coefficient.
    pub icu_drift: f64,
    /// Probability of each one-bed ICU jitter event.
    pub icu_jitter_probability: f64,
    /// Multiplier on the admit-side jitter probability in an incident region.
    pub incident_icu_pressure: f64,

    // Fatigue
    /// Fatigue gain per unit of strain above the reference.
    pub fatigue_strain_weight: f64,
    /// Occupancy fraction at which strain stops adding fatigue.
    pub fatigue_reference_strain: f64,
    /// Fatigue level staff recover toward.
    pub fatigue_recovery_target: f64,
    /// Fatigue recovery coefficient.
    pub fatigue_recovery_rate: f64,
    /// Fatigue noise amplitude.
    pub fatigue_noise: f64,
    /// Clamp on per-tick fatigue change.
    pub max_fatigue_change: f64,

    // Satisfaction
    /// Satisfaction level patients recover toward.
    pub satisfaction_recovery_target: f64,
    /// Satisfaction recovery coefficient.
    pub satisfaction_recovery_rate: f64,
    /// Satisfaction lost per fatigue point above the recovery target.
    pub satisfaction_fatigue_weight: f64,
    /// Satisfaction lost per unit of relative wait above baseline.
    pub satisfaction_wait_weight: f64,
    /// Satisfaction noise amplitude.
    pub satisfaction_noise: f64,
    /// Clamp on per-tick satisfaction change.
    pub max_satisfaction_change: f64,

    // Wait time
    /// Wait multiplier per fatigue fraction.
    pub wait_fatigue_weight: f64,
    /// Occupancy fraction above which wait grows.
    pub wait_strain_threshold: f64,
    /// Linear wait growth per unit of excess strain.
    pub wait_strain_slope: f64,
    /// Quadratic wait growth per unit of excess strain squared.
    pub wait_strain_curvature: f64,

    // Anchors
    /// Anchor fatigue gain per unit of strain.
    pub anchor_fatigue_strain_weight: f64,
    /// Anchor reference strain.
    pub anchor_reference_strain: f64,
    /// Anchor fatigue recovery coefficient.
    pub anchor_fatigue_recovery_rate: f64,
    /// Anchor fatigue noise amplitude.
    pub anchor_fatigue_noise: f64,
    /// Anchor wait noise amplitude.
    pub anchor_wait_noise: f64,
    /// Anchor satisfaction recovery coefficient.
    pub anchor_satisfaction_recovery_rate: f64,
    /// Anchor satisfaction lost per unit of relative wait.
    pub anchor_satisfaction_wait_weight: f64,
    /// Anchor satisfaction noise amplitude.
    pub anchor_satisfaction_noise: f64,

    // Length of stay
    /// Days added per unit of strain above the reference.
    pub alos_strain_weight: f64,
    /// Strain at which length of stay equals the profile value.
    pub alos_reference_strain: f64,
    /// Days added per unit of fatigue fraction above the reference.
    pub alos_fatigue_weight: f64,
    /// Fatigue fraction at which length of stay equals the profile value.
    pub alos_reference_fatigue: f64,
    /// Floor on live length of stay.
    pub min_alos_days: f64,

    // Resources
    /// Oxygen days burned per unit of ICU occupancy.
    pub oxygen_icu_burn: f64,
    /// Oxygen days burned per unit of bed occupancy.
    pub oxygen_bed_burn: f64,
    /// Stock below which resupply can happen.
    pub resupply_threshold_days: f64,
    /// Probability of a resupply on an eligible tick.
    pub resupply_probability: f64,
    /// Smallest resupply.
    pub resupply_min_days: f64,
    /// Largest resupply (exclusive).
    pub resupply_max_days: f64,
    /// Probability that a PPE step is attempted.
    pub ppe_step_probability: f64,
    /// Probability an attempted step improves stock.
    pub ppe_improve_probability: f64,
    /// Probability an attempted step worsens stock.
    pub ppe_worsen_probability: f64,

    // Status
    /// Occupancy above which status is `HighOccupancy`.
    pub high_occupancy_pct: f64,
    /// Occupancy above which status is `Critical`.
    pub critical_pct: f64,
    /// Occupancy at or above which status is `AtCapacity`.
    pub at_capacity_pct: f64,
    /// Occupancy above which a hospital counts toward the critical total.
    pub critical_count_pct: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self::national()
    }
}

impl DynamicsConfig {
    /// The constant table for a named profile.
    pub fn for_profile(profile: DynamicsProfile) -> Self {
        match profile {
            DynamicsProfile::National => Self::national(),
            DynamicsProfile::PublicPortal => Self::public_portal(),
            DynamicsProfile::StrategicPortal => Self::strategic_portal(),
        }
    }

    /// National overview defaults.
    pub const fn national() -> Self {
        Self {
            public_initial_pct: 65.0,
            private_initial_pct: 55.0,
            initial_spread_pct: 3.0,
            initial_cap_pct: 96.0,
            icu_initial_spread_pct: 5.0,
            initial_fatigue: 61.0,
            initial_satisfaction: 71.0,
            initial_score_spread: 2.5,

            alos_jitter_days: 0.1,
            admission_fraction: 0.24,
            noise_amplitude: 9.0,
            strain_noise_amplitude: 10.0,
            incident_shock_beds: 3.0,
            incident_shock_pct: 0.0,
            max_bed_change_per_tick: 4.0,
            max_step_pct: 10.0,
            min_occupied_beds: 5.0,

            public_baseline_pct: 65.0,
            public_strain_baseline_pct: 93.0,
            private_baseline_pct: 55.0,
            private_strain_baseline_pct: 89.0,
            drift_climb: 0.4,
            drift_release: 0.12,
            drift_recovery: 0.1,

            icu_bias_pct: 0.0,
            icu_noise_pct: 5.0,
            icu_drift: 0.1,
            icu_jitter_probability: 0.12,
            incident_icu_pressure: 1.5,

            fatigue_strain_weight: 6.0,
            fatigue_reference_strain: 0.78,
            fatigue_recovery_target: 61.0,
            fatigue_recovery_rate: 0.25,
            fatigue_noise: 2.0,
            max_fatigue_change: 1.5,

            satisfaction_recovery_target: 71.0,
            satisfaction_recovery_rate: 0.15,
            satisfaction_fatigue_weight: 1.0,
            satisfaction_wait_weight: 12.0,
            satisfaction_noise: 2.5,
            max_satisfaction_change: 2.0,

            wait_fatigue_weight: 0.3,
            wait_strain_threshold: 0.8,
            wait_strain_slope: 12.0,
            wait_strain_curvature: 0.0,

            anchor_fatigue_strain_weight: 1.8,
            anchor_reference_strain: 0.8,
            anchor_fatigue_recovery_rate: 0.1,
            anchor_fatigue_noise: 1.0,
            anchor_wait_noise: 3.0,
            anchor_satisfaction_recovery_rate: 0.1,
            anchor_satisfaction_wait_weight: 2.0,
            anchor_satisfaction_noise: 1.0,

            alos_strain_weight: 2.5,
            alos_reference_strain: 0.75,
            alos_fatigue_weight: 1.5,
            alos_reference_fatigue: 0.6,
            min_alos_days: 1.0,

            oxygen_icu_burn: 0.05,
            oxygen_bed_burn: 0.01,
            resupply_threshold_days: 10.0,
            resupply_probability: 0.15,
            resupply_min_days: 5.0,
            resupply_max_days: 20.0,
            ppe_step_probability: 0.05,
            ppe_improve_probability: 0.3,
            ppe_worsen_probability: 0.1,

            high_occupancy_pct: 80.0,
            critical_pct: 95.0,
            at_capacity_pct: 99.5,
            critical_count_pct: 85.0,
        }
    }

    /// Citizen-facing portal table: gentler flow, uniform drift, no
    /// resupply or PPE movement.
    pub const fn public_portal() -> Self {
        Self {
            public_initial_pct: 71.5,
            private_initial_pct: 60.0,
            initial_spread_pct: 3.5,

            noise_amplitude: 4.5,
            strain_noise_amplitude: 4.5,
            max_bed_change_per_tick: 2.5,

            public_baseline_pct: 72.0,
            public_strain_baseline_pct: 88.0,
            private_baseline_pct: 60.0,
            private_strain_baseline_pct: 88.0,
            drift_climb: 0.25,
            drift_release: 0.25,
            drift_recovery: 0.25,

            icu_drift: 0.0,

            fatigue_strain_weight: 0.9,
            fatigue_recovery_rate: 0.1,
            fatigue_noise: 0.4,
            max_fatigue_change: 0.5,

            satisfaction_recovery_rate: 0.08,
            satisfaction_fatigue_weight: 0.22,
            satisfaction_wait_weight: 4.5,
            satisfaction_noise: 1.0,
            max_satisfaction_change: 0.75,

            wait_fatigue_weight: 0.2,
            wait_strain_slope: 5.0,

            anchor_fatigue_strain_weight: 1.5,
            anchor_fatigue_noise: 0.5,

            alos_strain_weight: 0.15,
            alos_reference_strain: 0.78,
            alos_fatigue_weight: 0.15,

            oxygen_icu_burn: 0.015,
            oxygen_bed_burn: 0.004,
            resupply_probability: 0.0,
            ppe_step_probability: 0.0,

            ..Self::national()
        }
    }

    /// Strategic command table: faster reversion and a super-linear wait
    /// penalty under strain.
    pub const fn strategic_portal() -> Self {
        Self {
            noise_amplitude: 8.0,
            strain_noise_amplitude: 8.0,
            max_bed_change_per_tick: 3.5,

            public_baseline_pct: 72.0,
            public_strain_baseline_pct: 88.0,
            private_baseline_pct: 60.0,
            private_strain_baseline_pct: 88.0,
            drift_climb: 0.4,
            drift_release: 0.4,
            drift_recovery: 0.4,

            fatigue_strain_weight: 2.5,
            fatigue_recovery_rate: 0.1,
            fatigue_noise: 0.4,

            satisfaction_recovery_rate: 0.08,
            satisfaction_fatigue_weight: 0.5,
            satisfaction_wait_weight: 8.0,
            satisfaction_noise: 1.0,

            wait_fatigue_weight: 0.2,
            wait_strain_slope: 10.0,
            wait_strain_curvature: 15.0,

            alos_strain_weight: 0.15,
            alos_reference_strain: 0.78,
            alos_fatigue_weight: 0.15,

            oxygen_icu_burn: 0.015,
            oxygen_bed_burn: 0.004,

            ..Self::national()
        }
    }

    /// Reject non-finite values and inverted or out-of-range bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.non_negative_fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "dynamics.{name} must be finite and non-negative"
                )));
            }
        }
        if !self.icu_bias_pct.is_finite() {
            return Err(invalid("dynamics.icu_bias_pct must be finite"));
        }
        for (name, value) in self.probability_fields() {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("dynamics.{name} must be within 0..=1")));
            }
        }
        if self.max_step_pct <= 0.0 {
            return Err(invalid("dynamics.max_step_pct must be positive"));
        }
        if self.min_alos_days <= 0.0 {
            return Err(invalid("dynamics.min_alos_days must be positive"));
        }
        if self.resupply_min_days > self.resupply_max_days {
            return Err(invalid(
                "dynamics.resupply_min_days exceeds dynamics.resupply_max_days",
            ));
        }
        if !(self.high_occupancy_pct < self.critical_pct
            && self.critical_pct < self.at_capacity_pct
            && self.at_capacity_pct <= 100.0)
        {
            return Err(invalid(
                "dynamics status thresholds must satisfy high < critical < at_capacity <= 100",
            ));
        }
        Ok(())
    }

    const fn probability_fields(&self) -> [(&'static str, f64); 6] {
        [
            ("icu_jitter_probability", self.icu_jitter_probability),
            ("resupply_probability", self.resupply_probability),
            ("ppe_step_probability", self.ppe_step_probability),
            ("ppe_improve_probability", self.ppe_improve_probability),
            ("ppe_worsen_probability", self.ppe_worsen_probability),
            ("admission_fraction", self.admission_fraction),
        ]
    }

    const fn non_negative_fields(&self) -> [(&'static str, f64); 70] {
        [
            ("public_initial_pct", self.public_initial_pct),
            ("private_initial_pct", self.private_initial_pct),
            ("initial_spread_pct", self.initial_spread_pct),
            ("initial_cap_pct", self.initial_cap_pct),
            ("icu_initial_spread_pct", self.icu_initial_spread_pct),
            ("initial_fatigue", self.initial_fatigue),
            ("initial_satisfaction", self.initial_satisfaction),
            ("initial_score_spread", self.initial_score_spread),
            ("alos_jitter_days", self.alos_jitter_days),
            ("admission_fraction", self.admission_fraction),
            ("noise_amplitude", self.noise_amplitude),
            ("strain_noise_amplitude", self.strain_noise_amplitude),
            ("incident_shock_beds", self.incident_shock_beds),
            ("incident_shock_pct", self.incident_shock_pct),
            ("max_bed_change_per_tick", self.max_bed_change_per_tick),
            ("max_step_pct", self.max_step_pct),
            ("min_occupied_beds", self.min_occupied_beds),
            ("public_baseline_pct", self.public_baseline_pct),
            ("public_strain_baseline_pct", self.public_strain_baseline_pct),
            ("private_baseline_pct", self.private_baseline_pct),
            ("private_strain_baseline_pct", self.private_strain_baseline_pct),
            ("drift_climb", self.drift_climb),
            ("drift_release", self.drift_release),
            ("drift_recovery", self.drift_recovery),
            ("icu_noise_pct", self.icu_noise_pct),
            ("icu_drift", self.icu_drift),
            ("icu_jitter_probability", self.icu_jitter_probability),
            ("incident_icu_pressure", self.incident_icu_pressure),
            ("fatigue_strain_weight", self.fatigue_strain_weight),
            ("fatigue_reference_strain", self.fatigue_reference_strain),
            ("fatigue_recovery_target", self.fatigue_recovery_target),
            ("fatigue_recovery_rate", self.fatigue_recovery_rate),
            ("fatigue_noise", self.fatigue_noise),
            ("max_fatigue_change", self.max_fatigue_change),
            ("satisfaction_recovery_target", self.satisfaction_recovery_target),
            ("satisfaction_recovery_rate", self.satisfaction_recovery_rate),
            ("satisfaction_fatigue_weight", self.satisfaction_fatigue_weight),
            ("satisfaction_wait_weight", self.satisfaction_wait_weight),
            ("satisfaction_noise", self.satisfaction_noise),
            ("max_satisfaction_change", self.max_satisfaction_change),
            ("wait_fatigue_weight", self.wait_fatigue_weight),
            ("wait_strain_threshold", self.wait_strain_threshold),
            ("wait_strain_slope", self.wait_strain_slope),
            ("wait_strain_curvature", self.wait_strain_curvature),
            ("anchor_fatigue_strain_weight", self.anchor_fatigue_strain_weight),
            ("anchor_reference_strain", self.anchor_reference_strain),
            ("anchor_fatigue_recovery_rate", self.anchor_fatigue_recovery_rate),
            ("anchor_fatigue_noise", self.anchor_fatigue_noise),
            ("anchor_wait_noise", self.anchor_wait_noise),
            (
                "anchor_satisfaction_recovery_rate",
                self.anchor_satisfaction_recovery_rate,
            ),
            (
                "anchor_satisfaction_wait_weight",
                self.anchor_satisfaction_wait_weight,
            ),
            ("anchor_satisfaction_noise", self.anchor_satisfaction_noise),
            ("alos_strain_weight", self.alos_strain_weight),
            ("alos_reference_strain", self.alos_reference_strain),
            ("alos_fatigue_weight", self.alos_fatigue_weight),
            ("alos_reference_fatigue", self.alos_reference_fatigue),
            ("min_alos_days", self.min_alos_days),
            ("oxygen_icu_burn", self.oxygen_icu_burn),
            ("oxygen_bed_burn", self.oxygen_bed_burn),
            ("resupply_threshold_days", self.resupply_threshold_days),
            ("resupply_probability", self.resupply_probability),
            ("resupply_min_days", self.resupply_min_days),
            ("resupply_max_days", self.resupply_max_days),
            ("ppe_step_probability", self.ppe_step_probability),
            ("ppe_improve_probability", self.ppe_improve_probability),
            ("ppe_worsen_probability", self.ppe_worsen_probability),
            ("high_occupancy_pct", self.high_occupancy_pct),
            ("critical_pct", self.critical_pct),
            ("at_capacity_pct", self.at_capacity_pct),
            ("critical_count_pct", self.critical_count_pct),
        ]
    }
}

// ---------------------------------------------------------------------------
// Observer and logging
// ---------------------------------------------------------------------------

/// Observer HTTP/WebSocket server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether to start the server at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_bootstrap_ticks() -> u32 {
    30
}

const fn default_bootstrap_spacing_secs() -> u64 {
    60
}

const fn default_history_len() -> usize {
    30
}

const fn default_min_interval_ms() -> u64 {
    2000
}

const fn default_max_interval_ms() -> u64 {
    5000
}

const fn default_cohort_public() -> usize {
    6
}

const fn default_cohort_private() -> usize {
    9
}

fn default_static_cohort() -> Vec<u32> {
    vec![9, 10, 15, 17, 23, 62, 67, 70, 99, 105, 122, 135, 146]
}

fn default_anchors() -> Vec<AnchorConfig> {
    vec![AnchorConfig::new(150)]
}

const fn default_anchor_occupancy_pct() -> f64 {
    75.0
}

const fn default_anchor_icu_occupancy_pct() -> f64 {
    74.0
}

const fn default_anchor_fatigue() -> f64 {
    70.0
}

const fn default_anchor_satisfaction() -> f64 {
    68.0
}

const fn default_anchor_initial_wait() -> f64 {
    120.0
}

const fn default_anchor_wait() -> f64 {
    131.0
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.seed, 42);
        assert_eq!(config.engine.history_len, 30);
        assert_eq!(config.engine.bootstrap_ticks, 30);
        assert_eq!(config.anchors.len(), 1);
        assert_eq!(config.anchors.first().map(|a| a.hospital_id), Some(150));
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = SimulationConfig::parse(include_str!("../../../bedgrid-config.yaml"));
        assert_eq!(config.ok(), Some(SimulationConfig::default()));
    }

    #[test]
    fn every_profile_validates() {
        for profile in [
            DynamicsProfile::National,
            DynamicsProfile::PublicPortal,
            DynamicsProfile::StrategicPortal,
        ] {
            assert!(DynamicsConfig::for_profile(profile).validate().is_ok());
        }
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
engine:
  seed: 7
  bootstrap_ticks: 10
  history_len: 12
  min_interval_ms: 500
  max_interval_ms: 900
  max_ticks: 100

catalog:
  path: data/hospitals.yaml

dynamics:
  profile: public_portal
  overrides:
    max_bed_change_per_tick: 3.0

cohort:
  strategy: static
  ids: [1, 2, 3]

anchors:
  - hospital_id: 31
    occupancy_pct: 80.0

observer:
  host: 127.0.0.1
  port: 9000

logging:
  level: debug
  json: true
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.engine.seed, 7);
        assert_eq!(config.engine.max_ticks, 100);
        assert_eq!(
            config.catalog.path.as_deref(),
            Some(Path::new("data/hospitals.yaml"))
        );
        assert_eq!(config.cohort, CohortConfig::Static { ids: vec![1, 2, 3] });
        assert_eq!(config.observer.port, 9000);
        assert!(config.logging.json);

        let anchor = config.anchors.first().unwrap();
        assert_eq!(anchor.hospital_id, 31);
        assert!((anchor.wait_minutes - 131.0).abs() < f64::EPSILON);

        let dynamics = config.dynamics.resolve().unwrap();
        assert!((dynamics.max_bed_change_per_tick - 3.0).abs() < f64::EPSILON);
        assert!((dynamics.noise_amplitude - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn rotating_cohort_defaults() {
        let config = SimulationConfig::parse("cohort:\n  strategy: rotating\n").unwrap();
        assert_eq!(
            config.cohort,
            CohortConfig::Rotating {
                public: 6,
                private: 9
            }
        );
    }

    #[test]
    fn unknown_override_is_rejected() {
        let yaml = "dynamics:\n  overrides:\n    not_a_field: 1.0\n";
        let err = SimulationConfig::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Override { .. }));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let dynamics = DynamicsConfig {
            high_occupancy_pct: 96.0,
            ..DynamicsConfig::national()
        };
        assert!(matches!(
            dynamics.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn nan_is_rejected() {
        let dynamics = DynamicsConfig {
            drift_climb: f64::NAN,
            ..DynamicsConfig::national()
        };
        assert!(dynamics.validate().is_err());
    }

    #[test]
    fn interval_window_is_checked() {
        let yaml = "engine:\n  min_interval_ms: 50\n";
        assert!(SimulationConfig::parse(yaml).is_err());
        let yaml = "engine:\n  min_interval_ms: 3000\n  max_interval_ms: 2000\n";
        assert!(SimulationConfig::parse(yaml).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let vars: BTreeMap<&str, &str> =
            BTreeMap::from([("BEDGRID_SEED", "99"), ("BEDGRID_PORT", "not-a-port")]);
        let mut config = SimulationConfig::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| (*v).to_owned()));
        assert_eq!(config.engine.seed, 99);
        assert_eq!(config.observer.port, 8080);
    }
}
