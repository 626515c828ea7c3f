//! Immutable hospital profile catalog for the `BedGrid` simulation.
//!
//! The catalog is loaded once at startup, either from the dataset compiled
//! into this crate or from a JSON/YAML file named in configuration. Loading
//! validates every profile; a catalog that exists is guaranteed to be
//! non-empty, free of duplicate ids, and numerically usable by the update
//! rule.
//!
//! # Modules
//!
//! - [`error`] -- [`CatalogError`] variants for I/O, parsing, and validation

pub mod error;

use std::collections::BTreeMap;
use std::path::Path;

use bedgrid_types::{HospitalId, HospitalProfile, Region, Sector};
use tracing::info;

pub use error::CatalogError;

/// The compiled-in national dataset.
const BUILTIN_DATASET: &str = include_str!("../data/hospitals.json");

/// Read-only set of hospital profiles, in source order.
#[derive(Debug, Clone)]
pub struct Catalog {
    profiles: Vec<HospitalProfile>,
    index: BTreeMap<HospitalId, usize>,
}

impl Catalog {
    /// Build a catalog from already-parsed profiles.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Empty`] when `profiles` is empty,
    /// [`CatalogError::DuplicateId`] when two profiles share an id, and
    /// [`CatalogError::InvalidProfile`] when a profile fails validation.
    pub fn new(profiles: Vec<HospitalProfile>) -> Result<Self, CatalogError> {
        if profiles.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = BTreeMap::new();
        for (position, profile) in profiles.iter().enumerate() {
            validate_profile(profile)?;
            if index.insert(profile.id, position).is_some() {
                return Err(CatalogError::DuplicateId { id: profile.id });
            }
        }

        Ok(Self { profiles, index })
    }

    /// Load the dataset compiled into the crate.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the embedded dataset fails validation.
    pub fn builtin() -> Result<Self, CatalogError> {
        let catalog = Self::from_json(BUILTIN_DATASET)?;
        info!(hospitals = catalog.len(), "Loaded built-in hospital catalog");
        Ok(catalog)
    }

    /// Load a catalog from a file.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML; everything else
    /// is parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, a parse
    /// error if the content is malformed, or a validation error.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let catalog = if is_yaml {
            Self::from_yaml(&contents)?
        } else {
            Self::from_json(&contents)?
        };
        info!(
            path = %path.display(),
            hospitals = catalog.len(),
            "Loaded hospital catalog from file"
        );
        Ok(catalog)
    }

    /// Parse a JSON array of profiles.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] on malformed input, or a validation
    /// error.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let profiles: Vec<HospitalProfile> = serde_json::from_str(json)?;
        Self::new(profiles)
    }

    /// Parse a YAML sequence of profiles.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Yaml`] on malformed input, or a validation
    /// error.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let profiles: Vec<HospitalProfile> = serde_yml::from_str(yaml)?;
        Self::new(profiles)
    }

    /// Number of hospitals.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always `false` for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate profiles in source order.
    pub fn iter(&self) -> impl Iterator<Item = &HospitalProfile> {
        self.profiles.iter()
    }

    /// All profiles as a slice, in source order.
    pub fn profiles(&self) -> &[HospitalProfile] {
        &self.profiles
    }

    /// Look up a profile by id.
    pub fn get(&self, id: HospitalId) -> Option<&HospitalProfile> {
        self.index
            .get(&id)
            .and_then(|&position| self.profiles.get(position))
    }

    /// Whether `id` names a hospital in the catalog.
    pub fn contains(&self, id: HospitalId) -> bool {
        self.index.contains_key(&id)
    }

    /// Ids of every hospital in `sector`, in source order.
    pub fn sector_ids(&self, sector: Sector) -> Vec<HospitalId> {
        self.profiles
            .iter()
            .filter(|p| p.ownership.sector() == sector)
            .map(|p| p.id)
            .collect()
    }

    /// Profiles located in `region`, in source order.
    pub fn in_region(&self, region: Region) -> impl Iterator<Item = &HospitalProfile> {
        self.profiles.iter().filter(move |p| p.region == region)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a HospitalProfile;
    type IntoIter = std::slice::Iter<'a, HospitalProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_profile(profile: &HospitalProfile) -> Result<(), CatalogError> {
    let invalid = |reason: &str| CatalogError::InvalidProfile {
        id: profile.id,
        reason: reason.to_owned(),
    };

    if profile.name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if profile.total_beds == 0 {
        return Err(invalid("total_beds must be positive"));
    }
    if profile.total_icu_beds > profile.total_beds {
        return Err(invalid("total_icu_beds exceeds total_beds"));
    }
    if !is_positive(profile.avg_wait_minutes) {
        return Err(invalid("avg_wait_minutes must be positive and finite"));
    }
    if !is_positive(profile.avg_length_of_stay_days) {
        return Err(invalid("avg_length_of_stay_days must be positive and finite"));
    }
    if !is_non_negative(profile.ed_throughput_per_day) {
        return Err(invalid("ed_throughput_per_day must be non-negative and finite"));
    }
    if !is_non_negative(profile.oxygen_supply_days) {
        return Err(invalid("oxygen_supply_days must be non-negative and finite"));
    }
    let point = profile.coordinates;
    if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lon) {
        return Err(invalid("coordinates out of range"));
    }
    Ok(())
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
