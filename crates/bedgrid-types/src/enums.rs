//! Enumeration types for the `BedGrid` capacity simulation.
//!
//! Regions, ownership categories, PPE stock levels, and the derived bed
//! status shown on every dashboard view.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// One of the five named zones the national network is partitioned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Region {
    /// Northern zone.
    North,
    /// Southern zone.
    South,
    /// Eastern zone.
    East,
    /// Western zone.
    West,
    /// Central zone.
    Central,
}

impl Region {
    /// Every region, in the order used by history aggregation.
    pub const ALL: [Self; 5] = [
        Self::North,
        Self::South,
        Self::East,
        Self::West,
        Self::Central,
    ];

    /// Human-readable zone name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::South => "South",
            Self::East => "East",
            Self::West => "West",
            Self::Central => "Central",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// Ownership category of a hospital.
///
/// The three government variants form the public sector; the remaining
/// variants are private. Baseline occupancy targets and cohort selection
/// are split along that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Ownership {
    /// Government (Central).
    CentralGovernment,
    /// Government (State).
    StateGovernment,
    /// Government (Union Territory).
    UnionTerritory,
    /// Private (Large).
    PrivateLarge,
    /// Private (Mid-size).
    PrivateMid,
    /// Private (Trust).
    PrivateTrust,
    /// Private (Speciality).
    PrivateSpeciality,
}

impl Ownership {
    /// The sector this ownership category belongs to.
    pub const fn sector(self) -> Sector {
        match self {
            Self::CentralGovernment | Self::StateGovernment | Self::UnionTerritory => {
                Sector::Public
            }
            Self::PrivateLarge
            | Self::PrivateMid
            | Self::PrivateTrust
            | Self::PrivateSpeciality => Sector::Private,
        }
    }

    /// Whether the hospital is government-run.
    pub const fn is_public(self) -> bool {
        matches!(self.sector(), Sector::Public)
    }
}

/// Public or private sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Sector {
    /// Central, state, and union-territory government hospitals.
    Public,
    /// All privately run hospitals.
    Private,
}

// ---------------------------------------------------------------------------
// PPE stock
// ---------------------------------------------------------------------------

/// Ordinal personal-protective-equipment stock level.
///
/// Ordered from best (`Good`) to worst (`Stockout`); the derived `Ord`
/// follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PpeLevel {
    /// Comfortable stock.
    Good,
    /// Running low.
    Low,
    /// Critically low.
    Critical,
    /// Nothing left.
    Stockout,
}

impl PpeLevel {
    /// One step towards `Good`, saturating at `Good`.
    pub const fn improved(self) -> Self {
        match self {
            Self::Good | Self::Low => Self::Good,
            Self::Critical => Self::Low,
            Self::Stockout => Self::Critical,
        }
    }

    /// One step towards `Stockout`, saturating at `Stockout`.
    pub const fn worsened(self) -> Self {
        match self {
            Self::Good => Self::Low,
            Self::Low => Self::Critical,
            Self::Critical | Self::Stockout => Self::Stockout,
        }
    }
}

// ---------------------------------------------------------------------------
// Bed status
// ---------------------------------------------------------------------------

/// Status band derived from general-ward bed occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BedStatus {
    /// Beds readily available.
    Available,
    /// Occupancy above the high-occupancy band.
    HighOccupancy,
    /// Occupancy above the critical band.
    Critical,
    /// Full; no beds are reported available.
    AtCapacity,
}

impl BedStatus {
    /// Whether the hospital should be skipped as a transfer destination.
    pub const fn refuses_transfers(self) -> bool {
        matches!(self, Self::Critical | Self::AtCapacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_sectors() {
        assert!(Ownership::CentralGovernment.is_public());
        assert!(Ownership::StateGovernment.is_public());
        assert!(Ownership::UnionTerritory.is_public());
        assert!(!Ownership::PrivateTrust.is_public());
        assert_eq!(Ownership::PrivateSpeciality.sector(), Sector::Private);
    }

    #[test]
    fn ppe_walk_saturates() {
        assert_eq!(PpeLevel::Good.improved(), PpeLevel::Good);
        assert_eq!(PpeLevel::Stockout.worsened(), PpeLevel::Stockout);
        assert_eq!(PpeLevel::Low.worsened(), PpeLevel::Critical);
        assert_eq!(PpeLevel::Critical.improved(), PpeLevel::Low);
        assert!(PpeLevel::Good < PpeLevel::Stockout);
    }

    #[test]
    fn ownership_serializes_snake_case() {
        let json = serde_json::to_string(&Ownership::PrivateMid).ok();
        assert_eq!(json.as_deref(), Some("\"private_mid\""));
    }

    #[test]
    fn region_display() {
        assert_eq!(Region::Central.to_string(), "Central");
        assert_eq!(Region::ALL.len(), 5);
    }
}
