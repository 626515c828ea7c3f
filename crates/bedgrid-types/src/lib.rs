//! Shared type definitions for the `BedGrid` capacity simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the `BedGrid` workspace. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Hospital and subscription identifiers
//! - [`enums`] -- Regions, ownership, PPE levels, bed status
//! - [`structs`] -- Profiles, live state, control inputs, history, snapshots

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BedStatus, Ownership, PpeLevel, Region, Sector};
pub use ids::{HospitalId, SubscriptionId};
pub use structs::{
    EffectiveCapacity, EngineSnapshot, GeoPoint, HistoryPoint, HospitalHistoryPoint,
    HospitalProfile, IncidentState, LiveState, NodalOverride, RankedHospital, TransferCandidate,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes bindings for every #[ts(export)] type; the files land
        // in `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::HospitalId::export_all();
        let _ = crate::ids::SubscriptionId::export_all();

        // Enums
        let _ = crate::enums::Region::export_all();
        let _ = crate::enums::Ownership::export_all();
        let _ = crate::enums::Sector::export_all();
        let _ = crate::enums::PpeLevel::export_all();
        let _ = crate::enums::BedStatus::export_all();

        // Structs
        let _ = crate::structs::GeoPoint::export_all();
        let _ = crate::structs::HospitalProfile::export_all();
        let _ = crate::structs::EffectiveCapacity::export_all();
        let _ = crate::structs::LiveState::export_all();
        let _ = crate::structs::NodalOverride::export_all();
        let _ = crate::structs::IncidentState::export_all();
        let _ = crate::structs::HistoryPoint::export_all();
        let _ = crate::structs::EngineSnapshot::export_all();
        let _ = crate::structs::HospitalHistoryPoint::export_all();
        let _ = crate::structs::TransferCandidate::export_all();
        let _ = crate::structs::RankedHospital::export_all();
    }
}
