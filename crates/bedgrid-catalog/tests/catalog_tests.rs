//! Integration tests for catalog loading and validation.

#![allow(clippy::unwrap_used)]

use std::io::Write;

use bedgrid_catalog::{Catalog, CatalogError};
use bedgrid_types::HospitalId;

fn profile_json(id: u32, beds: u32, alos: f64) -> String {
    format!(
        r#"{{"id": {id}, "name": "Hospital {id}", "ownership": "private_mid",
            "region": "West", "total_beds": {beds}, "total_icu_beds": 0,
            "avg_wait_minutes": 45.0, "avg_length_of_stay_days": {alos},
            "ed_throughput_per_day": 30.0,
            "coordinates": {{"lat": 19.0, "lon": 72.8}}}}"#
    )
}

#[test]
fn empty_source_is_rejected() {
    let err = Catalog::from_json("[]").unwrap_err();
    assert!(matches!(err, CatalogError::Empty));
}

#[test]
fn malformed_json_is_rejected() {
    let err = Catalog::from_json("[{\"id\": 1").unwrap_err();
    assert!(matches!(err, CatalogError::Json { .. }));
}

#[test]
fn duplicate_ids_are_rejected() {
    let json = format!("[{}, {}]", profile_json(4, 100, 5.0), profile_json(4, 200, 5.0));
    let err = Catalog::from_json(&json).unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateId { id } if id == HospitalId(4)));
}

#[test]
fn zero_beds_are_rejected() {
    let json = format!("[{}]", profile_json(1, 0, 5.0));
    let err = Catalog::from_json(&json).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidProfile { .. }));
}

#[test]
fn negative_length_of_stay_is_rejected() {
    let json = format!("[{}]", profile_json(1, 100, -2.0));
    let err = Catalog::from_json(&json).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidProfile { id, .. } if id == HospitalId(1)));
}

#[test]
fn yaml_source_loads() {
    let yaml = r"
- id: 7
  name: Test General
  ownership: union_territory
  region: East
  total_beds: 120
  total_icu_beds: 12
  avg_wait_minutes: 50.0
  avg_length_of_stay_days: 5.0
  ed_throughput_per_day: 40.0
  coordinates:
    lat: 11.6
    lon: 92.7
";
    let catalog = Catalog::from_yaml(yaml).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get(HospitalId(7)).unwrap().total_icu_beds, 12);
}

#[test]
fn file_extension_selects_parser() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("bedgrid-catalog-{}.json", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "[{}]", profile_json(3, 80, 4.5)).unwrap();
    drop(file);

    let catalog = Catalog::from_file(&path).unwrap();
    assert!(catalog.contains(HospitalId(3)));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn missing_file_is_io_error() {
    let err = Catalog::from_file(std::path::Path::new("/nonexistent/bedgrid.json")).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
}
