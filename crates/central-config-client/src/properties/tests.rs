// crates/central-config-client/src/properties/tests.rs
// ============================================================================
// Module: Trust Properties Tests
// Description: Unit tests for properties parsing and record stores.
// Purpose: Validate required keys, escapes, and persistence round trips.
// Dependencies: central-config-client, tempfile, time
// ============================================================================

//! ## Overview
//! Exercises the packaged properties parser and both trust-record stores.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use time::macros::datetime;

use super::FileTrustPropertiesStore;
use super::MemoryTrustPropertiesStore;
use super::PackagedProperties;
use super::PropertiesError;
use super::TrustProperties;
use super::TrustPropertiesStore;

/// Properties text in the shape shipped with the application.
const PACKAGED: &str = "\
#Central configuration defaults
#Fri Jan 10 12:00:00 UTC 2025
central-configuration-service.url=https\\://id.example/config
configuration.update-interval = 4
configuration.version-serial=12
configuration.download-date=10-01-2025 12\\:30\\:05
";

/// Builds a record with every field populated.
fn record() -> TrustProperties {
    TrustProperties {
        service_url: "https://id.example/config".to_string(),
        update_interval_hours: 4,
        accepted_serial: Some(12),
        last_checked_at: Some(datetime!(2025-01-10 13:00 UTC)),
        updated_at: Some(datetime!(2025-01-10 12:30:05 UTC)),
    }
}

/// Tests packaged properties parse with escapes and spacing.
#[test]
fn parses_packaged_properties() {
    let properties = PackagedProperties::parse(PACKAGED).expect("parse");
    assert_eq!(properties.service_url, "https://id.example/config");
    assert_eq!(properties.update_interval_hours, 4);
    assert_eq!(properties.version_serial, 12);
    assert_eq!(properties.download_date, datetime!(2025-01-10 12:30:05 UTC));
}

/// Tests each required key is reported when missing.
#[test]
fn missing_keys_are_reported() {
    for key in [
        super::KEY_SERVICE_URL,
        super::KEY_UPDATE_INTERVAL,
        super::KEY_VERSION_SERIAL,
        super::KEY_DOWNLOAD_DATE,
    ] {
        let text: String = PACKAGED
            .lines()
            .filter(|line| !line.starts_with(key))
            .map(|line| format!("{line}\n"))
            .collect();
        assert_eq!(
            PackagedProperties::parse(&text),
            Err(PropertiesError::MissingKey(key.to_string())),
            "key {key}"
        );
    }
}

/// Tests malformed values are rejected.
#[test]
fn invalid_values_are_rejected() {
    let zero_interval = PACKAGED.replace("= 4", "= 0");
    assert!(matches!(
        PackagedProperties::parse(&zero_interval),
        Err(PropertiesError::Invalid(_))
    ));
    let bad_serial = PACKAGED.replace("serial=12", "serial=twelve");
    assert!(matches!(PackagedProperties::parse(&bad_serial), Err(PropertiesError::Invalid(_))));
    let bad_date = PACKAGED.replace("10-01-2025", "2025-01-10");
    assert!(matches!(PackagedProperties::parse(&bad_date), Err(PropertiesError::Invalid(_))));
}

/// Tests the file store returns nothing before the first save.
#[test]
fn file_store_starts_empty() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = FileTrustPropertiesStore::new(dir.path().join("trust.json"));
    assert_eq!(store.load().expect("load"), None);
}

/// Tests the file store round-trips a record.
#[test]
fn file_store_round_trips_record() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("state").join("trust.json");
    let store = FileTrustPropertiesStore::new(path.clone());
    store.save(&record()).expect("save");
    assert_eq!(store.load().expect("load"), Some(record()));

    let mut updated = record();
    updated.accepted_serial = Some(13);
    updated.last_checked_at = None;
    store.save(&updated).expect("save again");
    assert_eq!(store.load().expect("reload"), Some(updated));
    assert!(!path.with_extension("tmp").exists());
}

/// Tests a corrupt record surfaces a parse error.
#[test]
fn file_store_rejects_corrupt_record() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("trust.json");
    std::fs::write(&path, b"{not json").expect("write");
    let store = FileTrustPropertiesStore::new(path);
    assert!(matches!(store.load(), Err(PropertiesError::Parse(_))));
}

/// Tests the memory store round-trips a record.
#[test]
fn memory_store_round_trips_record() {
    let store = MemoryTrustPropertiesStore::new();
    assert_eq!(store.load().expect("load"), None);
    store.save(&record()).expect("save");
    assert_eq!(store.load().expect("load"), Some(record()));
    let seeded = MemoryTrustPropertiesStore::with_record(record());
    assert_eq!(seeded.load().expect("load"), Some(record()));
}
