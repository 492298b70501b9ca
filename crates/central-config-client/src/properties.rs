// crates/central-config-client/src/properties.rs
// ============================================================================
// Module: Trust Properties
// Description: Packaged properties file and the persisted trust record.
// Purpose: Track service URL, interval, accepted serial, and check times.
// Dependencies: central-config-core, serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! Two records live here. [`PackagedProperties`] is the read-only
//! `configuration.properties` shipped next to the packaged artifacts.
//! [`TrustProperties`] is the mutable record the orchestrator persists
//! through a [`TrustPropertiesStore`] after each accepted document and each
//! service check.
//!
//! Invariants:
//! - `accepted_serial` only moves forward.
//! - Stores are single-writer; only the orchestrator saves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use central_config_core::clock::parse_download_date;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::cache::CacheError;
use crate::cache::read_limited;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Service URL key.
pub const KEY_SERVICE_URL: &str = "central-configuration-service.url";
/// Update interval key (hours).
pub const KEY_UPDATE_INTERVAL: &str = "configuration.update-interval";
/// Packaged document serial key.
pub const KEY_VERSION_SERIAL: &str = "configuration.version-serial";
/// Packaged download date key (`dd-MM-yyyy HH:mm:ss`).
pub const KEY_DOWNLOAD_DATE: &str = "configuration.download-date";

/// Maximum size of a properties file.
const MAX_PROPERTIES_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Properties loading and persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertiesError {
    /// File system failure.
    #[error("properties io error: {0}")]
    Io(String),
    /// Text could not be parsed.
    #[error("properties parse error: {0}")]
    Parse(String),
    /// A required key is absent.
    #[error("missing properties key: {0}")]
    MissingKey(String),
    /// A value is present but unusable.
    #[error("invalid properties value: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Packaged Properties
// ============================================================================

/// Contents of the packaged `configuration.properties`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedProperties {
    /// Configuration service base URL.
    pub service_url: String,
    /// Refresh interval in hours.
    pub update_interval_hours: u32,
    /// Serial of the packaged document.
    pub version_serial: i64,
    /// Time the packaged document was downloaded (UTC).
    pub download_date: OffsetDateTime,
}

impl PackagedProperties {
    /// Reads and parses a properties file.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PropertiesError> {
        let bytes = read_limited(path, MAX_PROPERTIES_BYTES).map_err(|err| match err {
            CacheError::NotFound(label) => PropertiesError::Io(format!("{label} not found")),
            CacheError::Io(message) => PropertiesError::Io(message),
        })?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| PropertiesError::Parse("properties file must be utf-8".to_string()))?;
        Self::parse(text)
    }

    /// Parses `key=value` properties text.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError`] when a required key is missing or invalid.
    pub fn parse(text: &str) -> Result<Self, PropertiesError> {
        let entries = parse_entries(text);
        let required = |key: &str| {
            entries
                .get(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| PropertiesError::MissingKey(key.to_string()))
        };
        let service_url = required(KEY_SERVICE_URL)?.clone();
        let update_interval_hours = required(KEY_UPDATE_INTERVAL)?
            .parse::<u32>()
            .map_err(|_| PropertiesError::Invalid(KEY_UPDATE_INTERVAL.to_string()))?;
        if update_interval_hours == 0 {
            return Err(PropertiesError::Invalid(KEY_UPDATE_INTERVAL.to_string()));
        }
        let version_serial = required(KEY_VERSION_SERIAL)?
            .parse::<i64>()
            .map_err(|_| PropertiesError::Invalid(KEY_VERSION_SERIAL.to_string()))?;
        let download_date = parse_download_date(required(KEY_DOWNLOAD_DATE)?)
            .map_err(|_| PropertiesError::Invalid(KEY_DOWNLOAD_DATE.to_string()))?;
        Ok(Self {
            service_url,
            update_interval_hours,
            version_serial,
            download_date,
        })
    }
}

/// Splits properties text into trimmed, unescaped key/value pairs.
///
/// Later keys override earlier ones. Lines starting with `#` or `!` are
/// comments; `=` or `:` separates key from value.
fn parse_entries(text: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let split = separator_index(line);
        let (key, value) = match split {
            Some(index) => {
                let (key, rest) = line.split_at(index);
                (key, rest.get(1..).unwrap_or_default())
            }
            None => (line, ""),
        };
        entries.insert(unescape(key.trim()), unescape(value.trim()));
    }
    entries
}

/// Returns the byte index of the first unescaped `=` or `:`.
fn separator_index(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' => return Some(index),
            _ => {}
        }
    }
    None
}

/// Resolves backslash escapes (`\:` becomes `:`, `\t` a tab).
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

// ============================================================================
// SECTION: Trust Properties
// ============================================================================

/// Persisted trust record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustProperties {
    /// Configuration service base URL.
    pub service_url: String,
    /// Refresh interval in hours.
    pub update_interval_hours: u32,
    /// Serial of the last accepted document.
    pub accepted_serial: Option<i64>,
    /// Time of the last service check, successful or not.
    pub last_checked_at: Option<OffsetDateTime>,
    /// Time the accepted document was last replaced.
    pub updated_at: Option<OffsetDateTime>,
}

/// Storage for [`TrustProperties`].
pub trait TrustPropertiesStore: Send + Sync {
    /// Loads the stored record, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError`] when a stored record cannot be read.
    fn load(&self) -> Result<Option<TrustProperties>, PropertiesError>;

    /// Replaces the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError`] when the record cannot be written.
    fn save(&self, properties: &TrustProperties) -> Result<(), PropertiesError>;
}

/// On-disk form of [`TrustProperties`] with unix-second timestamps.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredTrustProperties {
    /// Service base URL.
    service_url: String,
    /// Refresh interval in hours.
    update_interval_hours: u32,
    /// Accepted serial.
    accepted_serial: Option<i64>,
    /// Last check (unix seconds).
    last_checked_at: Option<i64>,
    /// Last update (unix seconds).
    updated_at: Option<i64>,
}

impl From<&TrustProperties> for StoredTrustProperties {
    fn from(value: &TrustProperties) -> Self {
        Self {
            service_url: value.service_url.clone(),
            update_interval_hours: value.update_interval_hours,
            accepted_serial: value.accepted_serial,
            last_checked_at: value.last_checked_at.map(OffsetDateTime::unix_timestamp),
            updated_at: value.updated_at.map(OffsetDateTime::unix_timestamp),
        }
    }
}

impl TryFrom<StoredTrustProperties> for TrustProperties {
    type Error = PropertiesError;

    fn try_from(value: StoredTrustProperties) -> Result<Self, Self::Error> {
        let timestamp = |seconds: Option<i64>| {
            seconds
                .map(OffsetDateTime::from_unix_timestamp)
                .transpose()
                .map_err(|err| PropertiesError::Invalid(err.to_string()))
        };
        Ok(Self {
            service_url: value.service_url,
            update_interval_hours: value.update_interval_hours,
            accepted_serial: value.accepted_serial,
            last_checked_at: timestamp(value.last_checked_at)?,
            updated_at: timestamp(value.updated_at)?,
        })
    }
}

/// JSON file store for [`TrustProperties`].
#[derive(Debug, Clone)]
pub struct FileTrustPropertiesStore {
    /// Record file path.
    path: PathBuf,
}

impl FileTrustPropertiesStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }
}

impl TrustPropertiesStore for FileTrustPropertiesStore {
    fn load(&self) -> Result<Option<TrustProperties>, PropertiesError> {
        let bytes = match read_limited(&self.path, MAX_PROPERTIES_BYTES) {
            Ok(bytes) => bytes,
            Err(CacheError::NotFound(_)) => return Ok(None),
            Err(CacheError::Io(message)) => return Err(PropertiesError::Io(message)),
        };
        let stored: StoredTrustProperties = serde_json::from_slice(&bytes)
            .map_err(|err| PropertiesError::Parse(err.to_string()))?;
        stored.try_into().map(Some)
    }

    fn save(&self, properties: &TrustProperties) -> Result<(), PropertiesError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| PropertiesError::Io(err.to_string()))?;
        }
        let payload = serde_json::to_vec_pretty(&StoredTrustProperties::from(properties))
            .map_err(|err| PropertiesError::Parse(err.to_string()))?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, payload).map_err(|err| PropertiesError::Io(err.to_string()))?;
        fs::rename(&staging, &self.path).map_err(|err| PropertiesError::Io(err.to_string()))
    }
}

/// In-memory store for tests and embedders without persistence.
#[derive(Debug, Default)]
pub struct MemoryTrustPropertiesStore {
    /// Stored record.
    record: Mutex<Option<TrustProperties>>,
}

impl MemoryTrustPropertiesStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `properties`.
    #[must_use]
    pub fn with_record(properties: TrustProperties) -> Self {
        Self {
            record: Mutex::new(Some(properties)),
        }
    }
}

impl TrustPropertiesStore for MemoryTrustPropertiesStore {
    fn load(&self) -> Result<Option<TrustProperties>, PropertiesError> {
        self.record
            .lock()
            .map(|record| record.clone())
            .map_err(|_| PropertiesError::Io("properties store lock poisoned".to_string()))
    }

    fn save(&self, properties: &TrustProperties) -> Result<(), PropertiesError> {
        let mut record = self
            .record
            .lock()
            .map_err(|_| PropertiesError::Io("properties store lock poisoned".to_string()))?;
        *record = Some(properties.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
