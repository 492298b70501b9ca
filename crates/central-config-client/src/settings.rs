// crates/central-config-client/src/settings.rs
// ============================================================================
// Module: Client Settings
// Description: TOML settings for paths, service access, refresh, and audit.
// Purpose: Load and validate embedder configuration for the client.
// Dependencies: serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! [`ClientSettings`] is loaded from TOML with strict validation. Resolution
//! order: explicit path, then `CENTRAL_CONFIG_SETTINGS`, then
//! `central-config.toml` in the working directory.
//!
//! Invariants:
//! - Unknown fields are rejected.
//! - Values are range-checked before any component is built from them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::audit::ConfigAuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::fetcher::DEFAULT_MAX_ARTIFACT_BYTES;
use crate::fetcher::FetcherOptions;
use crate::fetcher::default_user_agent;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Default settings file name.
const DEFAULT_SETTINGS_NAME: &str = "central-config.toml";
/// Environment variable naming the settings file.
const SETTINGS_ENV_VAR: &str = "CENTRAL_CONFIG_SETTINGS";
/// Maximum settings file size in bytes.
const MAX_SETTINGS_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of a full path.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Minimum request timeout in milliseconds.
const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 60_000;
/// Upper bound on the artifact size cap.
const MAX_ARTIFACT_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum refresh interval override (30 days).
const MAX_INTERVAL_HOURS: u32 = 720;
/// Default scheduler tick in seconds.
const DEFAULT_SCHEDULER_TICK_SECS: u64 = 3_600;
/// Default packaged TSL subdirectory.
const DEFAULT_TSL_PACKAGED_SUBDIR: &str = "tslFiles";
/// Default TSL cache subdirectory.
const DEFAULT_TSL_CACHE_SUBDIR: &str = "schema";
/// Default trust record file name.
const DEFAULT_TRUST_PROPERTIES_NAME: &str = "trust-properties.json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Settings loading or validation errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// I/O failure while reading settings.
    #[error("settings io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("settings parse error: {0}")]
    Parse(String),
    /// Invalid settings data.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Settings Model
// ============================================================================

/// Client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSettings {
    /// File system locations.
    pub paths: PathSettings,
    /// Configuration service access.
    #[serde(default)]
    pub service: ServiceSettings,
    /// Refresh cadence.
    #[serde(default)]
    pub refresh: RefreshSettings,
    /// Audit output.
    #[serde(default)]
    pub audit: AuditSettings,
}

/// File system locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSettings {
    /// Writable cache directory for the active triple.
    pub cache_dir: PathBuf,
    /// Read-only packaged asset directory.
    pub packaged_dir: PathBuf,
    /// Packaged TSL directory (defaults to `<packaged_dir>/tslFiles`).
    #[serde(default)]
    pub tsl_packaged_dir: Option<PathBuf>,
    /// TSL cache directory (defaults to `<cache_dir>/schema`).
    #[serde(default)]
    pub tsl_cache_dir: Option<PathBuf>,
    /// Trust record file (defaults to `<cache_dir>/trust-properties.json`).
    #[serde(default)]
    pub trust_properties_path: Option<PathBuf>,
}

/// Configuration service access.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSettings {
    /// Base URL override; the packaged URL is used when absent.
    #[serde(default)]
    pub url: Option<String>,
    /// Accept `http` URLs (loopback testing only).
    #[serde(default)]
    pub allow_http: bool,
    /// `User-Agent` override.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Per-phase request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Per-artifact size cap.
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            url: None,
            allow_http: false,
            user_agent: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
        }
    }
}

/// Refresh cadence.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshSettings {
    /// Refresh interval override; the packaged interval is used when absent.
    #[serde(default)]
    pub interval_hours: Option<u32>,
    /// How often the scheduler asks for a (possibly skipped) refresh.
    #[serde(default = "default_scheduler_tick_secs")]
    pub scheduler_tick_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_hours: None,
            scheduler_tick_secs: DEFAULT_SCHEDULER_TICK_SECS,
        }
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    None,
}

/// Audit output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditSettings {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the `file` sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Serde default for `timeout_ms`.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Serde default for `max_artifact_bytes`.
const fn default_max_artifact_bytes() -> usize {
    DEFAULT_MAX_ARTIFACT_BYTES
}

/// Serde default for `scheduler_tick_secs`.
const fn default_scheduler_tick_secs() -> u64 {
    DEFAULT_SCHEDULER_TICK_SECS
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl ClientSettings {
    /// Builds default settings for the given directories.
    #[must_use]
    pub fn default_for(cache_dir: impl Into<PathBuf>, packaged_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths: PathSettings {
                cache_dir: cache_dir.into(),
                packaged_dir: packaged_dir.into(),
                tsl_packaged_dir: None,
                tsl_cache_dir: None,
                trust_properties_path: None,
            },
            service: ServiceSettings::default(),
            refresh: RefreshSettings::default(),
            audit: AuditSettings::default(),
        }
    }

    /// Loads settings from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| SettingsError::Io(err.to_string()))?;
        if bytes.len() > MAX_SETTINGS_FILE_SIZE {
            return Err(SettingsError::Invalid("settings file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| SettingsError::Invalid("settings file must be utf-8".to_string()))?;
        let settings: Self =
            toml::from_str(content).map_err(|err| SettingsError::Parse(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_path_field("paths.cache_dir", &self.paths.cache_dir)?;
        validate_path_field("paths.packaged_dir", &self.paths.packaged_dir)?;
        for (field, path) in [
            ("paths.tsl_packaged_dir", &self.paths.tsl_packaged_dir),
            ("paths.tsl_cache_dir", &self.paths.tsl_cache_dir),
            ("paths.trust_properties_path", &self.paths.trust_properties_path),
        ] {
            if let Some(path) = path {
                validate_path_field(field, path)?;
            }
        }
        self.service.validate()?;
        self.refresh.validate()?;
        self.audit.validate()
    }

    /// Returns the packaged TSL directory.
    #[must_use]
    pub fn tsl_packaged_dir(&self) -> PathBuf {
        self.paths
            .tsl_packaged_dir
            .clone()
            .unwrap_or_else(|| self.paths.packaged_dir.join(DEFAULT_TSL_PACKAGED_SUBDIR))
    }

    /// Returns the TSL cache directory.
    #[must_use]
    pub fn tsl_cache_dir(&self) -> PathBuf {
        self.paths
            .tsl_cache_dir
            .clone()
            .unwrap_or_else(|| self.paths.cache_dir.join(DEFAULT_TSL_CACHE_SUBDIR))
    }

    /// Returns the trust record path.
    #[must_use]
    pub fn trust_properties_path(&self) -> PathBuf {
        self.paths
            .trust_properties_path
            .clone()
            .unwrap_or_else(|| self.paths.cache_dir.join(DEFAULT_TRUST_PROPERTIES_NAME))
    }

    /// Returns fetcher options derived from `[service]`.
    #[must_use]
    pub fn fetcher_options(&self) -> FetcherOptions {
        FetcherOptions {
            user_agent: self.service.user_agent.clone().unwrap_or_else(default_user_agent),
            timeout: Duration::from_millis(self.service.timeout_ms),
            max_artifact_bytes: self.service.max_artifact_bytes,
            allow_http: self.service.allow_http,
        }
    }

    /// Returns the scheduler tick.
    #[must_use]
    pub const fn scheduler_tick(&self) -> Duration {
        Duration::from_secs(self.refresh.scheduler_tick_secs)
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] when the audit log cannot be opened.
    pub fn audit_sink(&self) -> Result<Arc<dyn ConfigAuditSink>, SettingsError> {
        match self.audit.sink {
            AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
            AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
            AuditSinkKind::File => {
                let path = self.audit.path.as_deref().ok_or_else(|| {
                    SettingsError::Invalid("audit.path required for file sink".to_string())
                })?;
                let sink =
                    FileAuditSink::new(path).map_err(|err| SettingsError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }
}

impl ServiceSettings {
    /// Validates service settings.
    fn validate(&self) -> Result<(), SettingsError> {
        if let Some(raw) = &self.url {
            let url = Url::parse(raw.trim())
                .map_err(|err| SettingsError::Invalid(format!("service.url: {err}")))?;
            match url.scheme() {
                "https" => {}
                "http" if self.allow_http => {}
                scheme => {
                    return Err(SettingsError::Invalid(format!(
                        "service.url scheme not allowed: {scheme}"
                    )));
                }
            }
        }
        if let Some(agent) = &self.user_agent
            && (agent.trim().is_empty() || !agent.is_ascii())
        {
            return Err(SettingsError::Invalid(
                "service.user_agent must be non-empty ascii".to_string(),
            ));
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(SettingsError::Invalid(format!(
                "service.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        if self.max_artifact_bytes == 0 || self.max_artifact_bytes > MAX_ARTIFACT_BYTES_LIMIT {
            return Err(SettingsError::Invalid(format!(
                "service.max_artifact_bytes must be between 1 and {MAX_ARTIFACT_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

impl RefreshSettings {
    /// Validates refresh settings.
    fn validate(&self) -> Result<(), SettingsError> {
        if let Some(hours) = self.interval_hours
            && !(1..=MAX_INTERVAL_HOURS).contains(&hours)
        {
            return Err(SettingsError::Invalid(format!(
                "refresh.interval_hours must be between 1 and {MAX_INTERVAL_HOURS}"
            )));
        }
        if self.scheduler_tick_secs == 0 {
            return Err(SettingsError::Invalid(
                "refresh.scheduler_tick_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl AuditSettings {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), SettingsError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(SettingsError::Invalid("audit.path required for file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path_field("audit.path", path),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the settings path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, SettingsError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(SETTINGS_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(SettingsError::Invalid("settings path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_SETTINGS_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), SettingsError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SettingsError::Invalid("settings path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SettingsError::Invalid("settings path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path value against length constraints.
fn validate_path_field(field: &str, path: &Path) -> Result<(), SettingsError> {
    if path.as_os_str().is_empty() {
        return Err(SettingsError::Invalid(format!("{field} must be non-empty")));
    }
    validate_path(path).map_err(|_| SettingsError::Invalid(format!("{field} exceeds path limits")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
