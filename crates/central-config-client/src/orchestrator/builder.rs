// crates/central-config-client/src/orchestrator/builder.rs
// ============================================================================
// Module: Orchestrator Builder and Bootstrap
// Description: Wires collaborators and selects the initial trusted document.
// Purpose: Produce a bootstrapped orchestrator or a hard failure.
// Dependencies: central-config-core, tokio
// ============================================================================

//! ## Overview
//! Bootstrap verifies the cached and packaged triples against the trust
//! anchor and publishes the better one. The packaged triple wins only when
//! its serial is newer than the cached one (an application upgrade), and is
//! then promoted into the cache.
//!
//! Invariants:
//! - Bootstrap never publishes an unverified document.
//! - The stored accepted serial never decreases.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use central_config_core::Clock;
use central_config_core::ConfigurationDocument;
use central_config_core::SystemClock;
use central_config_core::TrustAnchor;
use central_config_core::is_newer;
use tokio::sync::broadcast;

use super::BootstrapError;
use super::ConfigurationOrchestrator;
use super::Inner;
use super::OrchestratorState;
use super::UPDATE_CHANNEL_CAPACITY;
use crate::artifacts::CACHED_PUBLIC_KEY;
use crate::artifacts::RawConfigArtifacts;
use crate::audit::ConfigAuditEvent;
use crate::audit::ConfigAuditSink;
use crate::audit::ConfigEventKind;
use crate::audit::NoopAuditSink;
use crate::cache::CacheError;
use crate::cache::ConfigCache;
use crate::fetcher::ConfigFetcher;
use crate::fetcher::HttpConfigFetcher;
use crate::packaged::PackagedDefaults;
use crate::properties::FileTrustPropertiesStore;
use crate::properties::MemoryTrustPropertiesStore;
use crate::properties::TrustProperties;
use crate::properties::TrustPropertiesStore;
use crate::settings::ClientSettings;
use crate::settings::SettingsError;

/// Refresh interval used when neither settings nor packaged properties set one.
const FALLBACK_INTERVAL_HOURS: u32 = 24;

// ============================================================================
// SECTION: Candidates
// ============================================================================

/// Origin of a bootstrap candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// Cached active triple.
    Cache,
    /// Packaged default triple.
    Packaged,
}

impl Source {
    /// Audit label.
    const fn label(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Packaged => "packaged",
        }
    }
}

/// Verified triple with its parsed document.
struct Candidate {
    /// Where the triple came from.
    source: Source,
    /// Raw verified triple.
    artifacts: RawConfigArtifacts,
    /// Parsed document.
    document: ConfigurationDocument,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`ConfigurationOrchestrator`].
pub struct ConfigurationOrchestratorBuilder {
    /// Cache of the active triple.
    cache: ConfigCache,
    /// Packaged defaults.
    packaged: PackagedDefaults,
    /// Remote artifact source.
    fetcher: Arc<dyn ConfigFetcher>,
    /// Trust record persistence.
    properties_store: Arc<dyn TrustPropertiesStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn ConfigAuditSink>,
    /// Service URL override.
    service_url: Option<String>,
    /// Refresh interval override.
    interval_hours: Option<u32>,
}

impl ConfigurationOrchestratorBuilder {
    /// Creates a builder with an in-memory trust record, the system clock, and
    /// a no-op audit sink.
    #[must_use]
    pub fn new(
        cache: ConfigCache,
        packaged: PackagedDefaults,
        fetcher: Arc<dyn ConfigFetcher>,
    ) -> Self {
        Self {
            cache,
            packaged,
            fetcher,
            properties_store: Arc::new(MemoryTrustPropertiesStore::new()),
            clock: Arc::new(SystemClock),
            audit: Arc::new(NoopAuditSink),
            service_url: None,
            interval_hours: None,
        }
    }

    /// Creates a builder from client settings with the HTTP fetcher, the file
    /// trust record, and the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the settings are invalid or a
    /// collaborator cannot be built.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let fetcher = HttpConfigFetcher::new(&settings.fetcher_options())
            .map_err(|err| SettingsError::Invalid(err.to_string()))?;
        let mut builder = Self::new(
            ConfigCache::new(&settings.paths.cache_dir),
            PackagedDefaults::new(&settings.paths.packaged_dir),
            Arc::new(fetcher),
        )
        .properties_store(Arc::new(FileTrustPropertiesStore::new(
            settings.trust_properties_path(),
        )))
        .audit_sink(settings.audit_sink()?);
        builder.service_url.clone_from(&settings.service.url);
        builder.interval_hours = settings.refresh.interval_hours;
        Ok(builder)
    }

    /// Replaces the trust record store.
    #[must_use]
    pub fn properties_store(mut self, store: Arc<dyn TrustPropertiesStore>) -> Self {
        self.properties_store = store;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn audit_sink(mut self, audit: Arc<dyn ConfigAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Overrides the packaged service URL.
    #[must_use]
    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    /// Overrides the packaged refresh interval.
    #[must_use]
    pub const fn update_interval_hours(mut self, hours: u32) -> Self {
        self.interval_hours = Some(hours);
        self
    }

    /// Selects and publishes the initial document.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::NoUsableConfiguration`] when neither the
    /// cached nor the packaged triple verifies and parses.
    pub fn bootstrap(self) -> Result<ConfigurationOrchestrator, BootstrapError> {
        let Some(anchor) = self.trust_anchor() else {
            return Err(BootstrapError::NoUsableConfiguration {
                cache: "no trusted public key".to_string(),
                packaged: "public key unreadable".to_string(),
            });
        };
        let cached = self.candidate(Source::Cache, self.cache.load_artifacts(), &anchor);
        let packaged = self.candidate(Source::Packaged, self.packaged.load_artifacts(), &anchor);
        let packaged_serial = packaged.as_ref().ok().map(|packaged| packaged.document.serial());
        let chosen = match (cached, packaged) {
            (Ok(cached), Ok(packaged)) => {
                if is_newer(Some(cached.document.serial()), packaged.document.serial()) {
                    packaged
                } else {
                    cached
                }
            }
            (Ok(cached), Err(_)) => cached,
            (Err(_), Ok(packaged)) => packaged,
            (Err(cache), Err(packaged)) => {
                return Err(BootstrapError::NoUsableConfiguration {
                    cache,
                    packaged,
                });
            }
        };
        if chosen.source == Source::Packaged {
            self.promote(&chosen);
        }
        let properties = self.bootstrap_properties(&chosen, packaged_serial);
        let document =
            chosen.document.with_timestamps(properties.last_checked_at, properties.updated_at);
        self.record(
            ConfigAuditEvent::new(match chosen.source {
                Source::Cache => ConfigEventKind::BootstrapFromCache,
                Source::Packaged => ConfigEventKind::BootstrapFromPackaged,
            })
            .with_serial(document.serial())
            .with_source(chosen.source.label()),
        );
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Ok(ConfigurationOrchestrator {
            inner: Arc::new(Inner {
                cache: self.cache,
                fetcher: self.fetcher,
                properties_store: self.properties_store,
                clock: self.clock,
                audit: self.audit,
                anchor,
                current: RwLock::new(Arc::new(document)),
                properties: RwLock::new(properties),
                state: Mutex::new(OrchestratorState::Idle),
                updates,
            }),
        })
    }

    /// Returns the packaged key, else the cached key.
    fn trust_anchor(&self) -> Option<TrustAnchor> {
        self.packaged.trust_anchor().or_else(|| {
            self.cache
                .load(CACHED_PUBLIC_KEY)
                .ok()
                .and_then(|bytes| TrustAnchor::from_pem_bytes(&bytes))
        })
    }

    /// Verifies a loaded triple, logging why it was rejected.
    fn candidate(
        &self,
        source: Source,
        loaded: Result<RawConfigArtifacts, CacheError>,
        anchor: &TrustAnchor,
    ) -> Result<Candidate, String> {
        let verified = loaded.map_err(|err| err.to_string()).and_then(|artifacts| {
            match artifacts.verify(anchor) {
                Ok(document) => Ok(Candidate {
                    source,
                    artifacts,
                    document,
                }),
                Err(rejection) => Err(super::RefreshError::from(rejection).to_string()),
            }
        });
        if let Err(reason) = &verified {
            self.record(
                ConfigAuditEvent::new(ConfigEventKind::BootstrapCandidateRejected)
                    .with_source(source.label())
                    .with_detail(reason.clone()),
            );
        }
        verified
    }

    /// Writes a winning packaged triple into the cache.
    fn promote(&self, chosen: &Candidate) {
        let serial = chosen.document.serial();
        match self.cache.store_artifacts(&chosen.artifacts) {
            Ok(()) => self.record(
                ConfigAuditEvent::new(ConfigEventKind::PackagedPromoted).with_serial(serial),
            ),
            Err(err) => self.record(
                ConfigAuditEvent::new(ConfigEventKind::CacheWriteFailed)
                    .with_serial(serial)
                    .with_detail(err.to_string()),
            ),
        }
    }

    /// Loads or seeds the trust record for the chosen document and saves it.
    ///
    /// `packaged_serial` is the serial of the packaged document when it verified.
    fn bootstrap_properties(
        &self,
        chosen: &Candidate,
        packaged_serial: Option<i64>,
    ) -> TrustProperties {
        let serial = chosen.document.serial();
        let packaged = match self.packaged.properties() {
            Ok(packaged) => Some(packaged),
            Err(err) => {
                self.record(
                    ConfigAuditEvent::new(ConfigEventKind::PropertiesFailed)
                        .with_source(Source::Packaged.label())
                        .with_detail(err.to_string()),
                );
                None
            }
        };
        if let (Some(declared), Some(document_serial)) =
            (packaged.as_ref().map(|p| p.version_serial), packaged_serial)
            && declared != document_serial
        {
            self.record(
                ConfigAuditEvent::new(ConfigEventKind::PackagedSerialMismatch)
                    .with_serial(document_serial)
                    .with_source(Source::Packaged.label())
                    .with_detail(format!("properties declare serial {declared}")),
            );
        }
        let stored = match self.properties_store.load() {
            Ok(stored) => stored,
            Err(err) => {
                self.record(
                    ConfigAuditEvent::new(ConfigEventKind::PropertiesFailed)
                        .with_detail(err.to_string()),
                );
                None
            }
        };
        let packaged_update = packaged
            .as_ref()
            .filter(|_| chosen.source == Source::Packaged)
            .map(|packaged| packaged.download_date);
        let mut properties = stored.clone().unwrap_or_else(|| TrustProperties {
            service_url: String::new(),
            update_interval_hours: FALLBACK_INTERVAL_HOURS,
            accepted_serial: None,
            last_checked_at: None,
            updated_at: None,
        });
        if let Some(url) =
            self.service_url.clone().or_else(|| packaged.as_ref().map(|p| p.service_url.clone()))
        {
            properties.service_url = url;
        }
        if let Some(hours) =
            self.interval_hours.or_else(|| packaged.as_ref().map(|p| p.update_interval_hours))
        {
            properties.update_interval_hours = hours;
        }
        match properties.accepted_serial {
            Some(accepted) if accepted > serial => self.record(
                ConfigAuditEvent::new(ConfigEventKind::RollbackDetected)
                    .with_serial(serial)
                    .with_source(chosen.source.label())
                    .with_detail(format!("accepted serial {accepted} ahead of usable documents")),
            ),
            Some(accepted) if accepted == serial => {}
            _ => {
                properties.accepted_serial = Some(serial);
                if packaged_update.is_some() {
                    properties.updated_at = packaged_update;
                }
            }
        }
        if stored.as_ref() != Some(&properties)
            && let Err(err) = self.properties_store.save(&properties)
        {
            self.record(
                ConfigAuditEvent::new(ConfigEventKind::PropertiesFailed)
                    .with_detail(err.to_string()),
            );
        }
        properties
    }

    /// Records an audit event.
    fn record(&self, event: ConfigAuditEvent) {
        self.audit.record(&event);
    }
}
