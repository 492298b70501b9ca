// crates/central-config-client/src/orchestrator.rs
// ============================================================================
// Module: Configuration Orchestrator
// Description: Publishes the current configuration and runs verified refreshes.
// Purpose: Compose cache, packaged defaults, fetcher, and trust record.
// Dependencies: central-config-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! A [`ConfigurationOrchestrator`] is created by
//! [`ConfigurationOrchestratorBuilder::bootstrap`], which always publishes a
//! document or fails hard. Afterwards the orchestrator alternates between
//! [`OrchestratorState::Idle`] and [`OrchestratorState::Refreshing`].
//!
//! Invariants:
//! - [`ConfigurationOrchestrator::current`] never blocks on I/O and never
//!   triggers a refresh.
//! - At most one refresh is in flight; concurrent requests are coalesced.
//! - A document is published only after it verified against the trust anchor
//!   and passed [`is_newer`] against the accepted serial.
//! - The cache is written only with verified triples.
//!
//! Security posture: refresh failures are reported by category only; key and
//! signature failures are indistinguishable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

use central_config_core::Clock;
use central_config_core::ConfigurationDocument;
use central_config_core::TrustAnchor;
use central_config_core::is_check_due;
use central_config_core::is_newer;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::artifacts::ArtifactRejection;
use crate::artifacts::RawConfigArtifacts;
use crate::audit::ConfigAuditEvent;
use crate::audit::ConfigAuditSink;
use crate::audit::ConfigEventKind;
use crate::cache::ConfigCache;
use crate::fetcher::ConfigFetcher;
use crate::fetcher::FetchError;
use crate::properties::TrustProperties;
use crate::properties::TrustPropertiesStore;

mod builder;

pub use builder::ConfigurationOrchestratorBuilder;

/// Capacity of the update channel before slow subscribers lag.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Why a refresh did not produce a new document.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Service unreachable, timed out, or answered with an error.
    #[error("transport error: {0}")]
    Transport(String),
    /// Key or signature did not verify.
    #[error("signature invalid")]
    SignatureInvalid,
    /// Verified document could not be parsed.
    #[error("malformed document: {0}")]
    MalformedDocument(String),
}

impl From<FetchError> for RefreshError {
    fn from(err: FetchError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<ArtifactRejection> for RefreshError {
    fn from(rejection: ArtifactRejection) -> Self {
        match rejection {
            ArtifactRejection::SignatureInvalid => Self::SignatureInvalid,
            ArtifactRejection::Malformed(err) => Self::MalformedDocument(err.to_string()),
        }
    }
}

/// Bootstrap could not publish any document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    /// Neither the cache nor the packaged defaults produced a document.
    #[error("no usable configuration (cache: {cache}; packaged: {packaged})")]
    NoUsableConfiguration {
        /// Why the cached triple was rejected.
        cache: String,
        /// Why the packaged triple was rejected.
        packaged: String,
    },
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Orchestrator lifecycle state after bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// No refresh in flight.
    Idle,
    /// A refresh is in flight.
    Refreshing,
}

/// Result of a refresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Not forced and the refresh interval has not elapsed.
    Skipped,
    /// Another refresh was already in flight.
    Coalesced,
    /// A newer document was published.
    Updated {
        /// Serial of the published document.
        serial: i64,
    },
    /// The fetched document was not newer than the accepted serial.
    NotNewer {
        /// Accepted serial kept.
        current: i64,
        /// Serial of the rejected document.
        fetched: i64,
    },
    /// The refresh failed; the current document is retained.
    Failed(RefreshError),
    /// The refresh task was cancelled before completing.
    Abandoned,
}

// ============================================================================
// SECTION: Subscription
// ============================================================================

/// Stream of documents published after subscription.
pub struct ConfigSubscription {
    /// Update receiver.
    receiver: broadcast::Receiver<Arc<ConfigurationDocument>>,
}

impl ConfigSubscription {
    /// Waits for the next published document.
    ///
    /// A subscriber that fell behind skips to the oldest retained document.
    /// Returns `None` once the orchestrator is gone.
    pub async fn next(&mut self) -> Option<Arc<ConfigurationDocument>> {
        loop {
            match self.receiver.recv().await {
                Ok(document) => return Some(document),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Shared orchestrator state.
struct Inner {
    /// Cache of the last verified triple.
    cache: ConfigCache,
    /// Remote artifact source.
    fetcher: Arc<dyn ConfigFetcher>,
    /// Trust record persistence.
    properties_store: Arc<dyn TrustPropertiesStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn ConfigAuditSink>,
    /// Key every triple must be signed with.
    anchor: TrustAnchor,
    /// Published document.
    current: RwLock<Arc<ConfigurationDocument>>,
    /// Latest trust record.
    properties: RwLock<TrustProperties>,
    /// Refresh gate.
    state: Mutex<OrchestratorState>,
    /// Update publisher.
    updates: broadcast::Sender<Arc<ConfigurationDocument>>,
}

/// Verified configuration publisher.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct ConfigurationOrchestrator {
    /// Shared state.
    inner: Arc<Inner>,
}

impl ConfigurationOrchestrator {
    /// Returns the published document.
    #[must_use]
    pub fn current(&self) -> Arc<ConfigurationDocument> {
        self.inner.current_document()
    }

    /// Subscribes to documents published from now on.
    #[must_use]
    pub fn subscribe(&self) -> ConfigSubscription {
        ConfigSubscription {
            receiver: self.inner.updates.subscribe(),
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a snapshot of the trust record.
    #[must_use]
    pub fn trust_properties(&self) -> TrustProperties {
        self.inner.properties_snapshot()
    }

    /// Refreshes from the configuration service.
    ///
    /// Without `force`, the service is contacted only once the refresh
    /// interval has elapsed since the last check. The work runs on a spawned
    /// task; verification and disk I/O run on the blocking pool.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        if let Some(outcome) = self.inner.begin_refresh(force) {
            return outcome;
        }
        let inner = Arc::clone(&self.inner);
        let gate = RefreshGate {
            inner: Arc::clone(&inner),
        };
        let task = tokio::spawn(async move {
            let _gate = gate;
            inner.run_refresh().await
        });
        task.await.unwrap_or(RefreshOutcome::Abandoned)
    }
}

/// Returns the orchestrator to idle when a refresh ends or is dropped.
struct RefreshGate {
    /// Shared state.
    inner: Arc<Inner>,
}

impl Drop for RefreshGate {
    fn drop(&mut self) {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner) = OrchestratorState::Idle;
    }
}

impl Inner {
    /// Returns the published document.
    fn current_document(&self) -> Arc<ConfigurationDocument> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the latest trust record.
    fn properties_snapshot(&self) -> TrustProperties {
        self.properties.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Claims the refresh gate, or returns the outcome that ends the request.
    fn begin_refresh(&self, force: bool) -> Option<RefreshOutcome> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == OrchestratorState::Refreshing {
            self.record(ConfigAuditEvent::new(ConfigEventKind::RefreshCoalesced));
            return Some(RefreshOutcome::Coalesced);
        }
        if !force {
            let properties = self.properties_snapshot();
            if !is_check_due(
                properties.last_checked_at,
                self.clock.now(),
                properties.update_interval_hours,
            ) {
                self.record(ConfigAuditEvent::new(ConfigEventKind::RefreshSkipped));
                return Some(RefreshOutcome::Skipped);
            }
        }
        *state = OrchestratorState::Refreshing;
        None
    }

    /// Fetches, then verifies and applies on the blocking pool.
    async fn run_refresh(self: &Arc<Self>) -> RefreshOutcome {
        let service_url = self.properties_snapshot().service_url;
        self.record(ConfigAuditEvent::new(ConfigEventKind::RefreshStarted));
        let fetched = self.fetcher.fetch(&service_url).await;
        let inner = Arc::clone(self);
        tokio::task::spawn_blocking(move || inner.apply_fetch(fetched))
            .await
            .unwrap_or(RefreshOutcome::Abandoned)
    }

    /// Applies a fetch result: verify, gate on serial, cache, persist, publish.
    fn apply_fetch(&self, fetched: Result<RawConfigArtifacts, FetchError>) -> RefreshOutcome {
        let now = self.clock.now();
        let mut properties = self.properties_snapshot();
        properties.last_checked_at = Some(now);
        let verified = fetched.map_err(RefreshError::from).and_then(|artifacts| {
            let document = artifacts.verify(&self.anchor)?;
            Ok((artifacts, document))
        });
        let (artifacts, document) = match verified {
            Ok(verified) => verified,
            Err(err) => {
                self.record(
                    ConfigAuditEvent::new(ConfigEventKind::RefreshFailed)
                        .with_source("remote")
                        .with_detail(err.to_string()),
                );
                self.persist(properties);
                return RefreshOutcome::Failed(err);
            }
        };
        let fetched_serial = document.serial();
        if !is_newer(properties.accepted_serial, fetched_serial) {
            let current = properties.accepted_serial.unwrap_or(fetched_serial);
            self.record(
                ConfigAuditEvent::new(ConfigEventKind::RefreshNotNewer)
                    .with_serial(fetched_serial)
                    .with_detail(format!("accepted serial {current}")),
            );
            self.persist(properties);
            return RefreshOutcome::NotNewer {
                current,
                fetched: fetched_serial,
            };
        }
        if let Err(err) = self.cache.store_artifacts(&artifacts) {
            self.record(
                ConfigAuditEvent::new(ConfigEventKind::CacheWriteFailed)
                    .with_serial(fetched_serial)
                    .with_detail(err.to_string()),
            );
        }
        properties.accepted_serial = Some(fetched_serial);
        properties.updated_at = Some(now);
        self.persist(properties);
        self.publish(document.with_timestamps(Some(now), Some(now)));
        self.record(
            ConfigAuditEvent::new(ConfigEventKind::ConfigurationUpdated)
                .with_serial(fetched_serial)
                .with_source("remote"),
        );
        RefreshOutcome::Updated {
            serial: fetched_serial,
        }
    }

    /// Saves the trust record and keeps the in-memory snapshot current.
    fn persist(&self, properties: TrustProperties) {
        if let Err(err) = self.properties_store.save(&properties) {
            self.record(
                ConfigAuditEvent::new(ConfigEventKind::PropertiesFailed)
                    .with_detail(err.to_string()),
            );
        }
        *self.properties.write().unwrap_or_else(PoisonError::into_inner) = properties;
    }

    /// Swaps the published document and notifies subscribers.
    fn publish(&self, document: ConfigurationDocument) {
        let document = Arc::new(document);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&document);
        let _ = self.updates.send(document);
    }

    /// Records an audit event.
    fn record(&self, event: ConfigAuditEvent) {
        self.audit.record(&event);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
