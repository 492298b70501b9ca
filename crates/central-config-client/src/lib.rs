// crates/central-config-client/src/lib.rs
// ============================================================================
// Module: Central Config Client
// Description: Verified configuration distribution with cache and fallback.
// Purpose: Publish signed central configuration and keep trusted lists current.
// Dependencies: central-config-core, reqwest, quick-xml, tokio
// ============================================================================

//! ## Overview
//! The client fetches the signed configuration triple from the distribution
//! service, verifies it against the packaged key with
//! [`central_config_core::TrustAnchor`], and publishes it through a
//! [`ConfigurationOrchestrator`]. The last verified triple is cached on disk
//! and the packaged defaults remain the floor, so the application always
//! starts with a trusted document even when offline.
//!
//! [`TrustListSynchronizer`] seeds the trusted-list cache from packaged TSL
//! files, replacing only cached copies with a lower sequence number.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifacts;
pub mod audit;
pub mod cache;
pub mod fetcher;
pub mod orchestrator;
pub mod packaged;
pub mod properties;
pub mod scheduler;
pub mod settings;
pub mod tsl;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::ArtifactRejection;
pub use artifacts::RawConfigArtifacts;
pub use audit::ConfigAuditEvent;
pub use audit::ConfigAuditSink;
pub use audit::ConfigEventKind;
pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use cache::CacheError;
pub use cache::ConfigCache;
pub use fetcher::ConfigFetcher;
pub use fetcher::FetchError;
pub use fetcher::FetcherOptions;
pub use fetcher::HttpConfigFetcher;
pub use orchestrator::BootstrapError;
pub use orchestrator::ConfigSubscription;
pub use orchestrator::ConfigurationOrchestrator;
pub use orchestrator::ConfigurationOrchestratorBuilder;
pub use orchestrator::OrchestratorState;
pub use orchestrator::RefreshError;
pub use orchestrator::RefreshOutcome;
pub use packaged::PackagedDefaults;
pub use properties::FileTrustPropertiesStore;
pub use properties::MemoryTrustPropertiesStore;
pub use properties::PackagedProperties;
pub use properties::PropertiesError;
pub use properties::TrustProperties;
pub use properties::TrustPropertiesStore;
pub use scheduler::RefreshScheduler;
pub use settings::ClientSettings;
pub use settings::SettingsError;
pub use tsl::TrustListSynchronizer;
pub use tsl::TslError;
pub use tsl::TslSyncReport;
