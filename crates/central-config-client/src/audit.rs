// crates/central-config-client/src/audit.rs
// ============================================================================
// Module: Central Config Audit Logging
// Description: Structured events for bootstrap, refresh, and TSL sync.
// Purpose: Emit redacted JSON-line logs without a global logger.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every observable decision of the client (which source bootstrap chose, why a
//! refresh was rejected, which trusted-list files were replaced) is reported
//! as a [`ConfigAuditEvent`] to a [`ConfigAuditSink`]. Sinks are injected, so
//! embedders route events to their own logging pipeline.
//!
//! Invariants:
//! - Events never carry key material, signature bytes, or document bodies.
//! - Recording never fails the operation that produced the event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Kind of audit event.
///
/// # Invariants
/// - Variants are stable for log labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEventKind {
    /// Bootstrap published the cached document.
    BootstrapFromCache,
    /// Bootstrap published the packaged default document.
    BootstrapFromPackaged,
    /// A bootstrap candidate was unusable.
    BootstrapCandidateRejected,
    /// The packaged default was written into the cache.
    PackagedPromoted,
    /// Stored accepted serial is ahead of every usable document.
    RollbackDetected,
    /// Packaged properties declare a different serial than the packaged document.
    PackagedSerialMismatch,
    /// Refresh was not due yet.
    RefreshSkipped,
    /// Refresh request joined an in-flight refresh.
    RefreshCoalesced,
    /// Refresh contacted the configuration service.
    RefreshStarted,
    /// Refresh failed; the current document is retained.
    RefreshFailed,
    /// Fetched document was not newer than the accepted serial.
    RefreshNotNewer,
    /// A new document was accepted and published.
    ConfigurationUpdated,
    /// Cache write failed; publication continued.
    CacheWriteFailed,
    /// Trust properties could not be read or written.
    PropertiesFailed,
    /// A trusted-list file was copied into the cache.
    TslCopied,
    /// A trusted-list file was already current.
    TslUnchanged,
    /// A trusted-list file was skipped after an error.
    TslSkipped,
}

/// Audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event kind.
    pub kind: ConfigEventKind,
    /// Document serial involved, when known.
    pub serial: Option<i64>,
    /// Artifact source label (`cache`, `packaged`, `remote`).
    pub source: Option<&'static str>,
    /// File name involved, when the event concerns a file.
    pub file: Option<String>,
    /// Redacted detail message.
    pub detail: Option<String>,
}

impl ConfigAuditEvent {
    /// Creates an event of the given kind with a consistent timestamp.
    #[must_use]
    pub fn new(kind: ConfigEventKind) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "central_config",
            timestamp_ms,
            kind,
            serial: None,
            source: None,
            file: None,
            detail: None,
        }
    }

    /// Attaches a document serial.
    #[must_use]
    pub const fn with_serial(mut self, serial: i64) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Attaches an artifact source label.
    #[must_use]
    pub const fn with_source(mut self, source: &'static str) -> Self {
        self.source = Some(source);
        self
    }

    /// Attaches a file name.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches a detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for audit events.
pub trait ConfigAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &ConfigAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ConfigAuditSink for StderrAuditSink {
    fn record(&self, event: &ConfigAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ConfigAuditSink for FileAuditSink {
    fn record(&self, event: &ConfigAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that discards events.
pub struct NoopAuditSink;

impl ConfigAuditSink for NoopAuditSink {
    fn record(&self, _event: &ConfigAuditEvent) {}
}

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<ConfigAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ConfigAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded event kinds in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ConfigEventKind> {
        self.events().iter().map(|event| event.kind).collect()
    }
}

impl ConfigAuditSink for MemoryAuditSink {
    fn record(&self, event: &ConfigAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
