// crates/central-config-client/src/tsl.rs
// ============================================================================
// Module: Trusted List Synchronizer
// Description: Reconciles packaged TSL files with the local TSL cache.
// Purpose: Replace cached trusted lists only with newer packaged versions.
// Dependencies: quick-xml, thiserror, tokio
// ============================================================================

//! ## Overview
//! Each packaged `.xml` trusted list carries a `TSLSequenceNumber` element.
//! [`TrustListSynchronizer::synchronize`] copies a packaged list into the
//! cache when no cached copy exists or when the packaged sequence number is
//! strictly greater, and deletes the `<name>.etag` sidecar of every replaced
//! file.
//!
//! Invariants:
//! - A file whose sequence number cannot be read on either side is skipped.
//! - One bad file never stops the remaining files from being processed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

use crate::audit::ConfigAuditEvent;
use crate::audit::ConfigAuditSink;
use crate::audit::ConfigEventKind;
use crate::audit::NoopAuditSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Element holding the trusted list version.
const SEQUENCE_ELEMENT: &[u8] = b"TSLSequenceNumber";
/// Trusted list file extension.
const TSL_EXTENSION: &str = "xml";
/// Sidecar suffix invalidated on replacement.
const ETAG_SUFFIX: &str = ".etag";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Trusted list errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TslError {
    /// File system failure.
    #[error("tsl io error: {0}")]
    Io(String),
    /// XML is malformed or the sequence number is not an integer.
    #[error("tsl parse error: {0}")]
    Parse(String),
    /// No `TSLSequenceNumber` element was found.
    #[error("tsl sequence number missing")]
    MissingSequenceNumber,
}

// ============================================================================
// SECTION: Sequence Number
// ============================================================================

/// Reads the first `TSLSequenceNumber` value from an XML file.
///
/// The element is matched by local name at any depth, so namespace prefixes
/// do not matter.
///
/// # Errors
///
/// Returns [`TslError`] when the file cannot be read, the XML is malformed
/// before the element, or the element holds no integer.
pub fn read_sequence_number(path: &Path) -> Result<i64, TslError> {
    let file = File::open(path).map_err(|err| TslError::Io(err.to_string()))?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_sequence = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                in_sequence = start.local_name().as_ref() == SEQUENCE_ELEMENT;
            }
            Ok(Event::Empty(empty)) if empty.local_name().as_ref() == SEQUENCE_ELEMENT => {
                return Err(TslError::MissingSequenceNumber);
            }
            Ok(Event::Text(text)) if in_sequence => {
                let value = text.unescape().map_err(|err| TslError::Parse(err.to_string()))?;
                return value.trim().parse::<i64>().map_err(|_| {
                    TslError::Parse(format!("sequence number not an integer: {value}"))
                });
            }
            Ok(Event::End(_)) if in_sequence => return Err(TslError::MissingSequenceNumber),
            Ok(Event::Eof) => return Err(TslError::MissingSequenceNumber),
            Ok(_) => {}
            Err(err) => return Err(TslError::Parse(err.to_string())),
        }
        buf.clear();
    }
}

// ============================================================================
// SECTION: Synchronizer
// ============================================================================

/// Outcome of one synchronization pass, by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TslSyncReport {
    /// Files copied into the cache.
    pub copied: Vec<String>,
    /// Files whose cached copy was already current.
    pub unchanged: Vec<String>,
    /// Files skipped after an error.
    pub skipped: Vec<String>,
}

/// Per-file decision.
enum FileOutcome {
    /// Packaged file was copied.
    Copied,
    /// Cached copy kept.
    Unchanged,
}

/// Packaged-to-cache trusted list synchronizer.
#[derive(Clone)]
pub struct TrustListSynchronizer {
    /// Read-only packaged TSL directory.
    packaged_dir: PathBuf,
    /// Writable TSL cache directory.
    cache_dir: PathBuf,
    /// Audit sink for per-file outcomes.
    audit: Arc<dyn ConfigAuditSink>,
}

impl TrustListSynchronizer {
    /// Creates a synchronizer with a no-op audit sink.
    #[must_use]
    pub fn new(packaged_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            packaged_dir: packaged_dir.into(),
            cache_dir: cache_dir.into(),
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn ConfigAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Runs one synchronization pass over every packaged `.xml` file.
    ///
    /// # Errors
    ///
    /// Returns [`TslError::Io`] only when the packaged directory cannot be
    /// listed or the cache directory cannot be created; per-file failures
    /// are reported in [`TslSyncReport::skipped`].
    pub fn synchronize(&self) -> Result<TslSyncReport, TslError> {
        fs::create_dir_all(&self.cache_dir).map_err(|err| TslError::Io(err.to_string()))?;
        let mut report = TslSyncReport::default();
        for name in self.packaged_files()? {
            match self.sync_file(&name) {
                Ok(FileOutcome::Copied) => {
                    self.record(ConfigEventKind::TslCopied, &name, None);
                    report.copied.push(name);
                }
                Ok(FileOutcome::Unchanged) => {
                    self.record(ConfigEventKind::TslUnchanged, &name, None);
                    report.unchanged.push(name);
                }
                Err(err) => {
                    self.record(ConfigEventKind::TslSkipped, &name, Some(err.to_string()));
                    report.skipped.push(name);
                }
            }
        }
        Ok(report)
    }

    /// Runs [`Self::synchronize`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`TslError`] from the pass, or [`TslError::Io`] when the worker
    /// task does not complete.
    pub async fn synchronize_in_background(&self) -> Result<TslSyncReport, TslError> {
        let synchronizer = self.clone();
        tokio::task::spawn_blocking(move || synchronizer.synchronize())
            .await
            .map_err(|err| TslError::Io(format!("tsl sync task failed: {err}")))?
    }

    /// Lists packaged `.xml` file names in sorted order.
    fn packaged_files(&self) -> Result<Vec<String>, TslError> {
        let entries =
            fs::read_dir(&self.packaged_dir).map_err(|err| TslError::Io(err.to_string()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| TslError::Io(err.to_string()))?;
            let path = entry.path();
            let is_xml = path.extension().is_some_and(|ext| ext == TSL_EXTENSION);
            if is_xml
                && path.is_file()
                && let Some(name) = path.file_name().and_then(|name| name.to_str())
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Reconciles one packaged file with its cached copy.
    fn sync_file(&self, name: &str) -> Result<FileOutcome, TslError> {
        let packaged = self.packaged_dir.join(name);
        let cached = self.cache_dir.join(name);
        if !cached.exists() {
            self.replace(&packaged, &cached, name)?;
            return Ok(FileOutcome::Copied);
        }
        let packaged_sequence = read_sequence_number(&packaged)?;
        let cached_sequence = read_sequence_number(&cached)?;
        if packaged_sequence > cached_sequence {
            self.replace(&packaged, &cached, name)?;
            return Ok(FileOutcome::Copied);
        }
        Ok(FileOutcome::Unchanged)
    }

    /// Copies `packaged` over `cached` and drops the stale etag sidecar.
    fn replace(&self, packaged: &Path, cached: &Path, name: &str) -> Result<(), TslError> {
        fs::copy(packaged, cached).map_err(|err| TslError::Io(err.to_string()))?;
        let etag = self.cache_dir.join(format!("{name}{ETAG_SUFFIX}"));
        match fs::remove_file(&etag) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(TslError::Io(err.to_string())),
        }
    }

    /// Records a per-file audit event.
    fn record(&self, kind: ConfigEventKind, name: &str, detail: Option<String>) {
        let mut event = ConfigAuditEvent::new(kind).with_file(name);
        if let Some(detail) = detail {
            event = event.with_detail(detail);
        }
        self.audit.record(&event);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
