// crates/central-config-client/src/tsl/tests.rs
// ============================================================================
// Module: Trusted List Synchronizer Tests
// Description: Unit tests for sequence-number scans and sync decisions.
// Purpose: Validate copy, keep, skip, and etag invalidation rules.
// Dependencies: central-config-client, tempfile, tokio
// ============================================================================

//! ## Overview
//! Builds packaged and cached TSL directories under a temp dir and checks the
//! decision taken for each file.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use super::TrustListSynchronizer;
use super::TslError;
use super::read_sequence_number;
use crate::audit::ConfigEventKind;
use crate::audit::MemoryAuditSink;

/// Renders a namespaced trusted list with the given sequence number.
fn tsl(sequence: i64, marker: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <tsl:TrustServiceStatusList xmlns:tsl=\"http://uri.etsi.org/02231/v2#\">\n\
           <tsl:SchemeInformation>\n\
             <tsl:TSLVersionIdentifier>5</tsl:TSLVersionIdentifier>\n\
             <tsl:TSLSequenceNumber>{sequence}</tsl:TSLSequenceNumber>\n\
             <tsl:SchemeName>{marker}</tsl:SchemeName>\n\
           </tsl:SchemeInformation>\n\
         </tsl:TrustServiceStatusList>\n"
    )
}

/// Packaged and cache directories under one temp root.
struct Layout {
    /// Keeps the temp root alive.
    _root: TempDir,
    /// Packaged TSL directory.
    packaged: PathBuf,
    /// TSL cache directory (not created up front).
    cache: PathBuf,
}

impl Layout {
    /// Creates an empty layout.
    fn new() -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        let packaged = root.path().join("packaged").join("tslFiles");
        std::fs::create_dir_all(&packaged).expect("packaged dir");
        let cache = root.path().join("cache").join("schema");
        Self {
            _root: root,
            packaged,
            cache,
        }
    }

    /// Writes a file into `dir`, creating it.
    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::create_dir_all(dir).expect("dir");
        std::fs::write(dir.join(name), contents).expect("write");
    }

    /// Reads a cached file.
    fn cached(&self, name: &str) -> String {
        std::fs::read_to_string(self.cache.join(name)).expect("cached file")
    }
}

/// Tests the first sequence element wins regardless of namespace prefix.
#[test]
fn reads_first_sequence_number_by_local_name() {
    let layout = Layout::new();
    Layout::write(&layout.packaged, "EE.xml", &tsl(42, "a"));
    assert_eq!(read_sequence_number(&layout.packaged.join("EE.xml")), Ok(42));

    let twice = "<root><TSLSequenceNumber> 7 </TSLSequenceNumber>\
                 <TSLSequenceNumber>9</TSLSequenceNumber></root>";
    Layout::write(&layout.packaged, "twice.xml", twice);
    assert_eq!(read_sequence_number(&layout.packaged.join("twice.xml")), Ok(7));
}

/// Tests missing, empty, and non-numeric sequence numbers are errors.
#[test]
fn sequence_number_errors_are_classified() {
    let layout = Layout::new();
    let cases = [
        ("none.xml", "<root><Other>1</Other></root>"),
        ("empty.xml", "<root><TSLSequenceNumber/></root>"),
        ("blank.xml", "<root><TSLSequenceNumber></TSLSequenceNumber></root>"),
    ];
    for (name, body) in cases {
        Layout::write(&layout.packaged, name, body);
        assert_eq!(
            read_sequence_number(&layout.packaged.join(name)),
            Err(TslError::MissingSequenceNumber),
            "{name}"
        );
    }
    let text = "<root><TSLSequenceNumber>x</TSLSequenceNumber></root>";
    Layout::write(&layout.packaged, "text.xml", text);
    assert!(matches!(
        read_sequence_number(&layout.packaged.join("text.xml")),
        Err(TslError::Parse(_))
    ));
    Layout::write(&layout.packaged, "broken.xml", "<root><a></b></root>");
    assert!(matches!(
        read_sequence_number(&layout.packaged.join("broken.xml")),
        Err(TslError::Parse(_))
    ));
}

/// Tests a newer packaged list replaces the cache and drops its etag.
#[test]
fn newer_packaged_list_replaces_cache_and_etag() {
    let layout = Layout::new();
    Layout::write(&layout.packaged, "EE.xml", &tsl(12, "packaged"));
    Layout::write(&layout.cache, "EE.xml", &tsl(10, "cached"));
    Layout::write(&layout.cache, "EE.xml.etag", "W/\"abc\"");

    let report = TrustListSynchronizer::new(&layout.packaged, &layout.cache)
        .synchronize()
        .expect("sync");
    assert_eq!(report.copied, vec!["EE.xml"]);
    assert!(layout.cached("EE.xml").contains("packaged"));
    assert!(!layout.cache.join("EE.xml.etag").exists());
}

/// Tests an equal or newer cached list is left untouched.
#[test]
fn equal_or_newer_cached_list_is_kept() {
    for cached_sequence in [12, 13] {
        let layout = Layout::new();
        Layout::write(&layout.packaged, "EE.xml", &tsl(12, "packaged"));
        Layout::write(&layout.cache, "EE.xml", &tsl(cached_sequence, "cached"));
        Layout::write(&layout.cache, "EE.xml.etag", "W/\"abc\"");

        let report = TrustListSynchronizer::new(&layout.packaged, &layout.cache)
            .synchronize()
            .expect("sync");
        assert_eq!(report.unchanged, vec!["EE.xml"]);
        assert!(layout.cached("EE.xml").contains("cached"));
        assert!(layout.cache.join("EE.xml.etag").exists());
    }
}

/// Tests missing cached copies are created along with the cache directory.
#[test]
fn absent_cache_is_populated() {
    let layout = Layout::new();
    Layout::write(&layout.packaged, "EE.xml", &tsl(1, "ee"));
    Layout::write(&layout.packaged, "eu-lotl.xml", &tsl(300, "lotl"));
    Layout::write(&layout.packaged, "README.txt", "not a list");

    let report = TrustListSynchronizer::new(&layout.packaged, &layout.cache)
        .synchronize()
        .expect("sync");
    assert_eq!(report.copied, vec!["EE.xml", "eu-lotl.xml"]);
    assert!(!layout.cache.join("README.txt").exists());
}

/// Tests a malformed file is skipped without stopping the others.
#[test]
fn malformed_file_is_skipped_and_logged() {
    let layout = Layout::new();
    Layout::write(&layout.packaged, "A.xml", "<root><a></b></root>");
    Layout::write(&layout.cache, "A.xml", &tsl(1, "cached-a"));
    Layout::write(&layout.packaged, "B.xml", &tsl(5, "packaged-b"));
    Layout::write(&layout.cache, "B.xml", &tsl(4, "cached-b"));

    let audit = Arc::new(MemoryAuditSink::new());
    let report = TrustListSynchronizer::new(&layout.packaged, &layout.cache)
        .with_audit_sink(audit.clone())
        .synchronize()
        .expect("sync");
    assert_eq!(report.skipped, vec!["A.xml"]);
    assert_eq!(report.copied, vec!["B.xml"]);
    assert!(layout.cached("A.xml").contains("cached-a"));
    assert_eq!(audit.kinds(), vec![ConfigEventKind::TslSkipped, ConfigEventKind::TslCopied]);
}

/// Tests an unreadable packaged directory fails the pass.
#[test]
fn missing_packaged_directory_is_an_error() {
    let layout = Layout::new();
    let synchronizer = TrustListSynchronizer::new(layout.packaged.join("absent"), &layout.cache);
    assert!(matches!(synchronizer.synchronize(), Err(TslError::Io(_))));
}

/// Tests the background helper runs the same pass.
#[tokio::test]
async fn background_sync_matches_direct_sync() {
    let layout = Layout::new();
    Layout::write(&layout.packaged, "EE.xml", &tsl(3, "ee"));
    let synchronizer = TrustListSynchronizer::new(&layout.packaged, &layout.cache);
    let report = synchronizer.synchronize_in_background().await.expect("sync");
    assert_eq!(report.copied, vec!["EE.xml"]);
    let again = synchronizer.synchronize_in_background().await.expect("sync");
    assert_eq!(again.unchanged, vec!["EE.xml"]);
}
