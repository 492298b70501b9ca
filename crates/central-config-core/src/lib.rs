// crates/central-config-core/src/lib.rs
// ============================================================================
// Module: Central Config Core Library
// Description: Verification, parsing, and freshness rules for central config.
// Purpose: Provide the I/O-free trust decisions shared by every client.
// Dependencies: rsa, serde_json, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! `central-config-core` holds the pure logic behind the configuration client:
//! RSA/SHA-512 signature checks, typed field extraction from the configuration
//! document, and the anti-rollback serial gate. Nothing here touches the
//! network or the file system, so every decision is reproducible in tests.
//!
//! Security posture: every input handled here is untrusted until
//! [`signature::verify_signature`] has accepted it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clock;
pub mod document;
pub mod freshness;
pub mod parser;
pub mod signature;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::Clock;
pub use clock::SystemClock;
pub use document::ConfigurationDocument;
pub use document::DocumentError;
pub use document::MetaInf;
pub use freshness::is_check_due;
pub use freshness::is_newer;
pub use parser::ConfigParser;
pub use parser::ParseError;
pub use signature::TrustAnchor;
pub use signature::verify_signature;
