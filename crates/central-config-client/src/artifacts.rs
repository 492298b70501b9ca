// crates/central-config-client/src/artifacts.rs
// ============================================================================
// Module: Configuration Artifacts
// Description: The (document, public key, signature) triple and file names.
// Purpose: Carry unverified artifact bytes as one unit.
// Dependencies: central-config-core
// ============================================================================

//! ## Overview
//! [`RawConfigArtifacts`] is what a fetch, a cache read, or a packaged read
//! produces. It is untrusted until [`RawConfigArtifacts::verify`] accepts it
//! against a [`TrustAnchor`], and it is always accepted or discarded whole.

// ============================================================================
// SECTION: Imports
// ============================================================================

use central_config_core::ConfigurationDocument;
use central_config_core::DocumentError;
use central_config_core::TrustAnchor;

// ============================================================================
// SECTION: File Names
// ============================================================================

/// Cached document file name.
pub const CACHED_DOCUMENT: &str = "active-config.json";
/// Cached public key file name.
pub const CACHED_PUBLIC_KEY: &str = "active-config.pub";
/// Cached signature file name.
pub const CACHED_SIGNATURE: &str = "active-config.rsa";

/// Packaged and remote document file name.
pub const DOCUMENT: &str = "config.json";
/// Packaged and remote public key file name.
pub const PUBLIC_KEY: &str = "config.pub";
/// Packaged and remote signature file name.
pub const SIGNATURE: &str = "config.rsa";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Unverified artifact triple.
#[derive(Clone, PartialEq, Eq)]
pub struct RawConfigArtifacts {
    /// Document bytes (UTF-8 JSON when authentic).
    pub document: Vec<u8>,
    /// PEM public key bytes.
    pub public_key: Vec<u8>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

/// Reasons a triple cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRejection {
    /// Key or signature did not verify against the anchor.
    SignatureInvalid,
    /// Signature verified but the document did not parse.
    Malformed(DocumentError),
}

impl RawConfigArtifacts {
    /// Creates a triple from owned bytes.
    #[must_use]
    pub const fn new(document: Vec<u8>, public_key: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            document,
            public_key,
            signature,
        }
    }

    /// Verifies the triple against `anchor` and parses the document.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactRejection::SignatureInvalid`] when the key differs
    /// from the anchor or the signature fails, and
    /// [`ArtifactRejection::Malformed`] when the verified document is unusable.
    pub fn verify(&self, anchor: &TrustAnchor) -> Result<ConfigurationDocument, ArtifactRejection> {
        if !anchor.verify_triple(&self.signature, &self.public_key, &self.document) {
            return Err(ArtifactRejection::SignatureInvalid);
        }
        ConfigurationDocument::from_bytes(&self.document).map_err(ArtifactRejection::Malformed)
    }
}

impl std::fmt::Debug for RawConfigArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawConfigArtifacts")
            .field("document_len", &self.document.len())
            .field("public_key_len", &self.public_key.len())
            .field("signature_len", &self.signature.len())
            .finish()
    }
}
