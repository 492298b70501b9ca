// crates/central-config-core/src/signature.rs
// ============================================================================
// Module: Configuration Signature Verification
// Description: RSA/SHA-512 verification of configuration artifacts.
// Purpose: Decide whether a (document, key, signature) triple is authentic.
// Dependencies: rsa, sha2
// ============================================================================

//! ## Overview
//! [`verify_signature`] runs `SHA512withRSA` (PKCS#1 v1.5) verification over a
//! byte payload using a PEM public key. Both `PUBLIC KEY` (X.509
//! SubjectPublicKeyInfo) and `RSA PUBLIC KEY` (PKCS#1) encodings are accepted.
//!
//! Invariants:
//! - Verification never panics and never returns an error value.
//! - A malformed key, an unsupported key type, a malformed signature and a
//!   signature mismatch all yield the same `false`.
//!
//! [`TrustAnchor`] pins the single public key that configuration artifacts
//! must be signed with.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::Signature;
use rsa::pkcs1v15::VerifyingKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha2::Sha512;

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verifies an RSA/SHA-512 signature over `signed_content`.
///
/// Returns `true` only when `public_key_pem` parses as an RSA public key and
/// `signature` is a valid PKCS#1 v1.5 SHA-512 signature of `signed_content`
/// under that key.
#[must_use]
pub fn verify_signature(signature: &[u8], public_key_pem: &str, signed_content: &[u8]) -> bool {
    let Some(public_key) = parse_public_key(public_key_pem) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(signature) else {
        return false;
    };
    VerifyingKey::<Sha512>::new(public_key).verify(signed_content, &signature).is_ok()
}

/// Parses an RSA public key from SPKI or PKCS#1 PEM text.
fn parse_public_key(public_key_pem: &str) -> Option<RsaPublicKey> {
    let trimmed = public_key_pem.trim();
    RsaPublicKey::from_public_key_pem(trimmed)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(trimmed))
        .ok()
}

// ============================================================================
// SECTION: Trust Anchor
// ============================================================================

/// The pinned public key every accepted configuration must be signed with.
///
/// # Invariants
/// - Candidate keys are compared after removing all ASCII whitespace, so line
///   ending and trailing newline differences do not matter.
/// - A candidate key that differs from the anchor never verifies, even when
///   its own signature is internally consistent.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    /// Anchor key as PEM text.
    pem: String,
}

impl TrustAnchor {
    /// Creates an anchor from PEM text.
    #[must_use]
    pub fn new(pem: impl Into<String>) -> Self {
        Self {
            pem: pem.into(),
        }
    }

    /// Creates an anchor from raw PEM bytes, rejecting non UTF-8 input.
    #[must_use]
    pub fn from_pem_bytes(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok().map(Self::new)
    }

    /// Returns true when `candidate_pem` encodes the same text as the anchor.
    #[must_use]
    pub fn matches(&self, candidate_pem: &[u8]) -> bool {
        let anchor = self.pem.bytes().filter(|byte| !byte.is_ascii_whitespace());
        let candidate = candidate_pem.iter().copied().filter(|byte| !byte.is_ascii_whitespace());
        anchor.eq(candidate)
    }

    /// Verifies a full artifact triple against the anchor.
    ///
    /// The candidate key must match the anchor and the signature must verify
    /// under the anchor key.
    #[must_use]
    pub fn verify_triple(&self, signature: &[u8], candidate_pem: &[u8], content: &[u8]) -> bool {
        self.matches(candidate_pem) && verify_signature(signature, &self.pem, content)
    }
}

impl std::fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchor").field("pem_len", &self.pem.len()).finish()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
