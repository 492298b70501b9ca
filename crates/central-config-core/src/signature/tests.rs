// crates/central-config-core/src/signature/tests.rs
// ============================================================================
// Module: Signature Verification Tests
// Description: Unit tests for RSA/SHA-512 verification and anchor pinning.
// Purpose: Validate that any single-byte tamper is rejected.
// Dependencies: central-config-core, proptest, rand, rsa
// ============================================================================

//! ## Overview
//! Exercises [`super::verify_signature`] with self-consistent triples and with
//! tampered documents, keys, and signatures.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::OnceLock;

use proptest::prelude::*;
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::pkcs8::LineEnding;
use rsa::signature::SignatureEncoding;
use rsa::signature::Signer;
use sha2::Sha512;

use super::TrustAnchor;
use super::verify_signature;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Test key material shared by every test in this module.
struct KeyFixture {
    /// Private key used for signing.
    private_key: RsaPrivateKey,
    /// SPKI PEM encoding of the public key.
    spki_pem: String,
    /// PKCS#1 PEM encoding of the public key.
    pkcs1_pem: String,
}

/// Returns the shared signing key fixture.
fn fixture() -> &'static KeyFixture {
    /// Lazily generated fixture.
    static FIXTURE: OnceLock<KeyFixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public_key = private_key.to_public_key();
        KeyFixture {
            spki_pem: public_key.to_public_key_pem(LineEnding::LF).unwrap(),
            pkcs1_pem: public_key.to_pkcs1_pem(LineEnding::LF).unwrap(),
            private_key,
        }
    })
}

/// Returns a public key unrelated to the fixture.
fn other_key_pem() -> &'static str {
    /// Lazily generated foreign key.
    static OTHER: OnceLock<String> = OnceLock::new();
    OTHER.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        private_key.to_public_key().to_public_key_pem(LineEnding::LF).unwrap()
    })
}

/// Signs `content` with the fixture key.
fn sign(content: &[u8]) -> Vec<u8> {
    SigningKey::<Sha512>::new(fixture().private_key.clone()).sign(content).to_vec()
}

/// Signed sample document.
const DOCUMENT: &[u8] = br#"{"META-INF":{"SERIAL":7},"TSA-URL":"https://tsa.example"}"#;

// ============================================================================
// SECTION: Verification Tests
// ============================================================================

#[test]
fn verifies_self_consistent_triple_with_spki_key() {
    let signature = sign(DOCUMENT);
    assert!(verify_signature(&signature, &fixture().spki_pem, DOCUMENT));
}

#[test]
fn verifies_self_consistent_triple_with_pkcs1_key() {
    let signature = sign(DOCUMENT);
    assert!(verify_signature(&signature, &fixture().pkcs1_pem, DOCUMENT));
}

#[test]
fn rejects_signature_from_other_key() {
    let signature = sign(DOCUMENT);
    assert!(!verify_signature(&signature, other_key_pem(), DOCUMENT));
}

#[test]
fn rejects_garbage_key_and_empty_signature() {
    let signature = sign(DOCUMENT);
    assert!(!verify_signature(&signature, "not a pem", DOCUMENT));
    assert!(!verify_signature(&[], &fixture().spki_pem, DOCUMENT));
    assert!(!verify_signature(&signature, "", DOCUMENT));
}

#[test]
fn rejects_tampered_key_body() {
    let signature = sign(DOCUMENT);
    let pem = &fixture().spki_pem;
    let lines: Vec<&str> = pem.lines().collect();
    let middle = lines.len() / 2;
    let mut tampered_line: Vec<u8> = lines[middle].bytes().collect();
    let index = tampered_line.len() / 2;
    tampered_line[index] = if tampered_line[index] == b'A' { b'B' } else { b'A' };
    let mut tampered = String::new();
    for (position, line) in lines.iter().enumerate() {
        if position == middle {
            tampered.push_str(std::str::from_utf8(&tampered_line).unwrap());
        } else {
            tampered.push_str(line);
        }
        tampered.push('\n');
    }
    assert!(!verify_signature(&signature, &tampered, DOCUMENT));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_single_document_byte_change_is_rejected(index in 0usize..DOCUMENT.len(), flip in 1u8..=255) {
        let signature = sign(DOCUMENT);
        let mut tampered = DOCUMENT.to_vec();
        tampered[index] ^= flip;
        prop_assert!(!verify_signature(&signature, &fixture().spki_pem, &tampered));
    }

    #[test]
    fn any_single_signature_byte_change_is_rejected(index in 0usize..128, flip in 1u8..=255) {
        let mut signature = sign(DOCUMENT);
        let index = index % signature.len();
        signature[index] ^= flip;
        prop_assert!(!verify_signature(&signature, &fixture().spki_pem, DOCUMENT));
    }
}

// ============================================================================
// SECTION: Trust Anchor Tests
// ============================================================================

#[test]
fn anchor_matches_key_with_different_line_endings() {
    let anchor = TrustAnchor::new(fixture().spki_pem.clone());
    let crlf = fixture().spki_pem.replace('\n', "\r\n");
    assert!(anchor.matches(crlf.as_bytes()));
    assert!(anchor.matches(format!("{}\n\n", fixture().spki_pem).as_bytes()));
}

#[test]
fn anchor_rejects_consistent_triple_under_foreign_key() {
    let anchor = TrustAnchor::new(other_key_pem());
    let signature = sign(DOCUMENT);
    assert!(verify_signature(&signature, &fixture().spki_pem, DOCUMENT));
    assert!(!anchor.verify_triple(&signature, fixture().spki_pem.as_bytes(), DOCUMENT));
}

#[test]
fn anchor_accepts_triple_signed_by_anchor_key() {
    let anchor = TrustAnchor::new(fixture().spki_pem.clone());
    let signature = sign(DOCUMENT);
    assert!(anchor.verify_triple(&signature, fixture().spki_pem.as_bytes(), DOCUMENT));
}

#[test]
fn anchor_debug_output_omits_key_material() {
    let anchor = TrustAnchor::new(fixture().spki_pem.clone());
    let rendered = format!("{anchor:?}");
    assert!(!rendered.contains("BEGIN"));
}
