// crates/central-config-core/src/document.rs
// ============================================================================
// Module: Configuration Document Model
// Description: Typed, immutable view of a verified configuration document.
// Purpose: Map the central configuration JSON onto named runtime endpoints.
// Dependencies: serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! [`ConfigurationDocument`] is the value the rest of the signing application
//! consumes: service endpoints, trusted-list location and certificates, the
//! OCSP issuer map, and a certificate bundle. Documents are built with
//! [`ConfigurationDocument::from_bytes`], which requires every field; one
//! missing or mistyped field rejects the whole document.
//!
//! Invariants:
//! - A document is only constructed from text that parsed completely.
//! - `meta_inf.serial` is the ordering key for anti-rollback decisions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use time::OffsetDateTime;

use crate::parser::ConfigParser;
use crate::parser::ParseError;

// ============================================================================
// SECTION: Field Paths
// ============================================================================

/// Metadata object name.
const META_INF: &str = "META-INF";

/// Field paths of the configuration document.
mod fields {
    /// Source URL of the document.
    pub const URL: &[&str] = &[super::META_INF, "URL"];
    /// Issue date string.
    pub const DATE: &[&str] = &[super::META_INF, "DATE"];
    /// Monotonic serial number.
    pub const SERIAL: &[&str] = &[super::META_INF, "SERIAL"];
    /// Schema version.
    pub const VERSION: &[&str] = &[super::META_INF, "VER"];
    /// Remote validation service.
    pub const SIVA_URL: &[&str] = &["SIVA-URL"];
    /// Trusted list location.
    pub const TSL_URL: &[&str] = &["TSL-URL"];
    /// Trusted list signer certificates.
    pub const TSL_CERTS: &[&str] = &["TSL-CERTS"];
    /// Timestamp authority.
    pub const TSA_URL: &[&str] = &["TSA-URL"];
    /// OCSP responder per issuer.
    pub const OCSP_URLS: &[&str] = &["OCSP-URL-ISSUER"];
    /// Directory lookup for natural persons.
    pub const LDAP_PERSON_URL: &[&str] = &["LDAP-PERSON-URL"];
    /// Directory lookup for legal persons.
    pub const LDAP_CORP_URL: &[&str] = &["LDAP-CORP-URL"];
    /// Mobile-ID proxy REST endpoint.
    pub const MID_REST_URL: &[&str] = &["MID-PROXY-URL"];
    /// Mobile-ID direct REST endpoint.
    pub const MID_SK_REST_URL: &[&str] = &["MID-SK-URL"];
    /// Smart-ID v2 proxy REST endpoint.
    pub const SID_V2_REST_URL: &[&str] = &["SIDV2-PROXY-URL"];
    /// Smart-ID v2 direct REST endpoint.
    pub const SID_V2_SK_REST_URL: &[&str] = &["SIDV2-SK-URL"];
    /// Trusted certificate bundle.
    pub const CERT_BUNDLE: &[&str] = &["CERT-BUNDLE"];
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Document bytes are not UTF-8.
    #[error("configuration document is not utf-8")]
    NotUtf8,
    /// A field is missing or has the wrong shape.
    #[error("malformed configuration document: {0}")]
    Malformed(#[from] ParseError),
}

// ============================================================================
// SECTION: Document Model
// ============================================================================

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaInf {
    /// URL the document was published at.
    pub url: String,
    /// Issue date as published (opaque text).
    pub date: String,
    /// Monotonic serial number.
    pub serial: i64,
    /// Schema version.
    pub version: i64,
}

/// Verified central configuration.
///
/// # Invariants
/// - All endpoint fields were present in the source document.
/// - `tsl_certs` and `cert_bundle` preserve source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationDocument {
    /// Document metadata.
    pub meta_inf: MetaInf,
    /// Remote validation service URL.
    pub siva_url: String,
    /// Trusted list URL.
    pub tsl_url: String,
    /// Trusted list signer certificates (PEM or base64 DER text).
    pub tsl_certs: Vec<String>,
    /// Timestamp authority URL.
    pub tsa_url: String,
    /// OCSP responder URL keyed by issuer name.
    pub ocsp_urls: BTreeMap<String, String>,
    /// Directory URL for natural persons.
    pub ldap_person_url: String,
    /// Directory URL for legal persons.
    pub ldap_corp_url: String,
    /// Mobile-ID proxy REST URL.
    pub mid_rest_url: String,
    /// Mobile-ID direct REST URL.
    pub mid_sk_rest_url: String,
    /// Smart-ID v2 proxy REST URL.
    pub sid_v2_rest_url: String,
    /// Smart-ID v2 direct REST URL.
    pub sid_v2_sk_rest_url: String,
    /// Trusted certificate bundle.
    pub cert_bundle: Vec<String>,
    /// Last time the service was checked when this document was published.
    pub last_checked_at: Option<OffsetDateTime>,
    /// Time this document was accepted.
    pub updated_at: Option<OffsetDateTime>,
}

impl ConfigurationDocument {
    /// Builds a document from raw UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when the bytes are not UTF-8 or any field is
    /// missing or mistyped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DocumentError::NotUtf8)?;
        Self::from_json(text)
    }

    /// Builds a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Malformed`] when any field is missing or mistyped.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let parser = ConfigParser::parse(text)?;
        Ok(Self {
            meta_inf: MetaInf {
                url: parser.parse_string(fields::URL)?,
                date: parser.parse_string(fields::DATE)?,
                serial: parser.parse_int(fields::SERIAL)?,
                version: parser.parse_int(fields::VERSION)?,
            },
            siva_url: parser.parse_string(fields::SIVA_URL)?,
            tsl_url: parser.parse_string(fields::TSL_URL)?,
            tsl_certs: parser.parse_string_list(fields::TSL_CERTS)?,
            tsa_url: parser.parse_string(fields::TSA_URL)?,
            ocsp_urls: parser.parse_string_map(fields::OCSP_URLS)?,
            ldap_person_url: parser.parse_string(fields::LDAP_PERSON_URL)?,
            ldap_corp_url: parser.parse_string(fields::LDAP_CORP_URL)?,
            mid_rest_url: parser.parse_string(fields::MID_REST_URL)?,
            mid_sk_rest_url: parser.parse_string(fields::MID_SK_REST_URL)?,
            sid_v2_rest_url: parser.parse_string(fields::SID_V2_REST_URL)?,
            sid_v2_sk_rest_url: parser.parse_string(fields::SID_V2_SK_REST_URL)?,
            cert_bundle: parser.parse_string_list(fields::CERT_BUNDLE)?,
            last_checked_at: None,
            updated_at: None,
        })
    }

    /// Returns the document serial.
    #[must_use]
    pub const fn serial(&self) -> i64 {
        self.meta_inf.serial
    }

    /// Returns the document with its publication timestamps replaced.
    #[must_use]
    pub fn with_timestamps(
        mut self,
        last_checked_at: Option<OffsetDateTime>,
        updated_at: Option<OffsetDateTime>,
    ) -> Self {
        self.last_checked_at = last_checked_at;
        self.updated_at = updated_at;
        self
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
