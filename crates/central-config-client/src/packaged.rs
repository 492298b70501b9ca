// crates/central-config-client/src/packaged.rs
// ============================================================================
// Module: Packaged Defaults
// Description: Read-only configuration shipped with the application.
// Purpose: Provide the last-resort triple and the trust anchor.
// Dependencies: central-config-core
// ============================================================================

//! ## Overview
//! [`PackagedDefaults`] reads `config.json`, `config.pub`, `config.rsa`, and
//! `configuration.properties` from the application's bundled asset
//! directory. The packaged `config.pub` is the trust anchor every cached or
//! fetched triple is checked against. Nothing here ever writes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use central_config_core::TrustAnchor;

use crate::artifacts::DOCUMENT;
use crate::artifacts::PUBLIC_KEY;
use crate::artifacts::RawConfigArtifacts;
use crate::artifacts::SIGNATURE;
use crate::cache::CacheError;
use crate::cache::MAX_LOCAL_ARTIFACT_BYTES;
use crate::cache::read_limited;
use crate::properties::PackagedProperties;
use crate::properties::PropertiesError;

/// Packaged properties file name.
pub const PROPERTIES_FILE: &str = "configuration.properties";

// ============================================================================
// SECTION: Packaged Defaults
// ============================================================================

/// Bundled configuration assets.
#[derive(Debug, Clone)]
pub struct PackagedDefaults {
    /// Asset directory.
    dir: PathBuf,
}

impl PackagedDefaults {
    /// Creates a reader over `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Reads the packaged triple.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when any of the three files is unreadable.
    pub fn load_artifacts(&self) -> Result<RawConfigArtifacts, CacheError> {
        Ok(RawConfigArtifacts::new(
            self.read(DOCUMENT)?,
            self.read(PUBLIC_KEY)?,
            self.read(SIGNATURE)?,
        ))
    }

    /// Returns the packaged public key as a trust anchor, if readable.
    #[must_use]
    pub fn trust_anchor(&self) -> Option<TrustAnchor> {
        self.read(PUBLIC_KEY).ok().and_then(|bytes| TrustAnchor::from_pem_bytes(&bytes))
    }

    /// Reads `configuration.properties`.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError`] when the file is absent or invalid.
    pub fn properties(&self) -> Result<PackagedProperties, PropertiesError> {
        PackagedProperties::load(&self.dir.join(PROPERTIES_FILE))
    }

    /// Reads one packaged file.
    fn read(&self, name: &str) -> Result<Vec<u8>, CacheError> {
        read_limited(&self.dir.join(name), MAX_LOCAL_ARTIFACT_BYTES)
    }
}
