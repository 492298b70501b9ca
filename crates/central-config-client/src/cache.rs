// crates/central-config-client/src/cache.rs
// ============================================================================
// Module: Configuration Cache
// Description: Durable store for the last verified artifact triple.
// Purpose: Let bootstrap publish the last trusted configuration offline.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ConfigCache`] owns one directory holding `active-config.json`,
//! `active-config.pub`, and `active-config.rsa`.
//!
//! Invariants:
//! - Only triples that already verified are handed to [`ConfigCache::store`].
//! - Reads are capped at [`MAX_LOCAL_ARTIFACT_BYTES`] per file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::artifacts::CACHED_DOCUMENT;
use crate::artifacts::CACHED_PUBLIC_KEY;
use crate::artifacts::CACHED_SIGNATURE;
use crate::artifacts::RawConfigArtifacts;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of any artifact read from local disk.
pub const MAX_LOCAL_ARTIFACT_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Cache read and write errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// File is absent or not a regular file.
    #[error("cache file not found: {0}")]
    NotFound(String),
    /// File system failure.
    #[error("cache io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Cache of the last verified artifact triple.
#[derive(Debug, Clone)]
pub struct ConfigCache {
    /// Directory holding the cached artifacts.
    dir: PathBuf,
}

impl ConfigCache {
    /// Creates a cache rooted at `dir`. The directory is created on first store.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Writes the three artifacts to their fixed file names.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when the directory or any file cannot be
    /// written.
    pub fn store(
        &self,
        document: &[u8],
        public_key: &[u8],
        signature: &[u8],
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|err| CacheError::Io(err.to_string()))?;
        for (name, bytes) in [
            (CACHED_DOCUMENT, document),
            (CACHED_PUBLIC_KEY, public_key),
            (CACHED_SIGNATURE, signature),
        ] {
            fs::write(self.dir.join(name), bytes)
                .map_err(|err| CacheError::Io(format!("{name}: {err}")))?;
        }
        Ok(())
    }

    /// Writes a triple to the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when any file cannot be written.
    pub fn store_artifacts(&self, artifacts: &RawConfigArtifacts) -> Result<(), CacheError> {
        self.store(&artifacts.document, &artifacts.public_key, &artifacts.signature)
    }

    /// Reads one cached file by name.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] when the file is absent or not a
    /// regular file, and [`CacheError::Io`] on read failure.
    pub fn load(&self, filename: &str) -> Result<Vec<u8>, CacheError> {
        read_limited(&self.dir.join(filename), MAX_LOCAL_ARTIFACT_BYTES)
    }

    /// Reads the full cached triple.
    ///
    /// # Errors
    ///
    /// Returns the first [`CacheError`] encountered; a partial triple is never
    /// returned.
    pub fn load_artifacts(&self) -> Result<RawConfigArtifacts, CacheError> {
        Ok(RawConfigArtifacts::new(
            self.load(CACHED_DOCUMENT)?,
            self.load(CACHED_PUBLIC_KEY)?,
            self.load(CACHED_SIGNATURE)?,
        ))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a regular file, failing when it exceeds `max_bytes`.
pub(crate) fn read_limited(path: &Path, max_bytes: usize) -> Result<Vec<u8>, CacheError> {
    let label = path.display().to_string();
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(CacheError::NotFound(label));
        }
        Err(err) => return Err(CacheError::Io(format!("{label}: {err}"))),
    };
    if !metadata.is_file() {
        return Err(CacheError::NotFound(label));
    }
    let file = File::open(path).map_err(|err| CacheError::Io(format!("{label}: {err}")))?;
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    file.take(limit)
        .read_to_end(&mut bytes)
        .map_err(|err| CacheError::Io(format!("{label}: {err}")))?;
    if bytes.len() > max_bytes {
        return Err(CacheError::Io(format!("{label}: exceeds {max_bytes} bytes")));
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
