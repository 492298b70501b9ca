// crates/central-config-client/src/fetcher.rs
// ============================================================================
// Module: Configuration Fetcher
// Description: Retrieves the remote artifact triple over HTTPS.
// Purpose: Fetch config.json, config.pub, and config.rsa as one unit.
// Dependencies: async-trait, reqwest, thiserror, tokio, url
// ============================================================================

//! ## Overview
//! [`ConfigFetcher`] is the transport seam of the client; the orchestrator
//! only sees [`RawConfigArtifacts`] or a [`FetchError`].
//! [`HttpConfigFetcher`] issues three concurrent GET requests relative to the
//! service base URL.
//!
//! Invariants:
//! - Any failed request fails the whole fetch; no partial triple escapes.
//! - Non-success statuses fail closed and redirects are not followed.
//! - Bodies are capped at the configured byte limit.
//! - No retries; callers retry by refreshing again.
//!
//! Security posture: responses are untrusted until the orchestrator verifies
//! them against the trust anchor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

use crate::artifacts::DOCUMENT;
use crate::artifacts::PUBLIC_KEY;
use crate::artifacts::RawConfigArtifacts;
use crate::artifacts::SIGNATURE;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default per-phase timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default per-artifact size cap.
pub const DEFAULT_MAX_ARTIFACT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fetch failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network unreachable, timeout, or body read failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Service answered with a non-success status.
    #[error("{artifact} returned status {status}")]
    Status {
        /// Artifact file name.
        artifact: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// Artifact body exceeded the size cap.
    #[error("{artifact} exceeds {max_bytes} bytes")]
    TooLarge {
        /// Artifact file name.
        artifact: &'static str,
        /// Configured cap.
        max_bytes: usize,
    },
    /// Service URL is unusable.
    #[error("invalid service url: {0}")]
    InvalidUrl(String),
    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Source of remote artifact triples.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Fetches the triple published under `service_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when any of the three artifacts cannot be
    /// retrieved.
    async fn fetch(&self, service_url: &str) -> Result<RawConfigArtifacts, FetchError>;
}

// ============================================================================
// SECTION: HTTP Fetcher
// ============================================================================

/// HTTP fetcher options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherOptions {
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Connect, read, and whole-request timeout.
    pub timeout: Duration,
    /// Per-artifact size cap.
    pub max_artifact_bytes: usize,
    /// Accept `http` service URLs.
    pub allow_http: bool,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: DEFAULT_TIMEOUT,
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
            allow_http: false,
        }
    }
}

/// Returns `central-config/<version> (<os>)`.
#[must_use]
pub fn default_user_agent() -> String {
    format!("central-config/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS)
}

/// [`ConfigFetcher`] backed by `reqwest`.
///
/// # Invariants
/// - Redirects are rejected.
/// - Each response body is capped at `max_artifact_bytes`.
#[derive(Debug, Clone)]
pub struct HttpConfigFetcher {
    /// HTTP client.
    client: Client,
    /// Per-artifact size cap.
    max_artifact_bytes: usize,
    /// Accept `http` service URLs.
    allow_http: bool,
}

impl HttpConfigFetcher {
    /// Builds a fetcher from options.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] when the HTTP client cannot be built.
    pub fn new(options: &FetcherOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(options.user_agent.clone())
            .connect_timeout(options.timeout)
            .read_timeout(options.timeout)
            .timeout(options.timeout)
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;
        Ok(Self {
            client,
            max_artifact_bytes: options.max_artifact_bytes,
            allow_http: options.allow_http,
        })
    }

    /// Resolves `artifact` under the service base URL.
    fn artifact_url(&self, service_url: &str, artifact: &str) -> Result<Url, FetchError> {
        let base = service_url.trim().trim_end_matches('/');
        let url = Url::parse(&format!("{base}/{artifact}"))
            .map_err(|err| FetchError::InvalidUrl(err.to_string()))?;
        match url.scheme() {
            "https" => Ok(url),
            "http" if self.allow_http => Ok(url),
            scheme => Err(FetchError::InvalidUrl(format!("unsupported scheme: {scheme}"))),
        }
    }

    /// Fetches one artifact body.
    async fn get(
        &self,
        service_url: &str,
        artifact: &'static str,
    ) -> Result<Vec<u8>, FetchError> {
        let url = self.artifact_url(service_url, artifact)?;
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(format!("{artifact}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                artifact,
                status: status.as_u16(),
            });
        }
        let too_large = FetchError::TooLarge {
            artifact,
            max_bytes: self.max_artifact_bytes,
        };
        if let Some(length) = response.content_length()
            && !usize::try_from(length).is_ok_and(|length| length <= self.max_artifact_bytes)
        {
            return Err(too_large);
        }
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| FetchError::Transport(format!("{artifact}: {err}")))?
        {
            if body.len().saturating_add(chunk.len()) > self.max_artifact_bytes {
                return Err(too_large);
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl ConfigFetcher for HttpConfigFetcher {
    async fn fetch(&self, service_url: &str) -> Result<RawConfigArtifacts, FetchError> {
        let (document, public_key, signature) = tokio::try_join!(
            self.get(service_url, DOCUMENT),
            self.get(service_url, PUBLIC_KEY),
            self.get(service_url, SIGNATURE),
        )?;
        Ok(RawConfigArtifacts::new(document, public_key, signature))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
