// crates/central-config-client/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared signing keys, documents, and a loopback service.
// Purpose: Provide reusable infrastructure for client integration tests.
// Dependencies: central-config-client, rsa, serde_json, tempfile, tiny_http
// ============================================================================

//! ## Overview
//! Fixtures sign complete configuration documents, lay out packaged
//! directories, and serve artifact triples from a `tiny_http` server.
//!
//! Security posture: every triple is signed with a throwaway 1024-bit key;
//! nothing here is suitable outside tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::Duration;

use central_config_client::ClientSettings;
use central_config_client::RawConfigArtifacts;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::pkcs8::LineEnding;
use rsa::signature::SignatureEncoding;
use rsa::signature::Signer;
use serde_json::json;
use sha2::Sha512;
use tempfile::TempDir;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Service signing key.
pub struct ServiceKey {
    /// RSA/SHA-512 signer.
    signer: SigningKey<Sha512>,
    /// SPKI PEM public key.
    pub pem: String,
}

impl ServiceKey {
    /// Signs a complete document with `serial`.
    pub fn signed(&self, serial: i64) -> RawConfigArtifacts {
        let document = document_bytes(serial);
        let signature = self.signer.sign(&document).to_vec();
        RawConfigArtifacts::new(document, self.pem.clone().into_bytes(), signature)
    }
}

/// Returns the key shared by every integration test.
pub fn service_key() -> &'static ServiceKey {
    /// Lazily generated key.
    static KEY: OnceLock<ServiceKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("rsa key");
        let pem = private_key.to_public_key().to_public_key_pem(LineEnding::LF).expect("pem");
        ServiceKey {
            signer: SigningKey::<Sha512>::new(private_key),
            pem,
        }
    })
}

/// Renders a complete configuration document.
pub fn document_bytes(serial: i64) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "META-INF": {
            "URL": "https://id.example/config/config.json",
            "DATE": "20250110120000Z",
            "SERIAL": serial,
            "VER": 1
        },
        "SIVA-URL": "https://siva.example/V3",
        "TSL-URL": "https://tsl.example/eu-lotl.xml",
        "TSL-CERTS": ["MIIB-first"],
        "TSA-URL": format!("https://tsa.example/{serial}"),
        "OCSP-URL-ISSUER": { "ESTEID2018": "https://ocsp.example/esteid2018" },
        "LDAP-PERSON-URL": "ldaps://esteid.example",
        "LDAP-CORP-URL": "ldaps://k3.example",
        "MID-PROXY-URL": "https://mid-proxy.example",
        "MID-SK-URL": "https://mid.example",
        "SIDV2-PROXY-URL": "https://sid-proxy.example/v2",
        "SIDV2-SK-URL": "https://sid.example/v2",
        "CERT-BUNDLE": ["MIIC-bundle"]
    }))
    .expect("document json")
}

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Application directories under one temp root.
pub struct AppDirs {
    /// Keeps the temp root alive.
    _root: TempDir,
    /// Writable cache directory.
    pub cache_dir: PathBuf,
    /// Read-only packaged directory.
    pub packaged_dir: PathBuf,
}

impl AppDirs {
    /// Creates the layout with packaged serial `serial`.
    pub fn with_packaged(serial: i64) -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        let cache_dir = root.path().join("cache");
        let packaged_dir = root.path().join("packaged");
        std::fs::create_dir_all(&packaged_dir).expect("packaged dir");
        let artifacts = service_key().signed(serial);
        write(&packaged_dir, "config.json", &artifacts.document);
        write(&packaged_dir, "config.pub", &artifacts.public_key);
        write(&packaged_dir, "config.rsa", &artifacts.signature);
        let properties = format!(
            "#Packaged defaults\n\
             central-configuration-service.url=https\\://id.example/config\n\
             configuration.update-interval=4\n\
             configuration.version-serial={serial}\n\
             configuration.download-date=10-01-2025 12\\:30\\:05\n"
        );
        write(&packaged_dir, "configuration.properties", properties.as_bytes());
        Self {
            _root: root,
            cache_dir,
            packaged_dir,
        }
    }

    /// Returns settings pointing at `service_url` with plain http allowed.
    pub fn settings(&self, service_url: &str) -> ClientSettings {
        let mut settings = ClientSettings::default_for(&self.cache_dir, &self.packaged_dir);
        settings.service.url = Some(service_url.to_string());
        settings.service.allow_http = true;
        settings.service.timeout_ms = 2_000;
        settings
    }
}

/// Writes `bytes` to `dir/name`.
pub fn write(dir: &Path, name: &str, bytes: &[u8]) {
    std::fs::create_dir_all(dir).expect("dir");
    std::fs::write(dir.join(name), bytes).expect("write");
}

// ============================================================================
// SECTION: Loopback Service
// ============================================================================

/// Configuration service on loopback serving a mutable artifact set.
pub struct TestService {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Served files keyed by request path.
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    /// Paths requested so far.
    requests: Arc<Mutex<Vec<String>>>,
    /// Stop flag for the server thread.
    stop: Arc<AtomicBool>,
    /// Server thread.
    handle: Option<JoinHandle<()>>,
}

impl TestService {
    /// Starts an empty service; unknown paths answer 404.
    pub fn start() -> Self {
        let server = Server::http("127.0.0.1:0").expect("http server");
        let base_url = format!("http://{}/conf", server.server_addr());
        let files = Arc::new(Mutex::new(BTreeMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let files = Arc::clone(&files);
            let requests = Arc::clone(&requests);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(50)) else {
                        continue;
                    };
                    let path = request.url().to_string();
                    let body = files.lock().unwrap().get(&path).cloned();
                    requests.lock().unwrap().push(path);
                    let response = match body {
                        Some(body) => Response::from_data(body),
                        None => Response::from_data(Vec::new()).with_status_code(404),
                    };
                    let _ = request.respond(response);
                }
            })
        };
        Self {
            base_url,
            files,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    /// Publishes a triple under the standard file names.
    pub fn publish(&self, artifacts: &RawConfigArtifacts) {
        let mut files = self.files.lock().unwrap();
        files.insert("/conf/config.json".to_string(), artifacts.document.clone());
        files.insert("/conf/config.pub".to_string(), artifacts.public_key.clone());
        files.insert("/conf/config.rsa".to_string(), artifacts.signature.clone());
    }

    /// Returns how many document fetches the service answered.
    pub fn document_requests(&self) -> usize {
        self.requests.lock().unwrap().iter().filter(|path| path.ends_with("config.json")).count()
    }
}

impl Drop for TestService {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
