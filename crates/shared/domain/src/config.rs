use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level API configuration shared across services.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// `SurrealDB` connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<DatabaseCredentials>,
}

/// `SurrealDB` root credentials (optional when using unauthenticated engines like mem://).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
}

/// Filesystem roots used by the vault.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding encrypted blob files.
    pub blobs_dir: PathBuf,
}

/// Security knobs of the vault API.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub token: TokenConfig,
    pub credentials: CredentialPolicy,
    pub hash: HashConfig,
}

/// Bearer token signing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HS256 signing key, base64 (raw, unpadded, standard alphabet).
    pub secret: String,
    /// Token lifetime in seconds.
    pub lifespan_seconds: u64,
    /// Accepted clock skew when validating expiry, in seconds.
    pub clock_skew_seconds: u64,
}

/// Minimum lengths accepted for new credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialPolicy {
    pub username_min_len: usize,
    pub password_min_len: usize,
}

/// Argon2id cost parameters for the password hash of record.
///
/// A value of zero keeps the crate default for that parameter.
#[derive(Default, Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 8443, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mem://".to_owned(),
            namespace: "lockbox".to_owned(),
            database: "vault".to_owned(),
            credentials: None,
        }
    }
}

impl Default for DatabaseCredentials {
    fn default() -> Self {
        Self { username: "root".to_owned(), password: "root".to_owned() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { blobs_dir: PathBuf::from("blobs") }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            // "dev-only-change-me"; override in any real deployment.
            secret: "ZGV2LW9ubHktY2hhbmdlLW1l".to_owned(),
            lifespan_seconds: 3600,
            clock_skew_seconds: 0,
        }
    }
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self { username_min_len: 3, password_min_len: 6 }
    }
}
