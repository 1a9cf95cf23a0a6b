//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::auth::models::UserType;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub jwt: JwtConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub middleware: MiddlewareConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    /// Accounts known to the built-in user directory
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// Server configuration for the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Signing identity and per-kind token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Ed25519 private key, PEM encoded
    #[serde(default)]
    pub private_key: Option<String>,

    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Ed25519 public key, PEM encoded
    #[serde(default)]
    pub public_key: Option<String>,

    #[serde(default)]
    pub public_key_path: Option<PathBuf>,

    #[serde(default = "default_access_token")]
    pub access: TokenConfig,

    #[serde(default = "default_refresh_token")]
    pub refresh: TokenConfig,
}

/// Issuer and lifetime of one token kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub issuer: String,

    /// Lifetime in seconds
    pub expiration: u64,
}

fn default_access_token() -> TokenConfig {
    TokenConfig {
        issuer: "kuryr-admin".to_string(),
        expiration: 15 * 60,
    }
}

fn default_refresh_token() -> TokenConfig {
    TokenConfig {
        issuer: "kuryr-admin-refresh".to_string(),
        expiration: 7 * 24 * 60 * 60,
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            private_key_path: None,
            public_key: None,
            public_key_path: None,
            access: default_access_token(),
            refresh: default_refresh_token(),
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in seconds
    #[serde(default = "default_session_expiration")]
    pub expiration: u64,

    #[serde(default)]
    pub backend: SessionBackend,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Upper bound for a single store operation
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,

    /// How often the in-memory store drops expired entries, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

fn default_session_expiration() -> u64 {
    7 * 24 * 60 * 60
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_op_timeout_ms() -> u64 {
    500
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiration: default_session_expiration(),
            backend: SessionBackend::default(),
            redis_url: default_redis_url(),
            op_timeout_ms: default_op_timeout_ms(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Where sessions are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Memory,
    Redis,
}

/// Authentication middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Header carrying the access token
    #[serde(default = "default_header")]
    pub header: String,

    /// Paths that bypass authentication (exact match)
    #[serde(default = "default_ignores")]
    pub ignores: Vec<String>,

    /// Also require a live session on every request
    #[serde(default)]
    pub strict_session_check: bool,
}

fn default_header() -> String {
    "x-jwt-token".to_string()
}

fn default_ignores() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/user/login".to_string(),
        "/user/refresh_token".to_string(),
    ]
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
            ignores: default_ignores(),
            strict_session_check: false,
        }
    }
}

/// Cross-origin policy for browser clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origin hostnames allowed to call the API, port and scheme ignored
    #[serde(default = "default_cors_hostnames")]
    pub hostnames: Vec<String>,

    /// How long browsers may cache a preflight response, in seconds
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_hostnames() -> Vec<String> {
    vec!["localhost".to_string()]
}

fn default_cors_max_age() -> u64 {
    12 * 60 * 60
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            hostnames: default_cors_hostnames(),
            max_age: default_cors_max_age(),
        }
    }
}

/// An account in the built-in user directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: u64,

    pub email: String,

    /// bcrypt hash, see `kuryr-admin hash-password`
    pub password_hash: String,

    #[serde(default)]
    pub user_type: UserType,

    #[serde(default)]
    pub biz_id: u64,
}
