//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Config, JwtConfig};

pub const CONFIG_FILENAME: &str = "kuryr-admin.toml";

/// Longest accepted token or session lifetime, ten years
pub const MAX_EXPIRATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Load configuration from kuryr-admin.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<Config> {
    let content = interpolate_env_vars(content);
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Check the invariants the auth subsystem relies on
pub fn validate(config: &Config) -> Result<()> {
    let jwt = &config.jwt;

    if jwt.access.expiration == 0 {
        return Err(Error::Config(
            "jwt.access.expiration must be greater than zero".to_string(),
        ));
    }
    for (name, secs) in [
        ("jwt.access.expiration", jwt.access.expiration),
        ("jwt.refresh.expiration", jwt.refresh.expiration),
        ("session.expiration", config.session.expiration),
    ] {
        if secs > MAX_EXPIRATION_SECS {
            return Err(Error::Config(format!(
                "{} ({}s) must not exceed {}s",
                name, secs, MAX_EXPIRATION_SECS
            )));
        }
    }
    if jwt.access.expiration >= jwt.refresh.expiration {
        return Err(Error::Config(format!(
            "jwt.access.expiration ({}s) must be less than jwt.refresh.expiration ({}s)",
            jwt.access.expiration, jwt.refresh.expiration
        )));
    }
    if jwt.access.issuer == jwt.refresh.issuer {
        return Err(Error::Config(
            "jwt.access.issuer and jwt.refresh.issuer must differ".to_string(),
        ));
    }
    if config.session.expiration == 0 {
        return Err(Error::Config(
            "session.expiration must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

impl JwtConfig {
    /// PEM text of the signing key, inline or from a file
    pub fn private_key_pem(&self) -> Result<String> {
        read_key("private", self.private_key.as_deref(), self.private_key_path.as_deref())
    }

    /// PEM text of the verifying key, inline or from a file
    pub fn public_key_pem(&self) -> Result<String> {
        read_key("public", self.public_key.as_deref(), self.public_key_path.as_deref())
    }
}

fn read_key(kind: &str, inline: Option<&str>, path: Option<&Path>) -> Result<String> {
    match (inline, path) {
        (Some(pem), _) if !pem.trim().is_empty() => Ok(pem.to_string()),
        (_, Some(path)) => fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read jwt {} key from {}: {}",
                kind,
                path.display(),
                e
            ))
        }),
        _ => Err(Error::Config(format!(
            "jwt.{kind}_key or jwt.{kind}_key_path must be set"
        ))),
    }
}

/// Find the configuration file, searching upward from current directory
pub fn find_config_file() -> Result<PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // This regex is a compile-time constant, panicking is acceptable here
    // as it indicates a programming error in the codebase, not a runtime issue
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# kuryr-admin configuration

[server]
host = "0.0.0.0"
port = 8080

[jwt]
# Ed25519 key pair in PEM form. Generate with:
#   openssl genpkey -algorithm ed25519 -out jwt_private.pem
#   openssl pkey -in jwt_private.pem -pubout -out jwt_public.pem
private_key_path = "./jwt_private.pem"
public_key_path = "./jwt_public.pem"
# Or inline: private_key = "${JWT_PRIVATE_KEY}"

[jwt.access]
issuer = "kuryr-admin"
expiration = 900        # seconds, must be less than the refresh expiration

[jwt.refresh]
issuer = "kuryr-admin-refresh"
expiration = 604800

[session]
expiration = 604800
backend = "memory"      # or "redis" (requires the `redis` feature)
redis_url = "${REDIS_URL:-redis://127.0.0.1:6379}"
op_timeout_ms = 500

[middleware]
header = "x-jwt-token"
ignores = ["/health", "/user/login", "/user/refresh_token"]
# Check the session store on every request as well as the token signature.
# Logout then takes effect immediately instead of when the access token
# expires, at the cost of one store round trip per request. Not required
# for correctness.
strict_session_check = false

[cors]
# Browser origins allowed to call the API, matched on hostname only
hostnames = ["localhost"]
max_age = 43200

# Accounts. Hash passwords with `kuryr-admin hash-password <password>`.
# [[users]]
# id = 1
# email = "admin@example.com"
# password_hash = "$2b$12$..."
# user_type = "administrator"   # or "operator"
# biz_id = 1
"#
}
