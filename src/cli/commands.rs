//! CLI command implementations

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api;
use crate::auth::identity;
use crate::cli::{error, info, print_user_table, success, warn};
use crate::config::{self, loader::CONFIG_FILENAME, Config};

/// Initialize a new kuryr-admin.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    let content = config::loader::default_config_content();
    fs::write(config_path, content)?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Generate an Ed25519 key pair, add [[users]] entries and run 'kuryr-admin serve'");

    Ok(())
}

/// Start the HTTP API server
pub async fn serve(config: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!("Starting API server on {}:{}", host, port));
    if let Err(e) = api::run_server(config, &host, port).await {
        error(&format!("Server stopped: {}", e));
        return Err(e.into());
    }
    Ok(())
}

/// Print a bcrypt hash for the given password
pub async fn hash_password(password: &str, cost: u32) -> Result<()> {
    let hash = identity::hash_password(password, cost)?;
    println!("{}", hash);
    Ok(())
}

/// List configured accounts
pub async fn users(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    print_user_table(&config.users);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => config::load_config_from_path(path)?,
        None => config::load_config()?,
    };
    Ok(config)
}
