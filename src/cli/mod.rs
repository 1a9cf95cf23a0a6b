//! CLI interface for kuryr-admin

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kuryr-admin")]
#[command(version)]
#[command(about = "Admin gateway: token authentication and session revocation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default kuryr-admin.toml configuration file
    Init,

    /// Start the HTTP API server
    Serve {
        /// Configuration file (defaults to searching upward for kuryr-admin.toml)
        #[arg(short, long, env = "KURYR_ADMIN_CONFIG")]
        config: Option<PathBuf>,

        /// Host to bind to, overrides server.host
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, overrides server.port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Hash a password for a [[users]] entry
    HashPassword {
        password: String,

        /// bcrypt cost factor
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },

    /// List configured accounts
    Users {
        #[arg(short, long, env = "KURYR_ADMIN_CONFIG")]
        config: Option<PathBuf>,
    },
}
