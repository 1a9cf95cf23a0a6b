//! kuryr-admin - admin gateway authentication
//!
//! Issues paired access/refresh tokens at login, gates requests through an
//! authentication middleware, and tracks sessions in a TTL store so that
//! logout revokes refresh even though tokens themselves stay valid.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;

pub use config::Config;
pub use error::Error;
