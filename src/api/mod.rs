//! HTTP API server

pub mod routes;
pub mod server;

pub use routes::ApiResponse;
pub use server::*;
