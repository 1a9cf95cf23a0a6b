//! Error types for kuryr-admin

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::ApiResponse;

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown account or wrong credential. Both causes share this variant.
    #[error("account or login credential is invalid")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("unsupported account type '{0}'")]
    UnsupportedAccountType(String),

    #[error("unsupported verify type '{0}'")]
    UnsupportedVerifyType(String),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'kuryr-admin init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is an authentication rejection rather than a fault.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials | Error::InvalidToken(_) | Error::SessionNotFound
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_unauthorized() => StatusCode::UNAUTHORIZED,
            Error::UnsupportedAccountType(_) | Error::UnsupportedVerifyType(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Rejections share one body so callers cannot tell the causes apart.
        let message = if self.is_unauthorized() {
            tracing::debug!(error = %self, "request unauthorized");
            "unauthorized".to_string()
        } else if status == StatusCode::BAD_REQUEST {
            self.to_string()
        } else {
            tracing::error!(error = %self, "failed to handle request");
            "internal server error".to_string()
        };

        (status, Json(ApiResponse::<()>::err(status, message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
