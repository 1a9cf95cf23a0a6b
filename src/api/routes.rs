//! API route handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::server::SharedState;
use crate::auth::{AuthUser, LoginRequest, TokenPair};
use crate::auth::models::RefreshRequest;
use crate::error::Result;

/// Response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn err(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            msg: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            msg: message.into(),
            data: None,
        }
    }
}

// Health check

pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("healthy"))
}

// User routes

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenPair>>> {
    let principal = state.auth.login(&req).await?;
    let pair = state.auth.issue_token_pair(&principal)?;
    Ok(Json(ApiResponse::ok(pair)))
}

pub async fn refresh_token(
    State(state): State<SharedState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>> {
    let pair = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::ok(pair)))
}

pub async fn logout(
    State(state): State<SharedState>,
    AuthUser(principal): AuthUser,
) -> Json<ApiResponse<()>> {
    // The client does not wait for the store; the task logs its own failure.
    let _ = state.auth.logout(&principal.sid);
    Json(ApiResponse::msg("logged out"))
}
