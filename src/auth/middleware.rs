//! Authentication middleware and extractors

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::auth::jwt::TokenCodec;
use crate::auth::models::Principal;
use crate::auth::session::SessionStore;
use crate::config::MiddlewareConfig;
use crate::error::{Error, Result};

/// Request gate verifying access tokens
#[derive(Clone)]
pub struct AuthLayer {
    codec: TokenCodec,
    header: HeaderName,
    ignores: Arc<BTreeSet<String>>,
    /// Set in strict mode: every request must also have a live session
    store: Option<Arc<dyn SessionStore>>,
}

impl AuthLayer {
    pub fn new(
        codec: TokenCodec,
        header: HeaderName,
        ignores: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            codec,
            header,
            ignores: Arc::new(ignores.into_iter().collect()),
            store: None,
        }
    }

    pub fn from_config(
        config: &MiddlewareConfig,
        codec: TokenCodec,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let header = HeaderName::try_from(config.header.as_str())
            .map_err(|e| Error::Config(format!("invalid middleware.header: {}", e)))?;
        let layer = Self::new(codec, header, config.ignores.iter().cloned());
        Ok(if config.strict_session_check {
            layer.with_session_check(store)
        } else {
            layer
        })
    }

    /// Also consult the session store on every request.
    ///
    /// Revocation becomes visible immediately instead of when the access
    /// token expires, at the cost of one store round trip per request.
    pub fn with_session_check(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignores.contains(path)
    }

    /// Verify the request's access token, consulting the store in strict mode
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal> {
        let token = extract_token(headers, &self.header)
            .ok_or_else(|| Error::InvalidToken("missing access token".to_string()))?;
        let principal = self.codec.verify(token)?;

        if let Some(store) = &self.store {
            match store.exists(&principal.sid).await {
                Ok(true) => {}
                Ok(false) => return Err(Error::SessionNotFound),
                Err(e) => {
                    tracing::error!(sid = %principal.sid, error = %e, "session check failed");
                    return Err(Error::SessionNotFound);
                }
            }
        }

        Ok(principal)
    }
}

/// Read the token from the designated header, without any `Bearer ` prefix
pub fn extract_token<'a>(headers: &'a HeaderMap, header: &HeaderName) -> Option<&'a str> {
    let value = headers.get(header)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Middleware for requiring authentication
pub async fn require_auth(
    State(layer): State<AuthLayer>,
    mut req: Request,
    next: Next,
) -> Response {
    if layer.is_ignored(req.uri().path()) {
        return next.run(req).await;
    }

    match layer.authenticate(req.headers()).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            // Every failure collapses to the same 401.
            tracing::debug!(path = %req.uri().path(), error = %e, "rejected request");
            Error::InvalidToken(e.to_string()).into_response()
        }
    }
}

/// Principal injected by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| Error::InvalidToken("no authenticated principal".to_string()))
    }
}
