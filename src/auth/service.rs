//! Login, refresh and logout orchestration

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::auth::identity::IdentityRegistry;
use crate::auth::jwt::{SigningKeys, TokenCodec};
use crate::auth::models::{LoginRequest, Principal, TokenPair};
use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::error::{Error, Result};

pub struct AuthService {
    identity: IdentityRegistry,
    store: Arc<dyn SessionStore>,
    access: TokenCodec,
    refresh: TokenCodec,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        identity: IdentityRegistry,
        store: Arc<dyn SessionStore>,
        access: TokenCodec,
        refresh: TokenCodec,
        session_ttl: Duration,
    ) -> Self {
        Self {
            identity,
            store,
            access,
            refresh,
            session_ttl,
        }
    }

    /// Build the service from configuration around an existing store
    pub fn from_config(config: &Config, store: Arc<dyn SessionStore>) -> Result<Self> {
        crate::config::loader::validate(config)?;
        let keys = SigningKeys::from_config(&config.jwt)?;
        Ok(Self::new(
            IdentityRegistry::with_users(&config.users),
            store,
            TokenCodec::from_config(&config.jwt.access, keys.clone()),
            TokenCodec::from_config(&config.jwt.refresh, keys),
            Duration::from_secs(config.session.expiration),
        ))
    }

    pub fn access_codec(&self) -> &TokenCodec {
        &self.access
    }

    pub fn refresh_codec(&self) -> &TokenCodec {
        &self.refresh
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Authenticate and open a new session
    pub async fn login(&self, req: &LoginRequest) -> Result<Principal> {
        let account = self.identity.authenticate(req).await?;

        let principal = Principal {
            uid: account.id,
            sid: Uuid::new_v4().to_string(),
            bid: account.biz_id,
            user_type: account.user_type,
        };
        self.create_session(&principal).await?;

        tracing::info!(uid = principal.uid, sid = %principal.sid, "user logged in");
        Ok(principal)
    }

    /// Mint an access and refresh token for the principal
    pub fn issue_token_pair(&self, principal: &Principal) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.access.issue(principal)?,
            refresh_token: self.refresh.issue(principal)?,
            expires_in: self.access.expires_in(),
        })
    }

    /// Exchange a refresh token for a new pair while its session is live
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let principal = self.refresh.verify(refresh_token)?;

        self.check_session(&principal).await?;

        if let Err(e) = self.refresh_session(&principal.sid).await {
            tracing::warn!(sid = %principal.sid, error = %e, "failed to refresh session");
        }

        self.issue_token_pair(&principal)
    }

    /// Revoke a session in the background.
    ///
    /// The deletion is attempted once; a failure is logged, never retried.
    pub fn logout(self: &Arc<Self>, sid: &str) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let sid = sid.to_string();
        tokio::spawn(async move {
            match service.clear_session(&sid).await {
                Ok(()) => tracing::info!(sid = %sid, "session cleared"),
                Err(e) => tracing::error!(sid = %sid, error = %e, "failed to clear session"),
            }
        })
    }

    pub async fn create_session(&self, principal: &Principal) -> Result<()> {
        self.store
            .create(&principal.sid, principal.uid, self.session_ttl)
            .await
    }

    /// Require the session to be live and owned by the principal
    pub async fn check_session(&self, principal: &Principal) -> Result<()> {
        match self.store.subject(&principal.sid).await? {
            Some(uid) if uid == principal.uid => Ok(()),
            Some(uid) => {
                tracing::warn!(
                    sid = %principal.sid,
                    token_uid = principal.uid,
                    session_uid = uid,
                    "session user mismatch"
                );
                Err(Error::SessionNotFound)
            }
            None => Err(Error::SessionNotFound),
        }
    }

    pub async fn refresh_session(&self, sid: &str) -> Result<()> {
        self.store.refresh(sid, self.session_ttl).await
    }

    pub async fn clear_session(&self, sid: &str) -> Result<()> {
        self.store.delete(sid).await
    }
}
