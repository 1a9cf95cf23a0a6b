//! Session storage
//!
//! A session maps a session id to the account that owns it. Tokens are only
//! honoured for refresh while their session exists, so deleting the entry is
//! what revokes a login.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Key-value store of live sessions with per-entry TTL
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite a session
    async fn create(&self, sid: &str, uid: u64, ttl: Duration) -> Result<()>;

    /// Whether the session is live. Does not extend its TTL.
    async fn exists(&self, sid: &str) -> Result<bool>;

    /// Owner of a live session
    async fn subject(&self, sid: &str) -> Result<Option<u64>>;

    /// Extend the TTL of a live session; `SessionNotFound` if there is none
    async fn refresh(&self, sid: &str, ttl: Duration) -> Result<()>;

    /// Remove a session. Removing a missing session is not an error.
    async fn delete(&self, sid: &str) -> Result<()>;
}

/// Session entry
#[derive(Debug, Clone)]
pub struct Session {
    /// Account that owns the session
    pub uid: u64,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session stops being live
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn new(uid: u64, ttl: Duration) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            uid,
            created_at: now,
            expires_at: expiry_after(now, ttl)?,
        })
    }

    /// How long the session has been alive
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| Error::Config(format!("session ttl of {}s is out of range", ttl.as_secs())))
}

/// In-process session store
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired sessions, returning how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|sid, session| {
            let expired = session.is_expired();
            if expired {
                tracing::debug!(
                    sid = %sid,
                    uid = session.uid,
                    age_secs = session.age().num_seconds(),
                    "dropping expired session"
                );
            }
            !expired
        });
        before - sessions.len()
    }

    /// Get session count, expired entries included until swept
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Periodically sweep expired sessions until the store is dropped
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let sessions = Arc::downgrade(&self.sessions);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(sessions) = sessions.upgrade() else {
                    break;
                };
                let store = MemorySessionStore { sessions };
                let removed = store.cleanup_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "swept expired sessions");
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, sid: &str, uid: u64, ttl: Duration) -> Result<()> {
        let session = Session::new(uid, ttl)?;
        self.sessions.write().await.insert(sid.to_string(), session);
        Ok(())
    }

    async fn exists(&self, sid: &str) -> Result<bool> {
        Ok(self
            .sessions
            .read()
            .await
            .get(sid)
            .is_some_and(|session| !session.is_expired()))
    }

    async fn subject(&self, sid: &str) -> Result<Option<u64>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(sid)
            .filter(|session| !session.is_expired())
            .map(|session| session.uid))
    }

    async fn refresh(&self, sid: &str, ttl: Duration) -> Result<()> {
        let expires_at = expiry_after(Utc::now(), ttl)?;
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(sid) {
            Some(session) if !session.is_expired() => {
                session.expires_at = expires_at;
                Ok(())
            }
            Some(_) => {
                sessions.remove(sid);
                Err(Error::SessionNotFound)
            }
            None => Err(Error::SessionNotFound),
        }
    }

    async fn delete(&self, sid: &str) -> Result<()> {
        self.sessions.write().await.remove(sid);
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub use self::redis_store::RedisSessionStore;

#[cfg(feature = "redis")]
mod redis_store {
    use super::*;
    use redis::aio::ConnectionManager;
    use redis::AsyncCommands;
    use std::future::Future;

    /// Redis-backed session store, one key per session
    #[derive(Clone)]
    pub struct RedisSessionStore {
        conn: ConnectionManager,
        op_timeout: Duration,
    }

    impl RedisSessionStore {
        pub async fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self> {
            let client = redis::Client::open(redis_url)?;
            let conn = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| {
                    Error::StoreUnavailable("timed out connecting to redis".to_string())
                })??;
            tracing::info!(url = %redis_url, "connected to redis session store");
            Ok(Self { conn, op_timeout })
        }

        fn key(sid: &str) -> String {
            format!("user:sid:{}", sid)
        }

        /// Whole seconds for EX/EXPIRE, at least one
        fn ttl_secs(ttl: Duration) -> Result<i64> {
            i64::try_from(ttl.as_secs().max(1)).map_err(|_| {
                Error::Config(format!("session ttl of {}s is out of range", ttl.as_secs()))
            })
        }

        async fn bounded<T, F>(&self, op: F) -> Result<T>
        where
            F: Future<Output = redis::RedisResult<T>>,
        {
            tokio::time::timeout(self.op_timeout, op)
                .await
                .map_err(|_| Error::StoreUnavailable("redis operation timed out".to_string()))?
                .map_err(Error::from)
        }
    }

    #[async_trait]
    impl SessionStore for RedisSessionStore {
        async fn create(&self, sid: &str, uid: u64, ttl: Duration) -> Result<()> {
            let mut conn = self.conn.clone();
            let secs = Self::ttl_secs(ttl)? as u64;
            self.bounded(conn.set_ex::<_, _, ()>(Self::key(sid), uid, secs))
                .await
        }

        async fn exists(&self, sid: &str) -> Result<bool> {
            let mut conn = self.conn.clone();
            self.bounded(conn.exists::<_, bool>(Self::key(sid))).await
        }

        async fn subject(&self, sid: &str) -> Result<Option<u64>> {
            let mut conn = self.conn.clone();
            self.bounded(conn.get::<_, Option<u64>>(Self::key(sid))).await
        }

        async fn refresh(&self, sid: &str, ttl: Duration) -> Result<()> {
            let mut conn = self.conn.clone();
            let secs = Self::ttl_secs(ttl)?;
            let updated: bool = self.bounded(conn.expire(Self::key(sid), secs)).await?;
            if updated {
                Ok(())
            } else {
                Err(Error::SessionNotFound)
            }
        }

        async fn delete(&self, sid: &str) -> Result<()> {
            let mut conn = self.conn.clone();
            self.bounded(conn.del::<_, ()>(Self::key(sid))).await
        }
    }
}
