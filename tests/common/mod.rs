//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kuryr_admin::auth::identity::hash_password;
use kuryr_admin::auth::{AuthService, MemorySessionStore, SessionStore, SigningKeys, UserType};
use kuryr_admin::config::{Config, UserEntry};
use kuryr_admin::error::{Error, Result};

pub const PRIVATE_PEM: &str = include_str!("../fixtures/ed25519_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../fixtures/ed25519_public.pem");
pub const OTHER_PRIVATE_PEM: &str = include_str!("../fixtures/ed25519_other_private.pem");
pub const OTHER_PUBLIC_PEM: &str = include_str!("../fixtures/ed25519_other_public.pem");

pub const ALICE_EMAIL: &str = "alice@example.com";
pub const ALICE_PASSWORD: &str = "correct-pw";
pub const ALICE_ID: u64 = 1001;

pub fn keys() -> SigningKeys {
    SigningKeys::from_ed_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes())
        .expect("fixture keys should load")
}

/// Config with fixture keys and a single administrator account
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.private_key = Some(PRIVATE_PEM.to_string());
    config.jwt.public_key = Some(PUBLIC_PEM.to_string());
    config.jwt.access.expiration = 60;
    config.jwt.refresh.expiration = 600;
    config.session.expiration = 600;
    config.users = vec![UserEntry {
        id: ALICE_ID,
        email: ALICE_EMAIL.to_string(),
        password_hash: hash_password(ALICE_PASSWORD, 4).expect("hash should succeed"),
        user_type: UserType::Administrator,
        biz_id: 9,
    }];
    config
}

pub fn test_service(store: MemorySessionStore) -> Arc<AuthService> {
    test_service_with(Arc::new(store))
}

pub fn test_service_with(store: Arc<dyn SessionStore>) -> Arc<AuthService> {
    Arc::new(
        AuthService::from_config(&test_config(), store)
            .expect("service should build from test config"),
    )
}

/// Memory store whose operations can be made to fail as if the backend were down
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: MemorySessionStore,
    pub fail_create: Arc<AtomicBool>,
    /// Covers `exists` and `subject`
    pub fail_reads: Arc<AtomicBool>,
    pub fail_refresh: Arc<AtomicBool>,
    pub fail_delete: Arc<AtomicBool>,
}

impl FlakyStore {
    fn check(flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(Error::StoreUnavailable(format!("{} failed: connection refused", op)))
        } else {
            Ok(())
        }
    }
}

pub fn set(flag: &AtomicBool, on: bool) {
    flag.store(on, Ordering::SeqCst);
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create(&self, sid: &str, uid: u64, ttl: Duration) -> Result<()> {
        Self::check(&self.fail_create, "create")?;
        self.inner.create(sid, uid, ttl).await
    }

    async fn exists(&self, sid: &str) -> Result<bool> {
        Self::check(&self.fail_reads, "exists")?;
        self.inner.exists(sid).await
    }

    async fn subject(&self, sid: &str) -> Result<Option<u64>> {
        Self::check(&self.fail_reads, "subject")?;
        self.inner.subject(sid).await
    }

    async fn refresh(&self, sid: &str, ttl: Duration) -> Result<()> {
        Self::check(&self.fail_refresh, "refresh")?;
        self.inner.refresh(sid, ttl).await
    }

    async fn delete(&self, sid: &str) -> Result<()> {
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete(sid).await
    }
}
