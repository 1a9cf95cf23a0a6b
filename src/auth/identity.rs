//! Account lookup and credential verification strategies
//!
//! Login requests name an account type (how to find the account) and a
//! verify type (how to check the credential). Each kind maps to a strategy
//! registered on [`IdentityRegistry`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::models::{Account, LoginRequest};
use crate::config::UserEntry;
use crate::error::{Error, Result};

pub const ACCOUNT_TYPE_EMAIL: &str = "email";
pub const VERIFY_TYPE_PASSWD: &str = "passwd";

/// Finds an account by the identifier supplied at login
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn find(&self, account: &str) -> Result<Option<Account>>;
}

/// Checks a credential against an account
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, account: &Account, credential: &str) -> Result<bool>;
}

/// Accounts loaded from configuration, keyed by email
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    by_email: HashMap<String, Account>,
}

impl MemoryUserDirectory {
    pub fn new(users: &[UserEntry]) -> Self {
        let by_email = users
            .iter()
            .map(|user| {
                (
                    user.email.to_lowercase(),
                    Account {
                        id: user.id,
                        email: user.email.clone(),
                        password_hash: user.password_hash.clone(),
                        user_type: user.user_type,
                        biz_id: user.biz_id,
                    },
                )
            })
            .collect();
        Self { by_email }
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[async_trait]
impl AccountLookup for MemoryUserDirectory {
    async fn find(&self, account: &str) -> Result<Option<Account>> {
        Ok(self.by_email.get(&account.trim().to_lowercase()).cloned())
    }
}

/// bcrypt password verification
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordVerifier;

#[async_trait]
impl CredentialVerifier for PasswordVerifier {
    async fn verify(&self, account: &Account, credential: &str) -> Result<bool> {
        let hash = account.password_hash.clone();
        let credential = credential.to_string();

        // bcrypt is deliberately slow; keep it off the async workers
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(credential, &hash))
            .await
            .map_err(|e| Error::Other(format!("password verification task failed: {}", e)))?;

        match verified {
            Ok(ok) => Ok(ok),
            Err(e) => {
                tracing::warn!(account_id = account.id, error = %e, "unusable password hash");
                Ok(false)
            }
        }
    }
}

/// Hash a password for the user directory
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost)
        .map_err(|e| Error::Other(format!("failed to hash password: {}", e)))
}

/// Account-type and verify-type strategies by name
#[derive(Clone, Default)]
pub struct IdentityRegistry {
    lookups: HashMap<String, Arc<dyn AccountLookup>>,
    verifiers: HashMap<String, Arc<dyn CredentialVerifier>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Email lookup over the given accounts plus password verification
    pub fn with_users(users: &[UserEntry]) -> Self {
        let mut registry = Self::new();
        registry.register_lookup(ACCOUNT_TYPE_EMAIL, Arc::new(MemoryUserDirectory::new(users)));
        registry.register_verifier(VERIFY_TYPE_PASSWD, Arc::new(PasswordVerifier));
        registry
    }

    pub fn register_lookup(&mut self, kind: impl Into<String>, lookup: Arc<dyn AccountLookup>) {
        self.lookups.insert(kind.into(), lookup);
    }

    pub fn register_verifier(
        &mut self,
        kind: impl Into<String>,
        verifier: Arc<dyn CredentialVerifier>,
    ) {
        self.verifiers.insert(kind.into(), verifier);
    }

    /// Resolve the account a login request refers to.
    ///
    /// A missing account and a wrong credential both yield
    /// `InvalidCredentials`.
    pub async fn authenticate(&self, req: &LoginRequest) -> Result<Account> {
        let lookup = self
            .lookups
            .get(&req.account_type)
            .ok_or_else(|| Error::UnsupportedAccountType(req.account_type.clone()))?;
        let verifier = self
            .verifiers
            .get(&req.verify_type)
            .ok_or_else(|| Error::UnsupportedVerifyType(req.verify_type.clone()))?;

        let Some(account) = lookup.find(&req.account).await? else {
            tracing::debug!(account_type = %req.account_type, "login for unknown account");
            return Err(Error::InvalidCredentials);
        };

        if !verifier.verify(&account, &req.credential).await? {
            tracing::debug!(account_id = account.id, "login with wrong credential");
            return Err(Error::InvalidCredentials);
        }

        Ok(account)
    }
}
