//! Authentication models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account roles used for downstream authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Administrator - manages every business
    Administrator,
    /// Operator - scoped to its own business
    #[default]
    Operator,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Administrator => write!(f, "administrator"),
            UserType::Operator => write!(f, "operator"),
        }
    }
}

/// The authenticated identity carried inside a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account id
    pub uid: u64,
    /// Session the tokens were minted against
    pub sid: String,
    /// Business the account belongs to
    pub bid: u64,
    pub user_type: UserType,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Administrator
    }
}

/// An account as seen by the identity strategies
#[derive(Debug, Clone)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub biz_id: u64,
}

/// Login credentials
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub account: String,
    pub credential: String,
    #[serde(default = "default_account_type", alias = "account-type")]
    pub account_type: String,
    #[serde(default = "default_verify_type", alias = "verify-type")]
    pub verify_type: String,
}

fn default_account_type() -> String {
    "email".to_string()
}

fn default_verify_type() -> String {
    "passwd".to_string()
}

impl LoginRequest {
    /// Email and password login, the only combination registered by default
    pub fn password(account: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            credential: credential.into(),
            account_type: default_account_type(),
            verify_type: default_verify_type(),
        }
    }
}

/// Refresh request body
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Access and refresh token minted together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}
