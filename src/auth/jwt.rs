//! JWT token handling

use crate::auth::models::{Principal, UserType};
use crate::config::{JwtConfig, TokenConfig};
use crate::error::{Error, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account id)
    pub sub: String,
    /// Session id
    pub sid: String,
    /// Business id
    pub bid: u64,
    pub user_type: UserType,
    /// Issuer, distinguishes access from refresh tokens
    pub iss: String,
    /// Token id
    pub jti: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

impl Claims {
    /// Build claims for a principal issued at `now`
    pub fn new(principal: &Principal, issuer: &str, now: i64, ttl: u64) -> Result<Self> {
        let exp = i64::try_from(ttl)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| Error::Signing(format!("token lifetime of {}s is out of range", ttl)))?;
        Ok(Self {
            sub: principal.uid.to_string(),
            sid: principal.sid.clone(),
            bid: principal.bid,
            user_type: principal.user_type,
            iss: issuer.to_string(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
            iat: now,
            exp,
        })
    }

    /// Expired at `now`; the expiry instant itself counts as expired
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    pub fn into_principal(self) -> Result<Principal> {
        let uid = self
            .sub
            .parse()
            .map_err(|_| Error::InvalidToken(format!("malformed subject '{}'", self.sub)))?;
        Ok(Principal {
            uid,
            sid: self.sid,
            bid: self.bid,
            user_type: self.user_type,
        })
    }
}

/// Ed25519 key pair shared by the codecs
#[derive(Clone)]
pub struct SigningKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl SigningKeys {
    pub fn from_ed_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self> {
        let encoding = EncodingKey::from_ed_pem(private_pem)
            .map_err(|e| Error::Config(format!("invalid jwt private key: {}", e)))?;
        let decoding = DecodingKey::from_ed_pem(public_pem)
            .map_err(|e| Error::Config(format!("invalid jwt public key: {}", e)))?;
        Ok(Self {
            encoding: Arc::new(encoding),
            decoding: Arc::new(decoding),
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self> {
        let private_pem = config.private_key_pem()?;
        let public_pem = config.public_key_pem()?;
        Self::from_ed_pem(private_pem.as_bytes(), public_pem.as_bytes())
    }
}

/// Signs and verifies one kind of token
#[derive(Clone)]
pub struct TokenCodec {
    issuer: String,
    ttl: u64,
    keys: SigningKeys,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(issuer: impl Into<String>, ttl: u64, keys: SigningKeys) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::EdDSA);
        // Expiry is checked in verify_at so the boundary is inclusive and
        // the clock can be supplied by the caller.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            issuer,
            ttl,
            keys,
            validation,
        }
    }

    pub fn from_config(config: &TokenConfig, keys: SigningKeys) -> Self {
        Self::new(config.issuer.clone(), config.expiration, keys)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Token lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.ttl
    }

    pub fn issue(&self, principal: &Principal) -> Result<String> {
        self.issue_at(principal, chrono::Utc::now().timestamp())
    }

    pub fn issue_at(&self, principal: &Principal, now: i64) -> Result<String> {
        let claims = Claims::new(principal, &self.issuer, now, self.ttl)?;
        encode(&Header::new(Algorithm::EdDSA), &claims, &self.keys.encoding)
            .map_err(|e| Error::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Principal> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<Principal> {
        self.decode_at(token, now)?.into_principal()
    }

    /// Verify and return the raw claims
    pub fn decode_at(&self, token: &str, now: i64) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| Error::InvalidToken(e.to_string()))?;

        if claims.is_expired_at(now) {
            return Err(Error::InvalidToken("token has expired".to_string()));
        }
        Ok(claims)
    }
}
