//! HS256 bearer tokens carrying the caller's email.
//!
//! A [`TokenIssuer`] closes over one symmetric key. It mints tokens for
//! tests and local tooling and verifies the tokens presented to the web API.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::TokenError;

/// Default token lifetime.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Longest accepted token lifetime (one year).
pub const MAX_TTL_SECS: u64 = 365 * 24 * 3600;

/// Identity to embed in a new token.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    pub email: String,
    pub name: Option<String>,
}

impl IdentityClaims {
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject -- same as `email`.
    pub sub: String,
    /// Caller email, used as the reader user id.
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier.
    pub jti: String,
}

/// Issues and verifies HS256 tokens with a fixed key.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    /// Build an issuer from resolved auth configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let key = config.jwt_key.as_deref().ok_or(TokenError::MissingKey)?;
        Ok(Self::new(key.as_bytes(), config.token_ttl_secs))
    }

    /// Sign a token for `identity` that expires after the configured lifetime.
    pub fn issue(&self, identity: &IdentityClaims) -> Result<String, TokenError> {
        let now = Utc::now();
        let exp = i64::try_from(self.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(TokenError::InvalidLifetime(self.ttl_secs))?;
        let claims = Claims {
            sub: identity.email.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}
