//! Bearer tokens: HS256 JWTs carrying the account id.
//!
//! Expiry is validated on every decode (jsonwebtoken's default 60 s leeway
//! absorbs clock skew between issuing and verifying hosts). The expired case
//! is split out of the generic failure so the HTTP layer can give it its own
//! message.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How long an issued token stays valid, in days.
pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id of the bearer.
    pub sub: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token verification failed")]
    Invalid,
    #[error("token encoding failed")]
    Encode,
}

/// Paired encode/decode keys derived from one shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for `user_id` with the standard TTL.
    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_with_ttl(user_id, Duration::days(TOKEN_TTL_DAYS))
    }

    /// Issue with an explicit TTL. The server always uses the standard
    /// [`TOKEN_TTL_DAYS`]; shorter or negative TTLs exist so expiry handling
    /// can be exercised without waiting a week.
    pub fn issue_with_ttl(&self, user_id: i64, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Encode)
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
