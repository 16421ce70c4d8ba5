//! JWT Token Issuer
//! Mission: Sign and verify `{username, id}` access tokens

use crate::auth::models::{Claims, UserPublicView};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// Tokens are valid for one week.
pub const TOKEN_TTL_DAYS: i64 = 7;

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(TOKEN_TTL_DAYS),
        }
    }

    /// Sign a token for a user, expiring one week from now.
    pub fn issue(&self, user: &UserPublicView) -> Result<String> {
        self.issue_at(user, Utc::now())
    }

    pub(crate) fn issue_at(&self, user: &UserPublicView, now: DateTime<Utc>) -> Result<String> {
        let expiration = now
            .checked_add_signed(self.ttl)
            .context("Invalid timestamp")?;

        let claims = Claims {
            username: user.username.clone(),
            id: user.id,
            iat: now.timestamp().max(0) as usize,
            exp: expiration.timestamp().max(0) as usize,
        };

        debug!(
            "Issuing JWT for user {} ({}), expires {}",
            user.username,
            user.id,
            expiration.to_rfc3339()
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to generate JWT")
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}
