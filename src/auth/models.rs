//! Authentication Models
//! Mission: Define user, credential and token data structures

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String, // bcrypt hash - never serialized
    pub created_at: String,
}

impl User {
    pub fn public_view(&self) -> UserPublicView {
        UserPublicView {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// User as returned to clients (no hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPublicView {
    pub id: i64,
    pub username: String,
}

/// Case-insensitive lookup key for a username.
pub fn username_key(username: &str) -> String {
    username.to_lowercase()
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub username: String,
    pub id: i64,
    pub iat: usize, // issued-at timestamp
    pub exp: usize, // expiration timestamp
}

/// Register / login request body
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Boundary validation shared by every endpoint taking credentials.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() {
            return Err(ApiError::validation("Username is required"));
        }
        if self.password.is_empty() {
            return Err(ApiError::validation("Password is required"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Register / login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserPublicView,
    pub access_token: String,
}

/// Admin create response
#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub message: &'static str,
    pub user: UserPublicView,
}
