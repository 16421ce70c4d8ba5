//! Auth Orchestrator
//! Mission: Coordinate store, hasher and token issuer for register/login

use crate::auth::{
    hasher::CredentialHasher,
    jwt::TokenIssuer,
    models::{AuthResponse, Credentials, User, UserPublicView},
    user_store::UserStore,
};
use crate::error::ApiError;
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: Arc<CredentialHasher>,
    issuer: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<CredentialHasher>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            issuer,
        }
    }

    pub fn issuer(&self) -> Arc<TokenIssuer> {
        self.issuer.clone()
    }

    pub fn store(&self) -> Arc<dyn UserStore> {
        self.store.clone()
    }

    /// Create an account and sign a token for it.
    pub async fn register(&self, credentials: Credentials) -> Result<AuthResponse, ApiError> {
        let user = self.insert_user(credentials).await?;
        info!("📝 Registered user: {} ({})", user.username, user.id);
        self.respond_with_token(&user)
    }

    /// Check credentials and sign a fresh token.
    ///
    /// Unknown user, missing hash and wrong password all fail with the same
    /// `Invalid credentials` error.
    pub async fn login(&self, credentials: Credentials) -> Result<AuthResponse, ApiError> {
        credentials.validate()?;

        let user = self.store.find_by_username(&credentials.username)?;

        let Some(user) = user.filter(|u| !u.password_hash.is_empty()) else {
            self.burn_verification(credentials.password).await?;
            warn!("❌ Failed login attempt: {}", credentials.username);
            return Err(ApiError::invalid_credentials());
        };

        let matches = self
            .verify_password(credentials.password, user.password_hash.clone())
            .await?;
        if !matches {
            warn!("❌ Failed login attempt: {}", credentials.username);
            return Err(ApiError::invalid_credentials());
        }

        info!("✅ Login successful: {} ({})", user.username, user.id);
        self.respond_with_token(&user)
    }

    /// Create an account without issuing a token (protected admin path).
    pub async fn create_user(&self, credentials: Credentials) -> Result<UserPublicView, ApiError> {
        let user = self.insert_user(credentials).await?;
        info!("✅ User created: {} ({})", user.username, user.id);
        Ok(user.public_view())
    }

    async fn insert_user(&self, credentials: Credentials) -> Result<User, ApiError> {
        credentials.validate()?;

        // The store's unique index still guards the race between this check and the insert.
        if self.store.find_by_username(&credentials.username)?.is_some() {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }

        let password_hash = self.hash_password(credentials.password).await?;
        let user = self.store.create(&credentials.username, &password_hash)?;
        Ok(user)
    }

    fn respond_with_token(&self, user: &User) -> Result<AuthResponse, ApiError> {
        let view = user.public_view();
        let access_token = self.issuer.issue(&view)?;
        Ok(AuthResponse {
            user: view,
            access_token,
        })
    }

    async fn hash_password(&self, password: String) -> Result<String, ApiError> {
        let hasher = self.hasher.clone();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task failed")??;
        Ok(digest)
    }

    async fn verify_password(&self, password: String, digest: String) -> Result<bool, ApiError> {
        let hasher = self.hasher.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .context("password verification task failed")?;
        Ok(matches)
    }

    async fn burn_verification(&self, password: String) -> Result<(), ApiError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
            .await
            .context("password verification task failed")?;
        Ok(())
    }
}
