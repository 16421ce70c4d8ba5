//! Credential Hasher
//! Mission: One-way, per-call salted password hashing with bcrypt

use anyhow::{Context, Result};
use bcrypt::{hash, verify};
use std::sync::OnceLock;

/// Work factor used in production.
pub const DEFAULT_HASH_COST: u32 = 10;

pub struct CredentialHasher {
    cost: u32,
    // Verified against when the user does not exist, so both branches pay
    // for one bcrypt comparison.
    dummy_digest: OnceLock<String>,
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            dummy_digest: OnceLock::new(),
        }
    }

    /// Hash a plaintext password (random salt per call).
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        hash(plaintext, self.cost).context("Failed to hash password")
    }

    /// Compare a plaintext password against a stored digest.
    ///
    /// A malformed digest is a mismatch, not an error.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        if digest.is_empty() {
            return false;
        }
        verify(plaintext, digest).unwrap_or(false)
    }

    /// Burn one comparison's worth of time without a real digest.
    pub fn verify_dummy(&self, plaintext: &str) {
        let digest = self
            .dummy_digest
            .get_or_init(|| hash("timewarp-dummy-password", self.cost).unwrap_or_default());
        let _ = self.verify(plaintext, digest);
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}
