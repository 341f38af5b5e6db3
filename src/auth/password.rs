//! Password Hashing
//! Mission: Slow, salted, one-way storage of user secrets

use anyhow::{anyhow, Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};

/// bcrypt only reads the first 72 bytes of a secret.
pub const MAX_SECRET_BYTES: usize = 72;

/// bcrypt hasher with a fixed work factor.
///
/// Hashing and verification are CPU-bound by design, so the async entry points
/// run them on tokio's blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a non-empty secret with a fresh random salt.
    pub fn hash_secret(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Err(anyhow!("refusing to hash an empty secret"));
        }
        hash(plaintext, self.cost).context("Failed to hash password")
    }

    /// Check a secret against a stored hash.
    ///
    /// A wrong secret is `Ok(false)`; only a malformed stored hash is an error.
    pub fn verify_secret(&self, plaintext: &str, secret_hash: &str) -> Result<bool> {
        verify(plaintext, secret_hash).context("Stored password hash is malformed")
    }

    pub async fn hash_secret_blocking(&self, plaintext: String) -> Result<String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash_secret(&plaintext))
            .await
            .context("Password hashing task failed")?
    }

    pub async fn verify_secret_blocking(
        &self,
        plaintext: String,
        secret_hash: String,
    ) -> Result<bool> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify_secret(&plaintext, &secret_hash))
            .await
            .context("Password verification task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps the suite fast.
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        let hashed = hasher.hash_secret("pw1").unwrap();

        assert_ne!(hashed, "pw1");
        assert!(hasher.verify_secret("pw1", &hashed).unwrap());
        assert!(!hasher.verify_secret("pw2", &hashed).unwrap());
        assert!(!hasher.verify_secret("", &hashed).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        let first = hasher.hash_secret("same secret").unwrap();
        let second = hasher.hash_secret("same secret").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify_secret("same secret", &first).unwrap());
        assert!(hasher.verify_secret("same secret", &second).unwrap());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(hasher().hash_secret("").is_err());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(hasher().verify_secret("pw1", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_cost_is_embedded() {
        let hashed = PasswordHasher::new(5).hash_secret("pw1").unwrap();
        assert!(hashed.starts_with("$2b$05$"));
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_COST);
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hasher = hasher();
        let hashed = hasher.hash_secret_blocking("pw1".to_string()).await.unwrap();

        assert!(hasher
            .verify_secret_blocking("pw1".to_string(), hashed.clone())
            .await
            .unwrap());
        assert!(!hasher
            .verify_secret_blocking("nope".to_string(), hashed)
            .await
            .unwrap());
    }
}
