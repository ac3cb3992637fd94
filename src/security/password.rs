use crate::core::error::AppError;
use anyhow::anyhow;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::OnceLock;

fn salt() -> Result<SaltString, argon2::password_hash::Error> {
    use rand::Rng;
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    SaltString::encode_b64(&bytes)
}

pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    Argon2::default()
        .hash_password(password.as_bytes(), &salt()?)
        .map(|h| h.to_string())
}

pub fn verify(password: &str, hashword: &str) -> bool {
    PasswordHash::new(hashword)
        .ok()
        .as_ref()
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), hash)
                .is_ok()
        })
        .unwrap_or(false)
}

// Verified against when the email is unknown so that both login failures
// cost one full hash.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash("not-a-real-password").unwrap_or_default())
}

/// Hash on the blocking pool; argon2 is deliberately slow
pub async fn hash_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow!("hash task failed: {}", e)))?
        .map_err(|e| AppError::Internal(anyhow!("password hashing failed: {}", e)))
}

pub async fn verify_blocking(password: String, hashword: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify(&password, &hashword))
        .await
        .map_err(|e| AppError::Internal(anyhow!("verify task failed: {}", e)))
}

/// Burn one verification for a login against an unknown email
pub async fn verify_dummy(password: String) -> Result<(), AppError> {
    tokio::task::spawn_blocking(move || {
        verify(&password, dummy_hash());
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("verify task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash("p@ss1234").unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify("p@ss1234", &hashed));
        assert!(!verify("p@ss1235", &hashed));
    }

    #[test]
    fn test_salted() {
        assert_ne!(hash("same").unwrap(), hash("same").unwrap());
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify("anything", "plaintext"));
        assert!(!verify("", ""));
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let hashed = hash_blocking("secret".to_string()).await.unwrap();
        assert!(verify_blocking("secret".to_string(), hashed.clone()).await.unwrap());
        assert!(!verify_blocking("nope".to_string(), hashed).await.unwrap());
        assert!(verify_dummy("whatever".to_string()).await.is_ok());
    }
}
