//! Password hashing (argon2id, PHC string format).
//!
//! Both operations are CPU-bound by design; async callers should run them on a
//! blocking thread.

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("hashing failed: {0}")]
    Hashing(String),
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    if plain.is_empty() {
        return Err(PasswordError::Empty);
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check a plaintext password against a stored PHC hash.
///
/// An unparseable stored hash is treated as a mismatch.
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Burn the same CPU as a real verification, then fail.
///
/// Used when the username does not resolve so that response timing does not
/// reveal which half of the credentials was wrong.
pub fn verify_against_dummy(plain: &str) -> bool {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    if let Some(hash) = DUMMY.get_or_init(|| hash_password("registrar-dummy-password").ok()) {
        let _ = verify_password(plain, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("password123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("password123", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("password123").unwrap();
        let b = hash_password("password123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_password_is_refused() {
        assert_eq!(hash_password(""), Err(PasswordError::Empty));
    }

    #[test]
    fn malformed_stored_hash_never_matches() {
        assert!(!verify_password("password123", "plaintext-password123"));
    }

    #[test]
    fn dummy_verification_always_fails() {
        assert!(!verify_against_dummy("registrar-dummy-password"));
    }
}
