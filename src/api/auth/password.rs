//! One-way password hashing and verification.
//!
//! Argon2id in PHC string format; the salt and parameters travel inside the
//! stored hash. Verification is the constant-time comparison provided by the
//! `argon2` crate. A wrong password is a `false`, never an error.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Derive a fresh salted hash for storage. The plaintext is neither stored
/// nor logged.
pub(crate) fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Check a candidate password against a stored hash. An unparsable stored
/// hash also yields `false`, callers cannot distinguish it from a mismatch.
pub(crate) fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("Secret123").expect("hashing should succeed");
        assert!(verify_password(&hash, "Secret123"));
        assert!(!verify_password(&hash, "Secret124"));
    }

    #[test]
    fn hash_is_salted() {
        let first = hash_password("Secret123").unwrap();
        let second = hash_password("Secret123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hash = hash_password("Secret123").unwrap();
        assert!(!hash.contains("Secret123"));
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn garbage_stored_hash_is_a_mismatch() {
        assert!(!verify_password("not-a-phc-string", "Secret123"));
        assert!(!verify_password("", "Secret123"));
    }
}
