//! Argon2id password hashing.

use super::AuthError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a password with a fresh salt.
pub fn hash(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored hash.
///
/// Returns `Ok(false)` for a mismatch; errors only on malformed hashes.
pub fn verify(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_round_trip() {
        let hashed = hash("hunter2secret").unwrap();
        assert!(verify("hunter2secret", &hashed).unwrap());
        assert!(!verify("wrong-password", &hashed).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash("same-password").unwrap(), hash("same-password").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify("anything", "not-a-phc-string").is_err());
    }
}
