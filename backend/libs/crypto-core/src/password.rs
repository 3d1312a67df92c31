//! Argon2id password storage

use argon2::password_hash::{
    self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hash `password` with a fresh salt and default Argon2id parameters.
/// The result is a PHC string (`$argon2id$...`) ready to store as-is.
/// Length rules belong to the caller.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hasher = Argon2::default();

    hasher
        .hash_password(password.as_bytes(), salt.as_salt())
        .map(|phc| phc.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against its PHC hash
///
/// Uses constant-time comparison. Returns `Ok(false)` on mismatch and an
/// error only when the stored hash itself is unusable.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PasswordError> {
    let stored =
        PasswordHash::new(password_hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &stored) {
        Ok(_) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hash(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_accepts_same_password() {
        let hash = hash_password("secret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret", &hash).unwrap());
    }

    #[test]
    fn test_rejects_case_changed_password() {
        let hash = hash_password("secret").unwrap();
        assert!(!verify_password("Secret", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ_per_hash() {
        assert_ne!(hash_password("secret").unwrap(), hash_password("secret").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let result = verify_password("secret", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHash(_))));
    }
}
