//! Argon2 password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AppError, AppResult};

/// Minimum length accepted by the change-password and user forms.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A stored password hash in PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hashes `plain_text` with a fresh salt.
    pub fn hash(plain_text: &str) -> AppResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hash failed: {}", e)))?;
        Ok(Self {
            hash: hash.to_string(),
        })
    }

    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// An unparsable stored hash never verifies.
    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = Password::hash("secret1").unwrap();
        assert!(password.verify("secret1"));
        assert!(!password.verify("secret2"));
    }

    #[test]
    fn test_password_from_hash() {
        let stored = Password::hash("пароль123").unwrap().into_string();
        assert!(stored.starts_with("$argon2"));
        assert!(Password::from_hash(stored).verify("пароль123"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let first = Password::hash("same-password").unwrap();
        let second = Password::hash("same-password").unwrap();
        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_invalid_hash_never_verifies() {
        assert!(!Password::from_hash("pbkdf2:sha256:garbage").verify("anything"));
    }

    #[test]
    fn test_debug_hides_hash() {
        let password = Password::hash("secret1").unwrap();
        assert!(!format!("{:?}", password).contains("argon2"));
    }
}
