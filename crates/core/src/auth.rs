//! Admin gate - shared-secret check guarding the override controls

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{Error, Result};

/// Grants access to the admin controls
pub trait AdminGate: Send + Sync {
    fn verify(&self, attempt: &str) -> bool;
}

/// Gate holding an argon2 hash of the configured shared secret
#[derive(Debug, Clone)]
pub struct PasswordGate {
    hash: String,
}

impl PasswordGate {
    /// Hash the shared secret
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config("Admin password must not be empty".into()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| Error::Authentication(format!("Failed to hash password: {}", e)))?
            .to_string();

        Ok(Self { hash })
    }

    /// Gate from an existing PHC-format hash
    pub fn from_hash(hash: impl Into<String>) -> Result<Self> {
        let hash = hash.into();
        PasswordHash::new(&hash)
            .map_err(|e| Error::Authentication(format!("Invalid stored password: {}", e)))?;
        Ok(Self { hash })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl AdminGate for PasswordGate {
    fn verify(&self, attempt: &str) -> bool {
        let parsed = match PasswordHash::new(&self.hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        let ok = Argon2::default()
            .verify_password(attempt.as_bytes(), &parsed)
            .is_ok();
        if !ok {
            tracing::warn!("Admin gate rejected password");
        }
        ok
    }
}
