//! Password hashing and verification.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config::AuthConfig;
use crate::error::AppError;

/// One-way, salted password digests.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Every call uses a fresh salt, so equal inputs give different digests.
    fn hash(&self, plaintext: &str) -> Result<String, AppError>;

    /// Malformed digests verify as `false`.
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}

/// Argon2id producing PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`).
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AppError::ConfigError(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AppError> {
        Self::new(config.hash_memory_kib, config.hash_iterations, config.hash_parallelism)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?
            .to_string();
        Ok(digest)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(h) => h,
            Err(_) => return false,
        };
        // Cost parameters and salt come from the digest itself.
        self.argon2().verify_password(plaintext.as_bytes(), &parsed).is_ok()
    }
}
