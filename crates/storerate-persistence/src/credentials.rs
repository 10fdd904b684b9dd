//! Argon2 password hashing for the `users.password_hash` column.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use storerate_core::error::DomainError;
use storerate_core::identity::CredentialHasher;
use tracing::{error, warn};

/// Hashes passwords into PHC strings with Argon2id and a random salt.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2CredentialHasher;

impl CredentialHasher for Argon2CredentialHasher {
    fn hash_password(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "failed to hash password");
                DomainError::Unavailable("failed to hash password".to_owned())
            })?;
        Ok(hash.to_string())
    }
}

/// Whether `password` matches the stored PHC string. A malformed hash never
/// matches.
pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        warn!("stored password hash is malformed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
