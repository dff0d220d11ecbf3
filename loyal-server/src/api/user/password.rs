//! Argon2 password hashing, run off the async executor.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use super::UserApiError;

pub(super) async fn hash(password: String) -> Result<String, UserApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserApiError::PasswordHash(e.to_string()))
    })
    .await?
}

/// `Ok(false)` on a wrong password; `Err` only if the stored hash is unusable.
pub(super) async fn verify(password: String, stored_hash: String) -> Result<bool, UserApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored_hash).map_err(|e| UserApiError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await?
}
