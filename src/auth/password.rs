//! Argon2 password hashing
//!
//! Hashes are stored as PHC strings, so the algorithm, parameters and salt
//! travel with the digest.

use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hash failure: {0}")]
    Hash(#[from] password_hash::Error),
}

pub struct PasswordService;

impl PasswordService {
    /// Hash with a fresh random salt
    pub fn hash(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` for a wrong password; an unreadable stored hash is an error.
    /// The digest comparison is constant-time.
    pub fn verify(password: &str, stored: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(stored)?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
