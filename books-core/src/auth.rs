//! Credential verification
//!
//! The posting and reporting code never looks at credentials; only the login
//! path and user management go through a [`CredentialVerifier`].

use crate::{types::User, Error, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hashes and checks passwords
pub trait CredentialVerifier: Send + Sync {
    /// Produce a storable hash
    fn hash(&self, password: &str) -> Result<String>;

    /// Check a password against a stored hash
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Salted Argon2 with default parameters
#[derive(Debug, Default, Clone)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Find the user matching the credentials
///
/// Users from older snapshots that still carry a plaintext password are
/// accepted on an exact match until their credentials are upgraded.
pub fn authenticate<'a>(
    users: &'a [User],
    username: &str,
    password: &str,
    verifier: &dyn CredentialVerifier,
) -> Result<&'a User> {
    let invalid = || Error::Auth("Invalid username or password".to_string());

    let user = users
        .iter()
        .find(|u| u.username == username)
        .ok_or_else(invalid)?;

    let accepted = match (&user.password_hash, &user.password) {
        (Some(hash), _) => verifier.verify(password, hash),
        (None, Some(plain)) => {
            tracing::warn!(username, "Login against a plaintext password; upgrade credentials");
            plain == password
        }
        (None, None) => false,
    };

    if accepted {
        tracing::info!(username, role = ?user.role, "User logged in");
        Ok(user)
    } else {
        tracing::warn!(username, "Rejected login");
        Err(invalid())
    }
}

/// Replace plaintext passwords with hashes; returns how many were upgraded
pub fn upgrade_legacy_credentials(users: &mut [User], verifier: &dyn CredentialVerifier) -> Result<usize> {
    let mut upgraded = 0;
    for user in users.iter_mut().filter(|u| u.has_legacy_password()) {
        if let Some(plain) = user.password.take() {
            user.password_hash = Some(verifier.hash(&plain)?);
            upgraded += 1;
        }
    }
    Ok(upgraded)
}
