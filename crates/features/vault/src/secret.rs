//! The password hash of record.
//!
//! Argon2id PHC strings with configurable cost. Verification goes through
//! the hash library's constant-time comparison; a stored hash that does
//! not parse is a corrupt record, not a bad credential.

use crate::error::VaultError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use lockbox_domain::config::HashConfig;

/// Hashes and verifies identity passwords.
#[derive(Clone)]
pub struct SecretHasher {
    argon: Argon2<'static>,
}

impl std::fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretHasher").finish_non_exhaustive()
    }
}

impl SecretHasher {
    /// Builds a hasher from the configured cost; a zero keeps the crate
    /// default for that parameter.
    ///
    /// # Errors
    /// Returns [`VaultError::Internal`] if the parameter combination is
    /// rejected by the hash library.
    pub fn new(config: &HashConfig) -> Result<Self, VaultError> {
        let params = Params::new(
            if config.m_cost == 0 { Params::DEFAULT_M_COST } else { config.m_cost },
            if config.t_cost == 0 { Params::DEFAULT_T_COST } else { config.t_cost },
            if config.p_cost == 0 { Params::DEFAULT_P_COST } else { config.p_cost },
            None,
        )
        .map_err(|e| -> VaultError { format!("invalid argon2 parameters: {e}").into() })?;

        Ok(Self { argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params) })
    }

    /// Hashes a password into its stored PHC string form.
    ///
    /// # Errors
    /// Returns [`VaultError::Internal`] if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, VaultError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| -> VaultError { format!("failed to hash password: {e}").into() })?;
        Ok(hash.to_string())
    }

    /// Verifies a password against the stored PHC string, constant-time.
    ///
    /// # Errors
    /// * [`VaultError::Corrupt`] if the stored hash does not parse.
    /// * [`VaultError::BadCredential`] on mismatch.
    pub fn verify(&self, stored: &str, password: &str) -> Result<(), VaultError> {
        let parsed = PasswordHash::new(stored)
            .map_err(|_| VaultError::corrupt("stored password hash does not parse"))?;
        self.argon
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| VaultError::bad_credential())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> SecretHasher {
        // Cheap parameters; this is about correctness, not cost.
        SecretHasher::new(&HashConfig { m_cost: 8, t_cost: 1, p_cost: 1 }).unwrap()
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = hasher();
        let stored = hasher.hash("qwerty").unwrap();

        assert!(stored.starts_with("$argon2id$"));
        hasher.verify(&stored, "qwerty").unwrap();
    }

    #[test]
    fn wrong_password_is_bad_credential() {
        let hasher = hasher();
        let stored = hasher.hash("qwerty").unwrap();

        let err = hasher.verify(&stored, "ytrewq").unwrap_err();
        assert!(matches!(err, VaultError::BadCredential { .. }));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hasher = hasher();
        assert_ne!(hasher.hash("qwerty").unwrap(), hasher.hash("qwerty").unwrap());
    }

    #[test]
    fn undecodable_stored_hash_is_corrupt() {
        let err = hasher().verify("definitely-not-a-phc-string", "qwerty").unwrap_err();
        assert!(matches!(err, VaultError::Corrupt { .. }));
    }
}
