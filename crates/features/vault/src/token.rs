//! Bearer token issuance and validation.
//!
//! HS256-signed claims carrying `sub` (username) and `exp`
//! (unix seconds). Expiration is enforced at validation time; there is no
//! background reaper.

use crate::error::VaultError;
use crate::model::Token;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
}

/// Issues and validates bearer tokens for usernames.
#[derive(Clone)]
pub struct TokenSource {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifespan: Duration,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource").field("lifespan", &self.lifespan).finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Creates a token source over a shared HS256 secret.
    ///
    /// `leeway_seconds` is the accepted clock skew when checking `exp`;
    /// zero means exact expiry.
    #[must_use]
    pub fn new(secret: &[u8], lifespan: Duration, leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifespan,
        }
    }

    /// Issues a token for the username, expiring after the configured
    /// lifespan.
    ///
    /// # Errors
    /// Returns [`VaultError::Internal`] if signing fails.
    pub fn issue(&self, username: &str) -> Result<Token, VaultError> {
        let expires_at = chrono::Utc::now().timestamp().unsigned_abs()
            + self.lifespan.as_secs();
        let claims = Claims { sub: username.to_owned(), exp: expires_at };

        let raw = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| -> VaultError { format!("failed to sign token: {e}").into() })?;
        Ok(Token::new(raw))
    }

    /// Validates the token and returns the username it was issued for.
    ///
    /// # Errors
    /// Returns [`VaultError::BadCredential`] for any forged, malformed, or
    /// expired token; the cases are not distinguished.
    pub fn subject(&self, token: &Token) -> Result<String, VaultError> {
        let data = decode::<Claims>(token.as_str(), &self.decoding, &self.validation)
            .map_err(|_| VaultError::bad_credential())?;
        Ok(data.claims.sub)
    }
}
