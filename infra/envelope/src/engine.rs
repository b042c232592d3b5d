use crate::error::EnvelopeError;
use crate::types::{Cfb, Envelope, EnvelopeMode, KEY_LEN, Keystream, PBKDF2_ROUNDS, SALT_LEN};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::marker::PhantomData;
use zeroize::Zeroizing;

/// The envelope-encryption engine.
///
/// Stateless apart from its mode parameter: each seal draws fresh salt and
/// IV, each open re-derives the key from the envelope's salt. The mode
/// defaults to [`Cfb`] (AES-256-CFB) and is swapped by naming a different
/// [`EnvelopeMode`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cipher<M: EnvelopeMode = Cfb> {
    _mode: PhantomData<M>,
}

impl<M: EnvelopeMode> Cipher<M> {
    /// Returns a new engine for the chosen mode.
    #[must_use]
    pub const fn new() -> Self {
        Self { _mode: PhantomData }
    }

    /// Derives the record key from the password and salt.
    ///
    /// PBKDF2-HMAC-SHA256, [`PBKDF2_ROUNDS`] iterations, [`KEY_LEN`] bytes,
    /// the same parameters on seal and open. The key material is zeroed on
    /// drop.
    fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, key.as_mut());
        key
    }

    /// Starts sealing one record: draws salt and IV, derives the key and
    /// builds the encrypting keystream.
    ///
    /// # Errors
    /// * [`EnvelopeError::Entropy`] if the system RNG fails.
    /// * [`EnvelopeError::Cipher`] if the keystream cannot be constructed.
    pub fn sealer(
        &self,
        password: &str,
        meta: impl Into<String>,
    ) -> Result<Sealer, EnvelopeError> {
        let mut salt = vec![0u8; SALT_LEN];
        getrandom::fill(&mut salt).map_err(|e| EnvelopeError::Entropy {
            message: e.to_string().into(),
            context: Some("Drawing envelope salt".into()),
        })?;

        let mut iv = vec![0u8; M::IV_LEN];
        getrandom::fill(&mut iv).map_err(|e| EnvelopeError::Entropy {
            message: e.to_string().into(),
            context: Some("Drawing envelope IV".into()),
        })?;

        let key = Self::derive_key(password, &salt);
        let stream = M::encryptor(&key, &iv)?;

        Ok(Sealer { envelope: Envelope { iv, salt, content: meta.into() }, stream })
    }

    /// Builds the decrypting keystream for a stored record.
    ///
    /// The key is re-derived from the password and the envelope's salt with
    /// the same parameters used at seal time.
    ///
    /// # Errors
    /// * [`EnvelopeError::Cipher`] if the envelope's IV does not fit the
    ///   mode or the keystream cannot be constructed.
    pub fn opener(
        &self,
        password: &str,
        envelope: &Envelope,
    ) -> Result<Box<dyn Keystream>, EnvelopeError> {
        if envelope.iv.len() != M::IV_LEN {
            return Err(EnvelopeError::Cipher {
                message: format!(
                    "Envelope IV is {} bytes, expected {}",
                    envelope.iv.len(),
                    M::IV_LEN
                )
                .into(),
                context: None,
            });
        }

        let key = Self::derive_key(password, &envelope.salt);
        M::decryptor(&key, &envelope.iv)
    }
}

/// An in-progress seal of a single record.
///
/// Holds the envelope (salt, IV, user meta) and the running keystream.
/// Encrypt eagerly with [`Sealer::apply`], or take the keystream with
/// [`Sealer::into_keystream`] to wrap a blob reader.
pub struct Sealer {
    envelope: Envelope,
    stream: Box<dyn Keystream>,
}

impl std::fmt::Debug for Sealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sealer").field("envelope", &self.envelope).finish_non_exhaustive()
    }
}

impl Sealer {
    /// The envelope to persist as the record's meta.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Encrypts the next stretch of content in place.
    pub fn apply(&mut self, buf: &mut [u8]) {
        self.stream.apply(buf);
    }

    /// Splits the sealer into its envelope and keystream.
    #[must_use]
    pub fn into_parts(self) -> (Envelope, Box<dyn Keystream>) {
        (self.envelope, self.stream)
    }

    /// Consumes the sealer, keeping only the keystream.
    #[must_use]
    pub fn into_keystream(self) -> Box<dyn Keystream> {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_salt_and_iv_per_seal() {
        let cipher = Cipher::<Cfb>::new();
        let a = cipher.sealer("pw", "m").unwrap();
        let b = cipher.sealer("pw", "m").unwrap();

        assert_ne!(a.envelope().salt, b.envelope().salt);
        assert_ne!(a.envelope().iv, b.envelope().iv);
        assert_eq!(a.envelope().salt.len(), SALT_LEN);
        assert_eq!(a.envelope().iv.len(), Cfb::IV_LEN);
    }

    #[test]
    fn opener_rejects_wrong_iv_length() {
        let cipher = Cipher::<Cfb>::new();
        let envelope = Envelope { iv: vec![0u8; 12], salt: vec![0u8; 8], content: String::new() };

        let err = cipher.opener("pw", &envelope).unwrap_err();
        assert!(matches!(err, EnvelopeError::Cipher { .. }));
    }

    #[test]
    fn key_derivation_is_deterministic() {
        let a = Cipher::<Cfb>::derive_key("password", b"saltsalt");
        let b = Cipher::<Cfb>::derive_key("password", b"saltsalt");
        let c = Cipher::<Cfb>::derive_key("password", b"other-salt");

        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }
}
