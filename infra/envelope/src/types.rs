use crate::error::{EnvelopeError, EnvelopeErrorExt};
use aes::Aes256;
use cfb_mode::cipher::KeyIvInit;
use cfb_mode::{BufDecryptor, BufEncryptor};
use serde::{Deserialize, Serialize};

// --- Parameters ---

/// Per-record salt length in bytes.
pub const SALT_LEN: usize = 8;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count, identical on seal and open.
pub const PBKDF2_ROUNDS: u32 = 4096;

// --- Envelope ---

/// The JSON wrapper persisted in a resource's `meta` column.
///
/// Carries the cryptographic parameters of the record next to the
/// user-visible metadata:
///
/// ```json
/// {"iv": "<base64>", "salt": "<base64>", "content": "<user meta>"}
/// ```
///
/// The byte fields are standard (padded) base64 in the JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    pub content: String,
}

impl Envelope {
    /// Parses a stored meta string into an [`Envelope`].
    ///
    /// # Errors
    /// Returns [`EnvelopeError::Malformed`] if the string is not an
    /// envelope, the signal that the stored record is corrupt.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(raw).context("Parsing stored meta")
    }

    /// Serializes the envelope into the stored meta string.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).context("Serializing envelope")
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

// --- Stream modes ---

/// A running keystream: encrypts or decrypts buffers in place, in order.
pub trait Keystream: std::fmt::Debug + Send {
    /// Applies the next stretch of the keystream to `buf`.
    fn apply(&mut self, buf: &mut [u8]);
}

/// A pluggable stream-cipher mode for envelope payloads.
///
/// Implementations must be length-preserving and require a fresh random IV
/// per record; the IV length equals the block size of the underlying
/// cipher.
pub trait EnvelopeMode: Send + Sync + 'static {
    /// IV length in bytes.
    const IV_LEN: usize;

    /// Builds the encrypting keystream for one record.
    fn encryptor(key: &[u8; KEY_LEN], iv: &[u8]) -> Result<Box<dyn Keystream>, EnvelopeError>;

    /// Builds the decrypting keystream for one record.
    fn decryptor(key: &[u8; KEY_LEN], iv: &[u8]) -> Result<Box<dyn Keystream>, EnvelopeError>;
}

/// AES-256 in CFB mode, the canonical envelope mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cfb;

#[derive(Debug)]
struct CfbEncrypt(BufEncryptor<Aes256>);

impl Keystream for CfbEncrypt {
    fn apply(&mut self, buf: &mut [u8]) {
        self.0.encrypt(buf);
    }
}

struct CfbDecrypt(BufDecryptor<Aes256>);

impl Keystream for CfbDecrypt {
    fn apply(&mut self, buf: &mut [u8]) {
        self.0.decrypt(buf);
    }
}

impl EnvelopeMode for Cfb {
    const IV_LEN: usize = 16;

    fn encryptor(key: &[u8; KEY_LEN], iv: &[u8]) -> Result<Box<dyn Keystream>, EnvelopeError> {
        let encryptor =
            BufEncryptor::<Aes256>::new_from_slices(key, iv).map_err(|_| EnvelopeError::Cipher {
                message: "Invalid key/IV length for AES-256-CFB".into(),
                context: None,
            })?;
        Ok(Box::new(CfbEncrypt(encryptor)))
    }

    fn decryptor(key: &[u8; KEY_LEN], iv: &[u8]) -> Result<Box<dyn Keystream>, EnvelopeError> {
        let decryptor =
            BufDecryptor::<Aes256>::new_from_slices(key, iv).map_err(|_| EnvelopeError::Cipher {
                message: "Invalid key/IV length for AES-256-CFB".into(),
                context: None,
            })?;
        Ok(Box::new(CfbDecrypt(decryptor)))
    }
}
