//! # Envelope Encryption
//!
//! Password-derived envelope encryption for vault payloads.
//!
//! Every sealed record gets a fresh 8-byte salt and a fresh IV. A 32-byte
//! key is derived from the caller-supplied password with
//! PBKDF2-HMAC-SHA256 (4096 rounds) and drives AES-256 in a
//! length-preserving stream mode, CFB by default, pluggable through the
//! [`EnvelopeMode`] trait. The salt and IV travel with the record inside a
//! JSON [`Envelope`] that also carries the user-visible metadata, so a
//! record is self-contained: password + envelope is everything needed to
//! open it.
//!
//! The stream mode is **not authenticated**: opening with a wrong password
//! yields garbage rather than an error, and callers must not treat a
//! successful decryption as proof of integrity.
//!
//! ## Example
//!
//! ```rust
//! use lockbox_envelope::{Cipher, Envelope};
//!
//! # fn main() -> Result<(), lockbox_envelope::EnvelopeError> {
//! let cipher = Cipher::default();
//!
//! let mut content = b"pin: 0000".to_vec();
//! let mut sealer = cipher.sealer("password", "bank card")?;
//! sealer.apply(&mut content);
//! let stored_meta = sealer.envelope().to_json()?;
//!
//! let envelope = Envelope::parse(&stored_meta)?;
//! cipher.opener("password", &envelope)?.apply(&mut content);
//! assert_eq!(content, b"pin: 0000");
//! assert_eq!(envelope.content, "bank card");
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod stream;
mod types;

pub use engine::{Cipher, Sealer};
pub use error::{EnvelopeError, EnvelopeErrorExt};
pub use stream::CipherReader;
pub use types::{Cfb, Envelope, EnvelopeMode, KEY_LEN, Keystream, PBKDF2_ROUNDS, SALT_LEN};
