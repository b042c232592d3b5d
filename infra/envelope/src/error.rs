//! # Envelope Errors
//!
//! The [`EnvelopeError`] enum and [`Result`] extension used throughout the
//! envelope crate for reporting entropy, cipher, and envelope-format
//! failures.

use std::borrow::Cow;

/// A specialized [`EnvelopeError`] enum for envelope-encryption failures.
#[lockbox_derive::lockbox_error]
pub enum EnvelopeError {
    /// The system RNG could not produce salt/IV material.
    #[error("Entropy error{}: {message}", format_context(.context))]
    Entropy { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure constructing or driving the stream cipher.
    ///
    /// Usually a key or IV of the wrong length for the selected mode.
    #[error("Cipher error{}: {message}", format_context(.context))]
    Cipher { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The stored envelope is not valid JSON of the expected shape.
    #[error("Malformed envelope{}: {source}", format_context(.context))]
    Malformed { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal envelope error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
