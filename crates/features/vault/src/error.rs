//! The vault error taxonomy.
//!
//! One enum for every layer of the slice: backends wrap underlying
//! database/filesystem failures into these canonical variants, upper
//! layers classify by variant match, and the REST boundary maps each
//! variant to its status code. Nothing classifies by message text.

use std::borrow::Cow;

/// A specialized [`VaultError`] enum shared by all vault backends.
#[lockbox_derive::lockbox_error]
pub enum VaultError {
    /// Wrong password, unknown identity, or an invalid/expired token.
    ///
    /// The cases are deliberately indistinguishable to the caller.
    #[error("Bad credential{}: {message}", format_context(.context))]
    BadCredential { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The username is already registered.
    #[error("Duplicate identity{}: {message}", format_context(.context))]
    DuplicateIdentity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// No such resource for this owner.
    #[error("Resource not found{}: {message}", format_context(.context))]
    ResourceNotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Stored state that should be impossible: an unparsable envelope, an
    /// unknown resource kind tag, an undecodable password hash.
    #[error("Corrupt record{}: {message}", format_context(.context))]
    Corrupt { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A database or filesystem failure not otherwise classified; the
    /// caller may retry.
    #[error("Transient backend failure{}: {message}", format_context(.context))]
    Transient { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Malformed input at the transport boundary.
    #[error("Bad request{}: {message}", format_context(.context))]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal vault error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl VaultError {
    /// The canonical bad-credential error; carries no detail on purpose.
    #[must_use]
    pub fn bad_credential() -> Self {
        Self::BadCredential { message: "verification failed".into(), context: None }
    }

    /// Not-found for a resource id, scoped or otherwise absent.
    #[must_use]
    pub fn not_found(rid: i64) -> Self {
        Self::ResourceNotFound { message: format!("resource {rid}").into(), context: None }
    }

    /// Wraps an underlying failure as retryable.
    #[must_use]
    pub fn transient(err: impl std::fmt::Display) -> Self {
        Self::Transient { message: err.to_string().into(), context: None }
    }

    /// Wraps an impossible-state observation.
    #[must_use]
    pub fn corrupt(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Corrupt { message: message.into(), context: None }
    }

    /// Malformed transport input.
    #[must_use]
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest { message: message.into(), context: None }
    }
}
