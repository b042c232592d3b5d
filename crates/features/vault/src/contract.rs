//! The backend-agnostic vault contracts.

use crate::error::VaultError;
use crate::model::{Blob, Credential, Piece, Resource, ResourceId, Token};
use async_trait::async_trait;

/// The vault entry point.
///
/// Stateless between calls; all per-user state lives in the backend.
/// Implemented by [`Repository`](crate::Repository),
/// [`Memory`](crate::Memory), and the [`Encrypted`](crate::Encrypted)
/// decorator.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Creates a new identity. No token is issued; the caller
    /// authenticates separately.
    ///
    /// # Errors
    /// * [`VaultError::DuplicateIdentity`] if the username is taken.
    /// * [`VaultError::BadCredential`] if the credential is unusable.
    /// * [`VaultError::Transient`] on backend failure.
    async fn register(&self, credential: Credential) -> Result<(), VaultError>;

    /// Verifies the credential and issues a bearer token.
    ///
    /// A missing identity and a wrong password are indistinguishable.
    ///
    /// # Errors
    /// * [`VaultError::BadCredential`] on verification failure.
    /// * [`VaultError::Transient`] on backend failure.
    async fn authenticate(&self, credential: Credential) -> Result<Token, VaultError>;

    /// Validates the token and returns the handle bound to its identity.
    ///
    /// # Errors
    /// * [`VaultError::BadCredential`] if the token is forged or expired.
    async fn identity(&self, token: &Token) -> Result<Box<dyn Identity>, VaultError>;
}

/// A handle bound to one authenticated identity.
///
/// Every operation that touches payload data re-verifies the caller's
/// password against the stored hash; a resource belonging to another
/// identity is indistinguishable from a missing one.
#[async_trait]
pub trait Identity: Send + Sync {
    /// Stores a piece, returning its resource id.
    async fn store_piece(&self, piece: Piece, password: &str) -> Result<ResourceId, VaultError>;

    /// Restores a piece by resource id.
    ///
    /// # Errors
    /// * [`VaultError::ResourceNotFound`] if the id is absent, owned by
    ///   another identity, or not a piece.
    async fn restore_piece(&self, rid: ResourceId, password: &str) -> Result<Piece, VaultError>;

    /// Stores a blob, streaming its content; the stream is consumed and
    /// released by the callee, also on failure.
    async fn store_blob(&self, blob: Blob, password: &str) -> Result<ResourceId, VaultError>;

    /// Restores a blob by resource id; the caller owns (and drops) the
    /// returned stream.
    async fn restore_blob(&self, rid: ResourceId, password: &str) -> Result<Blob, VaultError>;

    /// Deletes a resource of either kind, including a blob's file.
    async fn delete(&self, rid: ResourceId) -> Result<(), VaultError>;

    /// Lists this identity's resources. Order is unspecified.
    async fn list(&self) -> Result<Vec<Resource>, VaultError>;
}
