//! # Vault Feature
//!
//! The authenticated vault: identity lifecycle, owner-scoped encrypted
//! resources, and the REST surface over them.
//!
//! The slice is organized around two small contracts. [`Vault`] is the
//! entry point (`register`, `authenticate`, `identity`); [`Identity`] is
//! the per-user handle every backend implements (`store_piece`,
//! `restore_piece`, `store_blob`, `restore_blob`, `delete`, `list`).
//! Three implementations share them:
//!
//! * [`Repository`], the persistent backend: SurrealDB rows plus a blob
//!   file directory.
//! * [`Memory`], the in-memory reference backend used by tests.
//! * [`Encrypted`], a decorator over any [`Vault`] that seals payloads
//!   with a per-operation password-derived key and wraps metadata in the
//!   JSON envelope, so the inner backend only ever sees ciphertext.
//!
//! The production stack is `Encrypted<Repository>`; [`init`] wires it from
//! configuration.

mod contract;
mod encrypted;
mod error;
mod memory;
mod model;
mod repository;
pub mod rest;
mod secret;
mod token;

pub use contract::{Identity, Vault};
pub use encrypted::{Encrypted, EncryptedIdentity};
pub use error::{VaultError, VaultErrorExt};
pub use memory::Memory;
pub use model::{Blob, BlobStream, Credential, Piece, Resource, ResourceId, ResourceKind, Token};
pub use repository::Repository;
pub use rest::{VaultState, vault_router};
pub use secret::SecretHasher;
pub use token::TokenSource;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use lockbox_database::Database;
use lockbox_domain::config::SecurityConfig;
use lockbox_kernel::gate::Gate;
use lockbox_storage::BlobStore;
use std::sync::Arc;
use std::time::Duration;

/// Wires the production vault slice: the persistent backend behind the
/// envelope-encryption decorator, exposed as REST state.
///
/// The database arrives through a one-shot [`Gate`] so the slice can be
/// initialized before the connection is established; requests block on the
/// gate until the lifecycle task publishes it.
///
/// # Errors
/// Returns [`VaultError::Internal`] if the token secret is not valid
/// base64 or the hash parameters are rejected.
pub fn init(
    security: &SecurityConfig,
    database: Gate<Database>,
    store: BlobStore,
) -> Result<VaultState, VaultError> {
    let secret = STANDARD_NO_PAD
        .decode(&security.token.secret)
        .map_err(|e| -> VaultError { format!("token secret is not raw base64: {e}").into() })?;

    let tokens = TokenSource::new(
        &secret,
        Duration::from_secs(security.token.lifespan_seconds),
        security.token.clock_skew_seconds,
    );
    let hasher = SecretHasher::new(&security.hash)?;
    let repository = Repository::new(database, store, tokens, hasher);

    tracing::info!("Vault slice initialized");

    Ok(VaultState::new(Arc::new(Encrypted::new(repository)), security.credentials.clone()))
}
