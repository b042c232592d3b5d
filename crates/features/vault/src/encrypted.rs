//! The envelope-encryption decorator.
//!
//! Wraps any [`Vault`] so that payloads cross into the inner backend only
//! as ciphertext and stored meta only as the JSON envelope. Restoring
//! reverses the process; listing strips envelopes without touching
//! payloads. Registration and authentication pass straight through; the
//! decorator is about data at rest, not about identity.

use crate::contract::{Identity, Vault};
use crate::error::VaultError;
use crate::model::{Blob, Credential, Piece, Resource, ResourceId, Token};
use async_trait::async_trait;
use lockbox_envelope::{Cfb, Cipher, CipherReader, Envelope, EnvelopeError, EnvelopeMode};

/// An encrypted [`Vault`], generic over the stream mode (CFB canonical).
#[derive(Debug)]
pub struct Encrypted<G, M: EnvelopeMode = Cfb> {
    origin: G,
    cipher: Cipher<M>,
}

impl<G: Vault> Encrypted<G> {
    /// Wraps a backend with the canonical AES-256-CFB envelope.
    #[must_use]
    pub const fn new(origin: G) -> Self {
        Self { origin, cipher: Cipher::new() }
    }
}

impl<G: Vault, M: EnvelopeMode> Encrypted<G, M> {
    /// Wraps a backend with an explicitly chosen stream mode.
    #[must_use]
    pub const fn with_mode(origin: G) -> Self {
        Self { origin, cipher: Cipher::new() }
    }
}

#[async_trait]
impl<G: Vault, M: EnvelopeMode> Vault for Encrypted<G, M> {
    async fn register(&self, credential: Credential) -> Result<(), VaultError> {
        self.origin.register(credential).await
    }

    async fn authenticate(&self, credential: Credential) -> Result<Token, VaultError> {
        self.origin.authenticate(credential).await
    }

    async fn identity(&self, token: &Token) -> Result<Box<dyn Identity>, VaultError> {
        let origin = self.origin.identity(token).await?;
        Ok(Box::new(EncryptedIdentity::<M> { origin, cipher: Cipher::new() }))
    }
}

/// An [`Identity`] handle whose payloads are sealed before they reach the
/// inner handle.
pub struct EncryptedIdentity<M: EnvelopeMode = Cfb> {
    origin: Box<dyn Identity>,
    cipher: Cipher<M>,
}

impl<M: EnvelopeMode> std::fmt::Debug for EncryptedIdentity<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedIdentity").finish_non_exhaustive()
    }
}

impl<M: EnvelopeMode> EncryptedIdentity<M> {
    /// Wraps an already-authenticated handle.
    #[must_use]
    pub fn wrap(origin: Box<dyn Identity>) -> Self {
        Self { origin, cipher: Cipher::new() }
    }
}

#[async_trait]
impl<M: EnvelopeMode> Identity for EncryptedIdentity<M> {
    async fn store_piece(&self, piece: Piece, password: &str) -> Result<ResourceId, VaultError> {
        let mut sealer = self.cipher.sealer(password, piece.meta).map_err(seal_error)?;

        let mut content = piece.content;
        sealer.apply(&mut content);
        let meta = sealer.envelope().to_json().map_err(seal_error)?;

        self.origin.store_piece(Piece { meta, content }, password).await
    }

    async fn restore_piece(&self, rid: ResourceId, password: &str) -> Result<Piece, VaultError> {
        let piece = self.origin.restore_piece(rid, password).await?;

        let envelope = Envelope::parse(&piece.meta).map_err(open_error)?;
        let mut content = piece.content;
        self.cipher.opener(password, &envelope).map_err(open_error)?.apply(&mut content);

        Ok(Piece { meta: envelope.content, content })
    }

    async fn store_blob(&self, blob: Blob, password: &str) -> Result<ResourceId, VaultError> {
        let sealer = self.cipher.sealer(password, blob.meta).map_err(seal_error)?;
        let (envelope, keystream) = sealer.into_parts();
        let meta = envelope.to_json().map_err(seal_error)?;

        // The encrypting reader owns the upload stream, so the inner
        // backend releasing its blob releases the source as well.
        let content = Box::new(CipherReader::new(blob.content, keystream));

        self.origin.store_blob(Blob { meta, content }, password).await
    }

    async fn restore_blob(&self, rid: ResourceId, password: &str) -> Result<Blob, VaultError> {
        let blob = self.origin.restore_blob(rid, password).await?;

        let envelope = Envelope::parse(&blob.meta).map_err(open_error)?;
        let opener = self.cipher.opener(password, &envelope).map_err(open_error)?;

        Ok(Blob {
            meta: envelope.content,
            content: Box::new(CipherReader::new(blob.content, opener)),
        })
    }

    async fn delete(&self, rid: ResourceId) -> Result<(), VaultError> {
        self.origin.delete(rid).await
    }

    async fn list(&self) -> Result<Vec<Resource>, VaultError> {
        let mut resources = self.origin.list().await?;
        for resource in &mut resources {
            let envelope = Envelope::parse(&resource.meta).map_err(open_error)?;
            resource.meta = envelope.content;
        }
        Ok(resources)
    }
}

/// Failures while sealing fresh data: nothing is stored yet.
fn seal_error(err: EnvelopeError) -> VaultError {
    match err {
        EnvelopeError::Entropy { .. } => VaultError::transient(err),
        other => VaultError::Internal { message: other.to_string().into(), context: None },
    }
}

/// Failures while opening stored data: the record itself is suspect.
fn open_error(err: EnvelopeError) -> VaultError {
    VaultError::corrupt(err.to_string())
}
