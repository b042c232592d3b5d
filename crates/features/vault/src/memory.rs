//! The in-memory reference backend.
//!
//! Holds identities and resources in parallel vectors behind mutexes and
//! assigns `rid` = insertion index. Deletion never compacts: it clears
//! the record's owner to the empty sentinel so owner-scoped reads stop
//! seeing it while indices stay stable. Passwords are compared in
//! plaintext, acceptable only because nothing here ever persists.
//!
//! Blob content still goes through a [`BlobStore`] so streams behave like
//! the real backend's; blob streaming happens under the storage mutex,
//! which is a known limitation of this backend.

use crate::contract::{Identity, Vault};
use crate::error::VaultError;
use crate::model::{Blob, Credential, Piece, Resource, ResourceId, ResourceKind, Token};
use crate::token::TokenSource;
use async_trait::async_trait;
use lockbox_storage::BlobStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct IdentityRecord {
    username: String,
    password: String,
}

#[derive(Debug)]
struct MemoryResource {
    meta: String,
    owner: String,
    kind: ResourceKind,
    payload: usize,
}

#[derive(Debug, Default)]
struct MemoryStorage {
    resources: Vec<MemoryResource>,
    pieces: Vec<Vec<u8>>,
    blobs: Vec<String>,
}

#[derive(Debug)]
struct MemoryInner {
    identities: Mutex<Vec<IdentityRecord>>,
    storage: Mutex<MemoryStorage>,
    store: BlobStore,
    tokens: TokenSource,
}

/// The in-memory [`Vault`] backend, for tests.
#[derive(Debug, Clone)]
pub struct Memory {
    inner: Arc<MemoryInner>,
}

impl Memory {
    /// Creates an empty in-memory vault whose tokens live for
    /// `lifespan`; blob files go under the given store.
    #[must_use]
    pub fn new(lifespan: Duration, store: BlobStore) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                identities: Mutex::new(Vec::new()),
                storage: Mutex::new(MemoryStorage::default()),
                store,
                tokens: TokenSource::new(b"none", lifespan, 0),
            }),
        }
    }
}

#[async_trait]
impl Vault for Memory {
    async fn register(&self, credential: Credential) -> Result<(), VaultError> {
        if credential.username.is_empty() || credential.password.is_empty() {
            return Err(VaultError::bad_credential());
        }

        let mut identities = self.inner.identities.lock().await;
        if identities.iter().any(|record| record.username == credential.username) {
            return Err(VaultError::DuplicateIdentity {
                message: "username is taken".into(),
                context: None,
            });
        }

        identities.push(IdentityRecord {
            username: credential.username,
            password: credential.password,
        });
        Ok(())
    }

    async fn authenticate(&self, credential: Credential) -> Result<Token, VaultError> {
        let identities = self.inner.identities.lock().await;
        let known = identities
            .iter()
            .any(|r| r.username == credential.username && r.password == credential.password);
        if !known {
            return Err(VaultError::bad_credential());
        }

        self.inner.tokens.issue(&credential.username)
    }

    async fn identity(&self, token: &Token) -> Result<Box<dyn Identity>, VaultError> {
        let username = self.inner.tokens.subject(token)?;

        let identities = self.inner.identities.lock().await;
        let record = identities
            .iter()
            .find(|r| r.username == username)
            .ok_or_else(VaultError::bad_credential)?
            .clone();

        Ok(Box::new(MemoryIdentity { inner: Arc::clone(&self.inner), record }))
    }
}

/// A [`Memory`] handle bound to one identity.
#[derive(Debug)]
struct MemoryIdentity {
    inner: Arc<MemoryInner>,
    record: IdentityRecord,
}

impl MemoryIdentity {
    fn verify_password(&self, password: &str) -> Result<(), VaultError> {
        if password == self.record.password { Ok(()) } else { Err(VaultError::bad_credential()) }
    }

    /// Index-addressed, owner-scoped lookup shared by the restore paths.
    fn resource_index(
        storage: &MemoryStorage,
        rid: ResourceId,
        owner: &str,
        kind: ResourceKind,
    ) -> Result<usize, VaultError> {
        let index = usize::try_from(rid).map_err(|_| VaultError::not_found(rid))?;
        let resource = storage.resources.get(index).ok_or_else(|| VaultError::not_found(rid))?;
        if resource.owner != owner || resource.kind != kind {
            return Err(VaultError::not_found(rid));
        }
        Ok(index)
    }
}

#[async_trait]
impl Identity for MemoryIdentity {
    async fn store_piece(&self, piece: Piece, password: &str) -> Result<ResourceId, VaultError> {
        self.verify_password(password)?;
        let mut storage = self.inner.storage.lock().await;

        storage.pieces.push(piece.content);
        let payload = storage.pieces.len() - 1;
        storage.resources.push(MemoryResource {
            meta: piece.meta,
            owner: self.record.username.clone(),
            kind: ResourceKind::Piece,
            payload,
        });

        Ok((storage.resources.len() - 1) as ResourceId)
    }

    async fn restore_piece(&self, rid: ResourceId, password: &str) -> Result<Piece, VaultError> {
        self.verify_password(password)?;
        let storage = self.inner.storage.lock().await;

        let index =
            Self::resource_index(&storage, rid, &self.record.username, ResourceKind::Piece)?;
        let resource = &storage.resources[index];

        Ok(Piece {
            meta: resource.meta.clone(),
            content: storage.pieces[resource.payload].clone(),
        })
    }

    async fn store_blob(&self, blob: Blob, password: &str) -> Result<ResourceId, VaultError> {
        let Blob { meta, mut content } = blob;
        self.verify_password(password)?;
        let mut storage = self.inner.storage.lock().await;

        let mut pending = self.inner.store.create().await.map_err(VaultError::transient)?;
        pending.fill_from(&mut content).await.map_err(VaultError::transient)?;
        drop(content);
        let location = pending.commit().await.map_err(VaultError::transient)?;

        storage.blobs.push(location);
        let payload = storage.blobs.len() - 1;
        storage.resources.push(MemoryResource {
            meta,
            owner: self.record.username.clone(),
            kind: ResourceKind::Blob,
            payload,
        });

        Ok((storage.resources.len() - 1) as ResourceId)
    }

    async fn restore_blob(&self, rid: ResourceId, password: &str) -> Result<Blob, VaultError> {
        self.verify_password(password)?;
        let storage = self.inner.storage.lock().await;

        let index = Self::resource_index(&storage, rid, &self.record.username, ResourceKind::Blob)?;
        let resource = &storage.resources[index];
        let location = &storage.blobs[resource.payload];

        let file = self.inner.store.open(location).await.map_err(VaultError::transient)?;
        Ok(Blob { meta: resource.meta.clone(), content: Box::new(file) })
    }

    async fn delete(&self, rid: ResourceId) -> Result<(), VaultError> {
        let mut storage = self.inner.storage.lock().await;

        let index = usize::try_from(rid).map_err(|_| VaultError::not_found(rid))?;
        let resource = storage.resources.get(index).ok_or_else(|| VaultError::not_found(rid))?;
        if resource.owner != self.record.username {
            return Err(VaultError::not_found(rid));
        }

        if resource.kind == ResourceKind::Blob {
            let location = storage.blobs[resource.payload].clone();
            self.inner.store.remove(&location).await.map_err(VaultError::transient)?;
        }

        storage.resources[index].owner = String::new();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Resource>, VaultError> {
        let storage = self.inner.storage.lock().await;

        Ok(storage
            .resources
            .iter()
            .enumerate()
            .filter(|(_, resource)| resource.owner == self.record.username)
            .map(|(index, resource)| Resource {
                rid: index as ResourceId,
                kind: resource.kind,
                meta: resource.meta.clone(),
            })
            .collect())
    }
}
