//! Core blob store implementation: UUID-named files, guarded uploads,
//! sandboxed reads and removals.

use crate::builder::BlobStoreBuilder;
use crate::error::{StorageError, StorageErrorExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

/// Suffix of in-flight upload files; never a valid blob name.
pub(crate) const PARTIAL_SUFFIX: &str = ".partial";

/// The internal shared state of a [`BlobStore`] instance.
#[derive(Debug)]
pub(crate) struct BlobStoreInner {
    /// The canonicalized physical path on disk where all blobs are stored.
    pub(crate) root: PathBuf,
}

/// A thread-safe handle to the blob store.
///
/// Blobs are flat files named by fresh v4 UUIDs directly under the root.
/// The handle is internally reference-counted and can be cheaply cloned
/// across tasks.
#[derive(Debug, Clone)]
pub struct BlobStore {
    pub(crate) inner: Arc<BlobStoreInner>,
}

impl BlobStore {
    #[must_use = "The blob store is not initialized until you call .connect()"]
    pub fn builder() -> BlobStoreBuilder {
        BlobStoreBuilder::new()
    }

    /// The canonical root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Resolves a stored blob name to its physical path.
    ///
    /// Blob names are single path segments minted by this store; anything
    /// that could navigate (separators, `..`, the partial suffix) is
    /// rejected before touching the filesystem.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidName`] if the name is not a plain
    /// file name.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.ends_with(PARTIAL_SUFFIX)
        {
            return Err(StorageError::InvalidName {
                message: name.to_owned().into(),
                context: Some("Blob names are single non-partial path segments".into()),
            });
        }
        Ok(self.inner.root.join(name))
    }

    /// Starts a new blob upload under a fresh, unguessable name.
    ///
    /// The content is streamed into a `.partial` file; nothing appears
    /// under the final name until [`PendingBlob::commit`]. If the returned
    /// guard is dropped uncommitted (error path, cancelled request) the
    /// partial file is removed.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if the partial file cannot be created.
    pub async fn create(&self) -> Result<PendingBlob, StorageError> {
        let name = Uuid::new_v4().to_string();
        let final_path = self.inner.root.join(&name);
        let partial_path = self.inner.root.join(format!("{name}{PARTIAL_SUFFIX}"));

        let file = fs::File::create(&partial_path)
            .await
            .context(format!("Failed to create upload file: {}", partial_path.display()))?;

        debug!(blob = %name, "Started blob upload");

        Ok(PendingBlob { name, final_path, partial_path, file: Some(file), committed: false })
    }

    /// Opens a committed blob for reading.
    ///
    /// # Errors
    /// Returns [`StorageError::FileNotFound`] if no blob exists under the
    /// name; with a row still referencing it, the caller is looking at a
    /// store that lost a file.
    pub async fn open(&self, name: &str) -> Result<fs::File, StorageError> {
        let path = self.resolve(name)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound { message: name.to_owned().into(), context: None })
            },
            Err(err) => {
                Err(err).context(format!("Failed to open blob: {}", path.display()))
            },
        }
    }

    /// Removes a committed blob.
    ///
    /// Returns `Ok(false)` when the file was already gone: a re-delete
    /// after a previously failed transaction must be able to finish.
    pub async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(blob = %name, "Blob file already removed");
                Ok(false)
            },
            Err(err) => Err(err).context(format!("Failed to remove blob: {}", path.display())),
        }
    }

    /// Returns whether a committed blob exists under the name.
    pub fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.resolve(name)?.exists())
    }
}

/// An in-flight blob upload.
///
/// Stream content in with [`PendingBlob::fill_from`], then [`commit`]
/// (rename into place) to make the blob visible. Dropping the guard
/// without committing removes the partial file.
///
/// [`commit`]: PendingBlob::commit
#[derive(Debug)]
pub struct PendingBlob {
    name: String,
    final_path: PathBuf,
    partial_path: PathBuf,
    file: Option<fs::File>,
    committed: bool,
}

impl PendingBlob {
    /// The name the blob will be stored under once committed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Streams the whole reader into the upload file.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] on a read or write failure; the guard
    /// stays armed, so the partial file is removed on drop.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> Result<u64, StorageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let file = self.file.as_mut().ok_or_else(|| StorageError::Io {
            source: std::io::Error::other("upload already committed"),
            context: None,
        })?;
        let written = tokio::io::copy(reader, file)
            .await
            .context("Failed to stream content into the upload file")?;
        Ok(written)
    }

    /// Flushes, closes and renames the upload into its final name.
    ///
    /// Returns the blob name to persist. After commit the guard is
    /// disarmed.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if flushing or renaming fails; the
    /// partial file is then still removed on drop.
    pub async fn commit(mut self) -> Result<String, StorageError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.context("Failed to flush the upload file")?;
            file.sync_all().await.context("Failed to sync the upload file")?;
        }

        fs::rename(&self.partial_path, &self.final_path)
            .await
            .context(format!("Failed to commit blob: {}", self.final_path.display()))?;

        self.committed = true;
        debug!(blob = %self.name, "Committed blob upload");
        Ok(std::mem::take(&mut self.name))
    }
}

impl Drop for PendingBlob {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Close the handle before unlinking; harmless if already taken.
        drop(self.file.take());
        if let Err(err) = std::fs::remove_file(&self.partial_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.partial_path.display(), error = %err, "Failed to remove partial upload");
            }
        }
    }
}
