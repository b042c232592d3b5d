//! # Blob Store
//!
//! A flat, sandboxed directory of ciphertext blob files.
//!
//! Every blob lives at `<root>/<uuid>`; names are drawn fresh per upload
//! and never reused. Uploads stream into a `<uuid>.partial` file first and
//! are renamed into place on commit, so a crash or an abandoned request
//! never leaves a half-written blob under its final name: the
//! [`PendingBlob`] guard removes the partial file when dropped uncommitted,
//! and leftovers from hard crashes are swept on startup.
//!
//! ## Example
//!
//! ```rust
//! use lockbox_storage::BlobStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lockbox_storage::StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("blobs");
//!     let store = BlobStore::builder().root(&root).connect().await?;
//!
//!     let mut pending = store.create().await?;
//!     pending.fill_from(&mut b"ciphertext".as_slice()).await?;
//!     let name = pending.commit().await?;
//!
//!     let _file = store.open(&name).await?;
//!     store.remove(&name).await?;
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;

pub use builder::BlobStoreBuilder;
pub use engine::{BlobStore, PendingBlob};
pub use error::{StorageError, StorageErrorExt};
