//! The vault resource model.

use crate::error::VaultError;
use tokio::io::AsyncRead;

/// A signed 64-bit resource identifier, unique within a backend across
/// both resource kinds.
pub type ResourceId = i64;

/// A username/password pair; used only by `register` and `authenticate`,
/// never persisted in clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// An opaque bearer token proving authenticated identity within its
/// lifespan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub const fn new(raw: String) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Token {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of a stored resource.
///
/// The numeric tags are part of the persistent format and of the list API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Piece = 1,
    Blob = 2,
}

impl ResourceKind {
    /// The persisted numeric tag.
    #[must_use]
    pub const fn tag(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for ResourceKind {
    type Error = VaultError;

    fn try_from(tag: i64) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::Piece),
            2 => Ok(Self::Blob),
            other => Err(VaultError::corrupt(format!("unknown resource kind tag {other}"))),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Piece => "Piece",
            Self::Blob => "Blob",
        })
    }
}

/// A listed vault entry: id, kind, and the user-visible meta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub rid: ResourceId,
    pub kind: ResourceKind,
    pub meta: String,
}

/// A small record, held in memory end to end.
///
/// At the [`Identity`](crate::Identity) boundary both fields are
/// plaintext; below the encryption decorator `content` is ciphertext and
/// `meta` is the JSON envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub meta: String,
    pub content: Vec<u8>,
}

/// The byte stream of a blob. Dropping it releases the underlying source.
pub type BlobStream = Box<dyn AsyncRead + Send + Unpin>;

/// A large record, streamed rather than buffered.
///
/// Whoever receives a `Blob` owns its stream: callees consume and drop it
/// on store, callers drop it after reading on restore.
pub struct Blob {
    pub meta: String,
    pub content: BlobStream,
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob").field("meta", &self.meta).finish_non_exhaustive()
    }
}
