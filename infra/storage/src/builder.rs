use crate::engine::{BlobStore, BlobStoreInner};
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct BlobStoreBuilder<S: Sealed = NoRoot> {
    state: S,
    create: bool,
}

impl BlobStoreBuilder<NoRoot> {
    #[must_use = "Creates a new blob store builder with default configuration"]
    pub fn new() -> Self {
        Self { state: NoRoot, create: true }
    }

    #[must_use = "Sets the root directory path for the blob store"]
    pub fn root(self, path: impl Into<PathBuf>) -> BlobStoreBuilder<WithRoot> {
        BlobStoreBuilder { state: WithRoot(path.into()), create: self.create }
    }
}

#[allow(private_bounds)]
impl<S: Sealed> BlobStoreBuilder<S> {
    #[must_use = "Sets whether the blob root should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.create = enable;
        self
    }
}

impl BlobStoreBuilder<WithRoot> {
    /// Consumes the configuration and initializes the blob store.
    ///
    /// Boot sequence:
    /// 1. **Bootstrapping**: creates the root directory if `create(true)` was set.
    /// 2. **Canonicalization**: resolves the root to an absolute physical path
    ///    so later name resolution cannot be redirected through symlinks.
    /// 3. **Self-Healing**: sweeps stale `.partial` files left behind by
    ///    previous crashes. The sweep is non-critical; failures are logged
    ///    and initialization proceeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if:
    /// - The root directory does not exist and `create` is false.
    /// - The process lacks permissions to create or resolve the root.
    pub async fn connect(self) -> Result<BlobStore, StorageError> {
        let root = &self.state.0;

        if self.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap blob root: {}", root.display()))?;
            info!(path = %root.display(), "Bootstrapped blob root directory");
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve blob root: {}", root.display()))?;

        maintenance::sweep(&canonical).await;

        Ok(BlobStore { inner: Arc::new(BlobStoreInner { root: canonical }) })
    }
}
