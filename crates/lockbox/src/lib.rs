//! Facade crate for Lockbox features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.

use lockbox_database::Database;
use lockbox_domain::config::ApiConfig;
use lockbox_kernel::gate::Gate;
use lockbox_storage::BlobStore;

pub use lockbox_domain as domain;
pub use lockbox_kernel as kernel;
pub use lockbox_vault as vault;

pub mod server {
    pub mod router {
        pub use lockbox_kernel::server::router::system_router;
        pub use lockbox_vault::vault_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    /// Build-time enabled features.
    pub const ENABLED: &[&str] = &["vault"];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Initialize all features for server mode.
///
/// # Errors
/// Returns an error if any feature initialization fails.
pub fn init(
    config: &ApiConfig,
    database: Gate<Database>,
    store: BlobStore,
) -> Result<vault::VaultState, vault::VaultError> {
    vault::init(&config.security, database, store)
}
