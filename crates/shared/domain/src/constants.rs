//! Shared API constants.

/// OpenAPI tag for system endpoints (health, docs).
pub const SYSTEM_TAG: &str = "System";

/// OpenAPI tag for vault endpoints.
pub const VAULT_TAG: &str = "Vault";

/// Header carrying the per-operation vault password.
pub const PASSWORD_HEADER: &str = "X-Password";

/// Header carrying the user-supplied metadata of a blob upload/download.
pub const META_HEADER: &str = "X-Meta";
