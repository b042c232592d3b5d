//! Idempotent bootstrap of the vault schema.
//!
//! Four content tables plus a `sequences` counter table that backs the
//! monotonic numeric record ids. Identity records are keyed by username
//! (`identities:<username>`), which is what makes a duplicate registration
//! detectable inside a single transaction.

use crate::error::{DatabaseError, DatabaseErrorExt};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tracing::debug;

const SCHEMA: &str = "
    DEFINE TABLE IF NOT EXISTS identities SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS password ON identities TYPE string;

    DEFINE TABLE IF NOT EXISTS resources SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS meta ON resources TYPE string;
    DEFINE FIELD IF NOT EXISTS owner ON resources TYPE string;
    DEFINE FIELD IF NOT EXISTS kind ON resources TYPE int;
    DEFINE FIELD IF NOT EXISTS payload ON resources TYPE int;
    DEFINE INDEX IF NOT EXISTS resources_owner ON resources FIELDS owner;

    DEFINE TABLE IF NOT EXISTS pieces SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS content ON pieces TYPE string;

    DEFINE TABLE IF NOT EXISTS blobs SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS location ON blobs TYPE string;

    DEFINE TABLE IF NOT EXISTS sequences SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS value ON sequences TYPE int DEFAULT 0;

    UPSERT sequences:resources SET value = value OR 0;
    UPSERT sequences:pieces SET value = value OR 0;
    UPSERT sequences:blobs SET value = value OR 0;
";

/// Applies the schema; safe to run on every startup.
pub(crate) async fn initialize(db: &Surreal<Any>) -> Result<(), DatabaseError> {
    db.query(SCHEMA)
        .await
        .context("Applying vault schema")?
        .check()
        .map_err(surrealdb::Error::from)
        .context("Verifying vault schema")?;

    debug!("Vault schema applied");
    Ok(())
}
