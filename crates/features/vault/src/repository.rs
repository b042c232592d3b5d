//! The persistent backend: SurrealDB rows plus a blob file directory.
//!
//! Identities are keyed by username (`identities:<username>`), resources
//! and payload rows carry numeric ids drawn from the `sequences` counters
//! so `rid` is monotonic and never reused for a different payload. Every
//! write that spans a resource row and a payload row runs in one database
//! transaction; blob files are written (and made durable) before their
//! rows exist and removed when the rows go away.

use crate::contract::{Identity, Vault};
use crate::error::VaultError;
use crate::model::{Blob, Credential, Piece, Resource, ResourceId, ResourceKind, Token};
use crate::secret::SecretHasher;
use crate::token::TokenSource;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lockbox_database::Database;
use lockbox_kernel::gate::Gate;
use lockbox_storage::{BlobStore, StorageError};
use surrealdb::types::SurrealValue;
use tracing::{instrument, warn};

/// Sentinel thrown by the registration transaction on a taken username;
/// the engine's equivalent of a unique-violation SQLSTATE.
const DUPLICATE_SENTINEL: &str = "identity_duplicate";

/// Sentinel thrown by the delete transaction when no owner-scoped row
/// matched.
const NOT_FOUND_SENTINEL: &str = "resource_not_found";

const REGISTER: &str = "
    BEGIN TRANSACTION;
    IF record::exists(type::thing('identities', $username)) { THROW 'identity_duplicate' };
    CREATE type::thing('identities', $username) SET password = $password;
    COMMIT TRANSACTION;
";

const PASSWORD_OF: &str = "SELECT VALUE password FROM type::thing('identities', $username)";

const STORE_PIECE: &str = "
    BEGIN TRANSACTION;
    LET $rid = (UPSERT ONLY sequences:resources SET value += 1 RETURN AFTER).value;
    LET $pid = (UPSERT ONLY sequences:pieces SET value += 1 RETURN AFTER).value;
    CREATE type::thing('pieces', $pid) SET content = $content;
    CREATE type::thing('resources', $rid)
        SET meta = $meta, owner = $owner, kind = $kind, payload = $pid;
    RETURN $rid;
    COMMIT TRANSACTION;
";

const STORE_BLOB: &str = "
    BEGIN TRANSACTION;
    LET $rid = (UPSERT ONLY sequences:resources SET value += 1 RETURN AFTER).value;
    LET $bid = (UPSERT ONLY sequences:blobs SET value += 1 RETURN AFTER).value;
    CREATE type::thing('blobs', $bid) SET location = $location;
    CREATE type::thing('resources', $rid)
        SET meta = $meta, owner = $owner, kind = $kind, payload = $bid;
    RETURN $rid;
    COMMIT TRANSACTION;
";

const RESOURCE_OF: &str = "
    SELECT meta, kind, payload FROM type::thing('resources', $rid)
        WHERE owner = $owner AND kind = $kind
";

const RESOURCE_ANY_KIND_OF: &str = "
    SELECT meta, kind, payload FROM type::thing('resources', $rid) WHERE owner = $owner
";

const PIECE_CONTENT_OF: &str = "SELECT VALUE content FROM type::thing('pieces', $payload)";

const BLOB_LOCATION_OF: &str = "SELECT VALUE location FROM type::thing('blobs', $payload)";

const DELETE_RESOURCE: &str = "
    BEGIN TRANSACTION;
    LET $gone = (DELETE type::thing('resources', $rid) WHERE owner = $owner RETURN BEFORE);
    IF array::len($gone) == 0 { THROW 'resource_not_found' };
    IF $kind == 1 { DELETE type::thing('pieces', $payload) }
    ELSE { DELETE type::thing('blobs', $payload) };
    COMMIT TRANSACTION;
";

const LIST_RESOURCES: &str = "
    SELECT record::id(id) AS rid, kind, meta FROM resources WHERE owner = $owner
";

#[derive(Debug, SurrealValue)]
struct ResourceRow {
    meta: String,
    kind: i64,
    payload: i64,
}

#[derive(Debug, SurrealValue)]
struct ListRow {
    rid: i64,
    kind: i64,
    meta: String,
}

/// The persistent [`Vault`] backend.
///
/// The database connection arrives through a one-shot gate published by
/// the server lifecycle; operations wait on it, so requests accepted
/// before the connection is up simply block until it is.
#[derive(Debug)]
pub struct Repository {
    database: Gate<Database>,
    store: BlobStore,
    tokens: TokenSource,
    hasher: SecretHasher,
}

impl Repository {
    #[must_use]
    pub fn new(
        database: Gate<Database>,
        store: BlobStore,
        tokens: TokenSource,
        hasher: SecretHasher,
    ) -> Self {
        Self { database, store, tokens, hasher }
    }

    async fn connection(&self) -> Result<Database, VaultError> {
        self.database.get().await.map_err(VaultError::transient)
    }

    /// Hashes on a blocking thread; Argon2 at real cost stalls an async
    /// worker otherwise.
    async fn hash_password(&self, password: String) -> Result<String, VaultError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| -> VaultError { format!("hashing task failed: {e}").into() })?
    }
}

#[async_trait]
impl Vault for Repository {
    #[instrument(skip_all, fields(username = %credential.username))]
    async fn register(&self, credential: Credential) -> Result<(), VaultError> {
        if credential.username.is_empty() || credential.password.is_empty() {
            return Err(VaultError::bad_credential());
        }

        let db = self.connection().await?;
        let hash = self.hash_password(credential.password).await?;

        let checked = db
            .query(REGISTER)
            .bind(("username", credential.username))
            .bind(("password", hash))
            .await
            .map_err(VaultError::transient)?
            .check();

        match checked {
            Ok(_) => Ok(()),
            Err(err) if err.to_string().contains(DUPLICATE_SENTINEL) => {
                Err(VaultError::DuplicateIdentity {
                    message: "username is taken".into(),
                    context: None,
                })
            },
            Err(err) => Err(VaultError::transient(err)),
        }
    }

    #[instrument(skip_all, fields(username = %credential.username))]
    async fn authenticate(&self, credential: Credential) -> Result<Token, VaultError> {
        let db = self.connection().await?;

        let stored = stored_password(&db, &credential.username).await?;
        let Some(stored) = stored else {
            return Err(VaultError::bad_credential());
        };

        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&stored, &credential.password))
            .await
            .map_err(|e| -> VaultError { format!("verification task failed: {e}").into() })??;

        self.tokens.issue(&credential.username)
    }

    async fn identity(&self, token: &Token) -> Result<Box<dyn Identity>, VaultError> {
        let username = self.tokens.subject(token)?;
        let database = self.connection().await?;

        Ok(Box::new(RepositoryIdentity {
            database,
            store: self.store.clone(),
            hasher: self.hasher.clone(),
            username,
        }))
    }
}

/// A [`Repository`] handle bound to one authenticated username.
#[derive(Debug)]
pub(crate) struct RepositoryIdentity {
    database: Database,
    store: BlobStore,
    hasher: SecretHasher,
    username: String,
}

impl RepositoryIdentity {
    /// Re-verifies the per-operation vault password against the stored
    /// hash. A missing identity row reads the same as a mismatch.
    async fn verify_password(&self, password: &str) -> Result<(), VaultError> {
        let stored = stored_password(&self.database, &self.username).await?;
        let Some(stored) = stored else {
            return Err(VaultError::bad_credential());
        };

        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&stored, &password))
            .await
            .map_err(|e| -> VaultError { format!("verification task failed: {e}").into() })?
    }

    /// Loads the owner-scoped resource row, optionally constrained to a
    /// kind.
    async fn resource(
        &self,
        rid: ResourceId,
        kind: Option<ResourceKind>,
    ) -> Result<ResourceRow, VaultError> {
        let query = if kind.is_some() { RESOURCE_OF } else { RESOURCE_ANY_KIND_OF };
        let mut request = self
            .database
            .query(query)
            .bind(("rid", rid))
            .bind(("owner", self.username.clone()));
        if let Some(kind) = kind {
            request = request.bind(("kind", kind.tag()));
        }

        let rows: Vec<ResourceRow> = request
            .await
            .map_err(VaultError::transient)?
            .check()
            .map_err(VaultError::transient)?
            .take(0)
            .map_err(VaultError::transient)?;

        rows.into_iter().next().ok_or_else(|| VaultError::not_found(rid))
    }
}

#[async_trait]
impl Identity for RepositoryIdentity {
    #[instrument(skip_all, fields(owner = %self.username))]
    async fn store_piece(&self, piece: Piece, password: &str) -> Result<ResourceId, VaultError> {
        self.verify_password(password).await?;

        // Binary content travels as base64 text through the query layer.
        let content = STANDARD.encode(&piece.content);

        let mut response = self
            .database
            .query(STORE_PIECE)
            .bind(("content", content))
            .bind(("meta", piece.meta))
            .bind(("owner", self.username.clone()))
            .bind(("kind", ResourceKind::Piece.tag()))
            .await
            .map_err(VaultError::transient)?
            .check()
            .map_err(VaultError::transient)?;

        returned_rid(&mut response)
    }

    #[instrument(skip_all, fields(owner = %self.username, rid = rid))]
    async fn restore_piece(&self, rid: ResourceId, password: &str) -> Result<Piece, VaultError> {
        self.verify_password(password).await?;

        let row = self.resource(rid, Some(ResourceKind::Piece)).await?;

        let content: Option<String> = self
            .database
            .query(PIECE_CONTENT_OF)
            .bind(("payload", row.payload))
            .await
            .map_err(VaultError::transient)?
            .check()
            .map_err(VaultError::transient)?
            .take(0)
            .map_err(VaultError::transient)?;

        let encoded = content
            .ok_or_else(|| VaultError::corrupt(format!("resource {rid} has no piece row")))?;
        let content = STANDARD
            .decode(encoded)
            .map_err(|_| VaultError::corrupt(format!("piece content of {rid} is not base64")))?;

        Ok(Piece { meta: row.meta, content })
    }

    #[instrument(skip_all, fields(owner = %self.username))]
    async fn store_blob(&self, blob: Blob, password: &str) -> Result<ResourceId, VaultError> {
        let Blob { meta, mut content } = blob;
        // Verify before touching the filesystem; the stream is dropped
        // (and thereby released) on every early return.
        self.verify_password(password).await?;

        let mut pending = self.store.create().await.map_err(VaultError::transient)?;
        pending.fill_from(&mut content).await.map_err(VaultError::transient)?;
        drop(content);

        // The file is durable under its final name before any row points
        // at it; if the transaction fails, the file is taken back out.
        let location = pending.commit().await.map_err(VaultError::transient)?;

        let stored = self
            .database
            .query(STORE_BLOB)
            .bind(("location", location.clone()))
            .bind(("meta", meta))
            .bind(("owner", self.username.clone()))
            .bind(("kind", ResourceKind::Blob.tag()))
            .await
            .map_err(VaultError::transient)
            .and_then(|response| response.check().map_err(VaultError::transient));

        match stored {
            Ok(mut response) => returned_rid(&mut response),
            Err(err) => {
                if let Err(remove_err) = self.store.remove(&location).await {
                    warn!(blob = %location, error = %remove_err, "Failed to remove orphaned blob file");
                }
                Err(err)
            },
        }
    }

    #[instrument(skip_all, fields(owner = %self.username, rid = rid))]
    async fn restore_blob(&self, rid: ResourceId, password: &str) -> Result<Blob, VaultError> {
        self.verify_password(password).await?;

        let row = self.resource(rid, Some(ResourceKind::Blob)).await?;
        let location = blob_location(&self.database, row.payload)
            .await?
            .ok_or_else(|| VaultError::corrupt(format!("resource {rid} has no blob row")))?;

        let file = match self.store.open(&location).await {
            Ok(file) => file,
            // A row pointing at a missing file is the documented delete
            // skew; it reads as retryable, not as corruption.
            Err(StorageError::FileNotFound { .. }) => {
                return Err(VaultError::transient(format!("blob file {location} is missing")));
            },
            Err(err) => return Err(VaultError::transient(err)),
        };

        Ok(Blob { meta: row.meta, content: Box::new(file) })
    }

    #[instrument(skip_all, fields(owner = %self.username, rid = rid))]
    async fn delete(&self, rid: ResourceId) -> Result<(), VaultError> {
        let row = self.resource(rid, None).await?;
        let kind = ResourceKind::try_from(row.kind)?;

        // Blob files are removed before the rows commit: a failed commit
        // then leaves a re-deletable row rather than an unreachable file.
        if kind == ResourceKind::Blob {
            let location = blob_location(&self.database, row.payload)
                .await?
                .ok_or_else(|| VaultError::corrupt(format!("resource {rid} has no blob row")))?;
            self.store.remove(&location).await.map_err(VaultError::transient)?;
        }

        let checked = self
            .database
            .query(DELETE_RESOURCE)
            .bind(("rid", rid))
            .bind(("owner", self.username.clone()))
            .bind(("kind", kind.tag()))
            .bind(("payload", row.payload))
            .await
            .map_err(VaultError::transient)?
            .check();

        match checked {
            Ok(_) => Ok(()),
            Err(err) if err.to_string().contains(NOT_FOUND_SENTINEL) => {
                Err(VaultError::not_found(rid))
            },
            Err(err) => Err(VaultError::transient(err)),
        }
    }

    #[instrument(skip_all, fields(owner = %self.username))]
    async fn list(&self) -> Result<Vec<Resource>, VaultError> {
        let rows: Vec<ListRow> = self
            .database
            .query(LIST_RESOURCES)
            .bind(("owner", self.username.clone()))
            .await
            .map_err(VaultError::transient)?
            .check()
            .map_err(VaultError::transient)?
            .take(0)
            .map_err(VaultError::transient)?;

        rows.into_iter()
            .map(|row| {
                Ok(Resource {
                    rid: row.rid,
                    kind: ResourceKind::try_from(row.kind)?,
                    meta: row.meta,
                })
            })
            .collect()
    }
}

async fn stored_password(db: &Database, username: &str) -> Result<Option<String>, VaultError> {
    db.query(PASSWORD_OF)
        .bind(("username", username.to_owned()))
        .await
        .map_err(VaultError::transient)?
        .check()
        .map_err(VaultError::transient)?
        .take(0)
        .map_err(VaultError::transient)
}

async fn blob_location(db: &Database, payload: i64) -> Result<Option<String>, VaultError> {
    db.query(BLOB_LOCATION_OF)
        .bind(("payload", payload))
        .await
        .map_err(VaultError::transient)?
        .check()
        .map_err(VaultError::transient)?
        .take(0)
        .map_err(VaultError::transient)
}

/// Extracts the `RETURN $rid` value of a store transaction.
fn returned_rid(response: &mut surrealdb::IndexedResults) -> Result<ResourceId, VaultError> {
    let last = response.num_statements().saturating_sub(1);
    let rid: Option<i64> = response.take(last).map_err(VaultError::transient)?;
    rid.ok_or_else(|| VaultError::transient("store transaction returned no resource id"))
}
