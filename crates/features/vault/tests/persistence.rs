//! The persistent backend, exercised end to end against an in-process
//! `mem://` SurrealDB engine and a temporary blob directory.

use lockbox_database::Database;
use lockbox_domain::config::HashConfig;
use lockbox_kernel::gate;
use lockbox_storage::BlobStore;
use lockbox_vault::{
    Blob, Credential, Encrypted, Identity, Piece, Repository, ResourceKind, SecretHasher,
    TokenSource, Vault, VaultError,
};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

const PASSWORD: &str = "qwerty";

struct Fixture {
    vault: Encrypted<Repository>,
    store: BlobStore,
    _temp: TempDir,
}

async fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let store = BlobStore::builder().root(temp.path().join("blobs")).connect().await.unwrap();

    let database =
        Database::builder().url("mem://").session("lockbox", "test").init().await.unwrap();
    let (handle, gate) = gate::gate();
    handle.set(database);

    let tokens = TokenSource::new(b"test-secret", Duration::from_secs(3600), 0);
    let hasher = SecretHasher::new(&HashConfig { m_cost: 8, t_cost: 1, p_cost: 1 }).unwrap();

    let repository = Repository::new(gate, store.clone(), tokens, hasher);
    Fixture { vault: Encrypted::new(repository), store, _temp: temp }
}

async fn identity_for(vault: &dyn Vault, username: &str) -> Box<dyn Identity> {
    let credential = Credential { username: username.to_owned(), password: PASSWORD.to_owned() };
    vault.register(credential.clone()).await.expect("register");
    let token = vault.authenticate(credential).await.expect("authenticate");
    vault.identity(&token).await.expect("identity")
}

fn blob_files(store: &BlobStore) -> Vec<String> {
    std::fs::read_dir(store.root())
        .unwrap()
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn register_authenticate_identity_flow() {
    let fx = fixture().await;

    let credential = Credential { username: "test".to_owned(), password: PASSWORD.to_owned() };
    fx.vault.register(credential.clone()).await.unwrap();

    let err = fx.vault.register(credential.clone()).await.unwrap_err();
    assert!(matches!(err, VaultError::DuplicateIdentity { .. }));

    let token = fx.vault.authenticate(credential).await.unwrap();
    fx.vault.identity(&token).await.unwrap();

    let err = fx
        .vault
        .authenticate(Credential { username: "test".to_owned(), password: "wrong".to_owned() })
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::BadCredential { .. }));

    // An unknown identity reads exactly the same as a wrong password.
    let err = fx
        .vault
        .authenticate(Credential { username: "ghost".to_owned(), password: PASSWORD.to_owned() })
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::BadCredential { .. }));
}

#[tokio::test]
async fn piece_roundtrip_with_monotonic_rids() {
    let fx = fixture().await;
    let identity = identity_for(&fx.vault, "test").await;

    let first = identity
        .store_piece(Piece { meta: "m1".to_owned(), content: b"one".to_vec() }, PASSWORD)
        .await
        .unwrap();
    let second = identity
        .store_piece(Piece { meta: "m2".to_owned(), content: b"two".to_vec() }, PASSWORD)
        .await
        .unwrap();
    assert!(second > first, "resource ids must be monotonic");

    let restored = identity.restore_piece(first, PASSWORD).await.unwrap();
    assert_eq!(restored, Piece { meta: "m1".to_owned(), content: b"one".to_vec() });
}

#[tokio::test]
async fn blob_roundtrip_and_file_lifecycle() {
    let fx = fixture().await;
    let identity = identity_for(&fx.vault, "test").await;

    let content = b"Hello, World!".to_vec();
    let blob =
        Blob { meta: "m2".to_owned(), content: Box::new(std::io::Cursor::new(content.clone())) };
    let rid = identity.store_blob(blob, PASSWORD).await.unwrap();

    let files = blob_files(&fx.store);
    assert_eq!(files.len(), 1, "one committed blob file");

    // The file on disk is ciphertext, not the plaintext payload.
    let on_disk = std::fs::read(fx.store.root().join(&files[0])).unwrap();
    assert_ne!(on_disk, content);
    assert_eq!(on_disk.len(), content.len(), "stream mode is length-preserving");

    let restored = identity.restore_blob(rid, PASSWORD).await.unwrap();
    let mut read_back = Vec::new();
    let mut stream = restored.content;
    stream.read_to_end(&mut read_back).await.unwrap();
    assert_eq!(restored.meta, "m2");
    assert_eq!(read_back, content);

    identity.delete(rid).await.unwrap();
    assert!(blob_files(&fx.store).is_empty(), "delete removes the blob file");

    let err = identity.restore_blob(rid, PASSWORD).await.unwrap_err();
    assert!(matches!(err, VaultError::ResourceNotFound { .. }));
}

#[tokio::test]
async fn list_spans_both_kinds() {
    let fx = fixture().await;
    let identity = identity_for(&fx.vault, "test").await;

    identity
        .store_piece(Piece { meta: "p".to_owned(), content: b"x".to_vec() }, PASSWORD)
        .await
        .unwrap();
    identity
        .store_blob(
            Blob { meta: "b".to_owned(), content: Box::new(std::io::Cursor::new(vec![1])) },
            PASSWORD,
        )
        .await
        .unwrap();

    let mut listed = identity.list().await.unwrap();
    listed.sort_by_key(|resource| resource.rid);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].kind, ResourceKind::Piece);
    assert_eq!(listed[0].meta, "p");
    assert_eq!(listed[1].kind, ResourceKind::Blob);
    assert_eq!(listed[1].meta, "b");
}

#[tokio::test]
async fn owners_cannot_reach_each_other() {
    let fx = fixture().await;
    let alice = identity_for(&fx.vault, "alice").await;
    let mallory = identity_for(&fx.vault, "mallory").await;

    let rid = alice
        .store_piece(Piece { meta: "m".to_owned(), content: b"s".to_vec() }, PASSWORD)
        .await
        .unwrap();

    let err = mallory.restore_piece(rid, PASSWORD).await.unwrap_err();
    assert!(matches!(err, VaultError::ResourceNotFound { .. }));
    let err = mallory.delete(rid).await.unwrap_err();
    assert!(matches!(err, VaultError::ResourceNotFound { .. }));
    assert!(mallory.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn wrong_vault_password_is_rejected_per_operation() {
    let fx = fixture().await;
    let identity = identity_for(&fx.vault, "test").await;

    let rid = identity
        .store_piece(Piece { meta: "m".to_owned(), content: b"s".to_vec() }, PASSWORD)
        .await
        .unwrap();

    for result in [
        identity.restore_piece(rid, "wrong").await.err(),
        identity
            .store_piece(Piece { meta: "m".to_owned(), content: b"s".to_vec() }, "wrong")
            .await
            .err(),
        identity.restore_blob(rid, "wrong").await.err(),
    ] {
        assert!(matches!(result, Some(VaultError::BadCredential { .. })));
    }
}

#[tokio::test]
async fn missing_blob_file_reads_as_transient() {
    let fx = fixture().await;
    let identity = identity_for(&fx.vault, "test").await;

    let rid = identity
        .store_blob(
            Blob { meta: "b".to_owned(), content: Box::new(std::io::Cursor::new(vec![1, 2])) },
            PASSWORD,
        )
        .await
        .unwrap();

    // Simulate the documented delete skew: the file vanished, the row
    // stayed behind.
    for file in blob_files(&fx.store) {
        std::fs::remove_file(fx.store.root().join(file)).unwrap();
    }

    let err = identity.restore_blob(rid, PASSWORD).await.unwrap_err();
    assert!(matches!(err, VaultError::Transient { .. }));

    // The dangling row can still be deleted.
    identity.delete(rid).await.unwrap();
    let err = identity.restore_blob(rid, PASSWORD).await.unwrap_err();
    assert!(matches!(err, VaultError::ResourceNotFound { .. }));
}

#[tokio::test]
async fn failed_upload_stream_leaves_no_partial_file() {
    let fx = fixture().await;
    let identity = identity_for(&fx.vault, "test").await;

    struct FailingStream;
    impl tokio::io::AsyncRead for FailingStream {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("upload interrupted")))
        }
    }

    let blob = Blob { meta: "broken".to_owned(), content: Box::new(FailingStream) };
    let err = identity.store_blob(blob, PASSWORD).await.unwrap_err();
    assert!(matches!(err, VaultError::Transient { .. }));

    assert!(blob_files(&fx.store).is_empty(), "failed upload must clean up after itself");
    assert!(identity.list().await.unwrap().is_empty(), "no rows for a failed upload");
}
