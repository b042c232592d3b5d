use lockbox_storage::{BlobStore, StorageError};
use tempfile::TempDir;

async fn store(temp: &TempDir) -> BlobStore {
    BlobStore::builder().root(temp.path().join("blobs")).connect().await.unwrap()
}

#[tokio::test]
async fn upload_commit_read_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp).await;

    let mut pending = store.create().await.unwrap();
    let written = pending.fill_from(&mut b"ciphertext bytes".as_slice()).await.unwrap();
    assert_eq!(written, 16);
    let name = pending.commit().await.unwrap();

    let mut file = store.open(&name).await.unwrap();
    let mut content = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut file, &mut content).await.unwrap();
    assert_eq!(content, b"ciphertext bytes");
}

#[tokio::test]
async fn dropped_upload_leaves_no_file() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp).await;

    let name = {
        let mut pending = store.create().await.unwrap();
        pending.fill_from(&mut b"abandoned".as_slice()).await.unwrap();
        pending.name().to_owned()
        // guard dropped here without commit
    };

    assert!(!store.exists(&name).unwrap());
    let leftovers: Vec<_> = std::fs::read_dir(store.root()).unwrap().flatten().collect();
    assert!(leftovers.is_empty(), "no partial file may survive an abandoned upload");
}

#[tokio::test]
async fn names_are_fresh_per_upload() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp).await;

    let a = store.create().await.unwrap();
    let b = store.create().await.unwrap();
    assert_ne!(a.name(), b.name());
}

#[tokio::test]
async fn open_missing_blob_is_file_not_found() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp).await;

    let err = store.open("00000000-0000-0000-0000-000000000000").await.unwrap_err();
    assert!(matches!(err, StorageError::FileNotFound { .. }));
}

#[tokio::test]
async fn remove_is_tolerant_of_missing_files() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp).await;

    let mut pending = store.create().await.unwrap();
    pending.fill_from(&mut b"x".as_slice()).await.unwrap();
    let name = pending.commit().await.unwrap();

    assert!(store.remove(&name).await.unwrap());
    assert!(!store.remove(&name).await.unwrap(), "second removal reports the file as gone");
}

#[tokio::test]
async fn navigating_names_are_rejected() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp).await;

    for name in ["../escape", "a/b", "..", "", "sneaky.partial"] {
        let err = store.resolve(name).unwrap_err();
        assert!(matches!(err, StorageError::InvalidName { .. }), "{name:?} must be rejected");
    }
}

#[tokio::test]
async fn connect_sweeps_nothing_fresh_but_reports_existing_blobs() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("blobs");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("keepme"), b"blob").unwrap();

    let store = BlobStore::builder().root(&root).connect().await.unwrap();
    assert!(store.exists("keepme").unwrap());
}
