use crate::engine::PARTIAL_SUFFIX;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

/// Partial files younger than this may belong to a live upload.
const STALE_THRESHOLD: Duration = Duration::from_secs(300);

/// Removes stale partial upload files left behind by a crash.
pub(crate) async fn sweep(root: &Path) {
    let (removed, failed) = sweep_with(root, STALE_THRESHOLD).await;
    if removed > 0 || failed > 0 {
        info!(removed, failed, "Cleaned up partial blob uploads");
    }
}

async fn sweep_with(root: &Path, threshold: Duration) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;
    let now = SystemTime::now();

    let Ok(mut entries) = tokio::fs::read_dir(root).await else {
        warn!(path = %root.display(), "Blob root could not be scanned for stale uploads");
        return (0, 1);
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_partial = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(PARTIAL_SUFFIX));
        if !is_partial || !is_stale(&entry, now, threshold).await {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to remove stale upload");
                failed += 1;
            },
        }
    }

    (removed, failed)
}

async fn is_stale(entry: &tokio::fs::DirEntry, now: SystemTime, threshold: Duration) -> bool {
    let Ok(metadata) = entry.metadata().await else {
        return true;
    };
    if !metadata.is_file() {
        return false;
    }
    metadata
        .modified()
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .is_none_or(|age| age >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweep_removes_partials_and_keeps_blobs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();

        std::fs::write(root.join("abc123"), b"committed blob").unwrap();
        std::fs::write(root.join("dead.partial"), b"half an upload").unwrap();

        let (removed, failed) = sweep_with(root, Duration::ZERO).await;

        assert_eq!((removed, failed), (1, 0));
        assert!(root.join("abc123").exists());
        assert!(!root.join("dead.partial").exists());
    }
}
