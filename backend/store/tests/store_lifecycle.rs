//! Store lifecycle: creation, listing, rollback, and the integrity and
//! containment guarantees around them.

use patchforge_core::{DiffMeta, DiffResult, DiffSummary, PatchError, PatchRecord};
use patchforge_store::{new_record_id, sha256_hex, PatchStore, SnapshotStore};
use tempfile::TempDir;

fn sample_record(id: &str) -> PatchRecord {
    PatchRecord {
        schema_version: "1.0".to_string(),
        id: id.to_string(),
        file: "notes.txt".to_string(),
        target_path_digest: sha256_hex(b"/workspace/notes.txt"),
        base_digest: sha256_hex(b"old"),
        diff: DiffResult {
            ops: vec![],
            unified: "--- original\n+++ modified".to_string(),
            summary: DiffSummary::default(),
            meta: DiffMeta {
                original_lines: 1,
                modified_lines: 1,
                generated_at: 0,
            },
        },
        timestamp: 0,
    }
}

#[tokio::test]
async fn patch_records_round_trip() {
    let root = TempDir::new().unwrap();
    let store = PatchStore::open(root.path().join("patches")).await.unwrap();

    let id = new_record_id("patch");
    store.create(&sample_record(&id)).await.unwrap();

    let loaded = store.load(&id).await.unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.file, "notes.txt");

    assert_eq!(store.list().await.unwrap(), vec![id.clone()]);

    store.remove(&id).await.unwrap();
    assert!(matches!(
        store.load(&id).await,
        Err(PatchError::NotFound(_))
    ));
}

#[tokio::test]
async fn snapshot_and_rollback_restore_prior_content() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("config.toml");
    tokio::fs::write(&target, "original = true").await.unwrap();

    let store = SnapshotStore::open(root.path(), root.path().join("rollback"))
        .await
        .unwrap();

    let snapshot = store.create("config.toml").await.unwrap();
    tokio::fs::write(&target, "clobbered").await.unwrap();

    let applied = store.rollback(&snapshot.id).await.unwrap();
    assert_eq!(applied, "config.toml");
    assert_eq!(
        tokio::fs::read_to_string(&target).await.unwrap(),
        "original = true"
    );
}

#[tokio::test]
async fn tampered_snapshot_fails_closed() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("data.txt");
    tokio::fs::write(&target, "trusted content").await.unwrap();

    let store = SnapshotStore::open(root.path(), root.path().join("rollback"))
        .await
        .unwrap();
    let snapshot = store.create("data.txt").await.unwrap();

    // Flip one byte of the stored content without updating the checksum.
    let record_path = root.path().join("rollback").join(&snapshot.id);
    let raw = tokio::fs::read_to_string(&record_path).await.unwrap();
    let tampered = raw.replace("trusted content", "trusted_content");
    assert_ne!(raw, tampered);
    tokio::fs::write(&record_path, tampered).await.unwrap();

    tokio::fs::write(&target, "current").await.unwrap();
    assert!(matches!(
        store.rollback(&snapshot.id).await,
        Err(PatchError::IntegrityFailure(_))
    ));
    // The target was never touched with tampered content.
    assert_eq!(
        tokio::fs::read_to_string(&target).await.unwrap(),
        "current"
    );
}

#[tokio::test]
async fn snapshot_refuses_paths_outside_the_root() {
    let root = TempDir::new().unwrap();
    let store = SnapshotStore::open(root.path(), root.path().join("rollback"))
        .await
        .unwrap();

    assert!(matches!(
        store.create("../../etc/passwd").await,
        Err(PatchError::PathTraversal)
    ));

    tokio::fs::create_dir_all(root.path().join("subdir"))
        .await
        .unwrap();
    tokio::fs::write(root.path().join("subdir/file.txt"), "ok")
        .await
        .unwrap();
    assert!(store.create("subdir/file.txt").await.is_ok());
}

#[tokio::test]
async fn listing_exposes_metadata_only() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("secret.txt");
    tokio::fs::write(&target, "do not leak").await.unwrap();

    let store = SnapshotStore::open(root.path(), root.path().join("rollback"))
        .await
        .unwrap();
    let snapshot = store.create("secret.txt").await.unwrap();

    let listing = store.list().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, snapshot.id);
    assert_eq!(listing[0].size_bytes, "do not leak".len());
    assert_eq!(listing[0].checksum, snapshot.checksum);

    let serialized = serde_json::to_string(&listing).unwrap();
    assert!(!serialized.contains("do not leak"));
    assert!(!serialized.contains("originalContent"));
}

#[tokio::test]
async fn orphaned_temp_files_are_invisible_to_readers() {
    let root = TempDir::new().unwrap();
    let store = PatchStore::open(root.path().join("patches")).await.unwrap();

    let id = new_record_id("patch");
    store.create(&sample_record(&id)).await.unwrap();

    // Simulate a crash between temp write and rename: an orphan temp file
    // sits next to the records.
    let orphan = root.path().join("patches").join("patch-0-dead.json.tmp");
    tokio::fs::write(&orphan, "partial").await.unwrap();

    assert_eq!(store.list().await.unwrap(), vec![id]);
}
