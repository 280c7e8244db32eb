//! Filesystem store tests
//!
//! Exercise the on-disk layout, atomic replacement and presigned links of
//! [`FsArtifactStore`] against a temporary root directory.

use chrono::Utc;
use dcv_artifact::{ArtifactKey, ArtifactStore, FsArtifactStore, Presigner, StoreError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const RID: &str = "5a1b2c3d-1111-2222-3333-444455556666";

fn store_in(dir: &TempDir) -> FsArtifactStore {
    let presigner = Presigner::new("https://objects.example.org", "previews", b"fs test secret");
    FsArtifactStore::new(dir.path(), presigner)
}

#[tokio::test]
async fn upload_lands_at_sharded_path() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let key = ArtifactKey::preview(RID).unwrap();

    store.upload(&key, b"jpeg bytes", false).await.unwrap();

    let expected = dir
        .path()
        .join("previews/preview/5a1/b2c/3d-1111-2222-3333-444455556666");
    assert_eq!(store.object_path(&key), expected);
    assert_eq!(std::fs::read(&expected).unwrap(), b"jpeg bytes");
    assert!(store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn upload_without_overwrite_keeps_first_object() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let key = ArtifactKey::preview(RID).unwrap();

    store.upload(&key, b"first", false).await.unwrap();
    let err = store.upload(&key, b"second", false).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
    assert_eq!(store.read(&key).await.unwrap(), b"first");

    store.upload(&key, b"second", true).await.unwrap();
    assert_eq!(store.read(&key).await.unwrap(), b"second");
}

#[tokio::test]
async fn no_temporary_files_remain_after_upload() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let key = ArtifactKey::preview(RID).unwrap();

    store.upload(&key, b"a", false).await.unwrap();
    store.upload(&key, b"b", true).await.unwrap();

    let parent = store.object_path(&key).parent().unwrap().to_path_buf();
    let names: Vec<String> = std::fs::read_dir(parent)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["3d-1111-2222-3333-444455556666".to_string()]);
}

#[tokio::test]
async fn missing_root_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let presigner = Presigner::new("https://objects.example.org", "previews", b"s");
    let store = FsArtifactStore::new(dir.path().join("does-not-exist"), presigner);
    let key = ArtifactKey::preview(RID).unwrap();

    assert!(!store.is_available().await);
    assert!(matches!(
        store.upload(&key, b"x", true).await,
        Err(StoreError::Unavailable(_))
    ));
}

#[tokio::test]
async fn presigned_url_verifies_with_same_signer() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let key = ArtifactKey::preview(RID).unwrap();

    assert!(matches!(
        store.presigned_url(&key, "beads_preview.jpg", 3600).await,
        Err(StoreError::NotFound(_))
    ));

    store.upload(&key, b"x", false).await.unwrap();
    let url = store
        .presigned_url(&key, "beads_preview.jpg", 3600)
        .await
        .unwrap();
    assert!(url.starts_with(
        "https://objects.example.org/previews/preview/5a1/b2c/3d-1111-2222-3333-444455556666?"
    ));

    let verifier = Presigner::new("https://objects.example.org", "previews", b"fs test secret");
    let link = verifier.verify_at(&url, Utc::now()).unwrap();
    assert_eq!(link.object_name, key.object_name());
    assert_eq!(link.filename, "beads_preview.jpg");
}
