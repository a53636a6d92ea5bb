// Chunk store behavior over real backends: dedup, concurrent writers and
// failure classification.

mod common;

use common::{FailingBackend, InstrumentedBackend, seeded_bytes};
use flowpan_core::ChunkHash;
use flowpan_core::chunk::split_into_chunks;
use flowpan_storage::{ChunkStore, FilesystemBackend, ObjectStore, PutOutcome, StorageError};
use futures::future::join_all;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_concurrent_same_chunk_filesystem() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FilesystemBackend::new(temp_dir.path()).await.unwrap();
    let store = ChunkStore::new(Arc::new(backend));

    let data = seeded_bytes(1, 64 * 1024);
    let hash = ChunkHash::compute(&data);

    let results = join_all((0..16).map(|_| {
        let store = store.clone();
        let data = data.clone();
        async move { store.put(&hash, data).await.unwrap() }
    }))
    .await;

    let stored = results
        .iter()
        .filter(|outcome| **outcome == PutOutcome::Stored)
        .count();
    assert_eq!(stored, 1);
    assert_eq!(store.get(&hash).await.unwrap(), data);
}

#[tokio::test]
async fn test_identical_chunks_across_files_stored_once() {
    let backend = InstrumentedBackend::new();
    let store = ChunkStore::new(backend.clone());

    // Two files that share their first 8 bytes of content.
    let shared = seeded_bytes(42, 8);
    let mut a = shared.to_vec();
    a.extend_from_slice(b"tail-a");
    let mut b = shared.to_vec();
    b.extend_from_slice(b"tail-b");

    for file in [&a, &b] {
        for (meta, bytes) in split_into_chunks(file, 8) {
            store
                .put(&meta.hash, bytes::Bytes::copy_from_slice(bytes))
                .await
                .unwrap();
        }
    }

    assert_eq!(backend.put_count(), 4);
    assert_eq!(backend.created_count(), 3);
}

#[tokio::test]
async fn test_hash_mismatch_never_reaches_backend() {
    let backend = InstrumentedBackend::new();
    let store = ChunkStore::new(backend.clone());

    let hash = ChunkHash::compute(b"expected");
    let err = store
        .put(&hash, bytes::Bytes::from_static(b"tampered"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::HashMismatch { .. }));
    assert_eq!(backend.put_count(), 0);
}

#[tokio::test]
async fn test_backend_failure_is_transient() {
    let store = ChunkStore::new(Arc::new(FailingBackend));
    let data = bytes::Bytes::from_static(b"payload");
    let hash = ChunkHash::compute(&data);

    let err = store.put(&hash, data).await.unwrap_err();
    assert!(err.is_transient());
    assert!(store.health_check().await.is_err());
}

#[tokio::test]
async fn test_filesystem_layout_uses_hash_prefixes() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FilesystemBackend::new(temp_dir.path()).await.unwrap());
    let store = ChunkStore::new(backend.clone());

    let data = bytes::Bytes::from_static(b"layout");
    let hash = ChunkHash::compute(&data);
    store.put(&hash, data).await.unwrap();

    let hex = hash.to_hex();
    let expected = temp_dir
        .path()
        .join("chunks")
        .join(&hex[..2])
        .join(&hex[2..4])
        .join(&hex);
    assert!(expected.is_file());
    assert!(backend.exists(&hash.to_object_key()).await.unwrap());
}
