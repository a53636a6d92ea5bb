use async_trait::async_trait;
use bytes::Bytes;
use flowpan_core::{FileHash, FileManifest};
use flowpan_engine::{HashIndex, InMemoryHashIndex, RegisterOutcome};
use flowpan_storage::error::{StorageError, StorageResult};
use flowpan_storage::{MemoryBackend, ObjectStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory backend that counts writes.
#[allow(dead_code)]
#[derive(Default)]
pub struct InstrumentedBackend {
    inner: MemoryBackend,
    puts: AtomicUsize,
    created: AtomicUsize,
}

#[allow(dead_code)]
impl InstrumentedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Calls to `put_if_not_exists`.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Objects actually written.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InstrumentedBackend {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        // Widen the window between storing and marking for race tests
        tokio::task::yield_now().await;
        let created = self.inner.put_if_not_exists(key, data).await?;
        if created {
            self.created.fetch_add(1, Ordering::SeqCst);
        }
        Ok(created)
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

/// Backend whose writes fail with an I/O error.
#[allow(dead_code)]
#[derive(Default)]
pub struct FailingBackend;

#[async_trait]
impl ObjectStore for FailingBackend {
    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn put_if_not_exists(&self, _key: &str, _data: Bytes) -> StorageResult<bool> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Hash index that counts lookups and registrations.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingIndex {
    pub inner: InMemoryHashIndex,
    lookups: AtomicUsize,
    registers: AtomicUsize,
}

#[allow(dead_code)]
impl CountingIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn register_count(&self) -> usize {
        self.registers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HashIndex for CountingIndex {
    async fn lookup(&self, file_hash: &FileHash) -> flowpan_engine::Result<Option<Arc<FileManifest>>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(file_hash).await
    }

    async fn register(&self, manifest: FileManifest) -> flowpan_engine::Result<RegisterOutcome> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        self.inner.register(manifest).await
    }

    async fn len(&self) -> flowpan_engine::Result<usize> {
        self.inner.len().await
    }
}
