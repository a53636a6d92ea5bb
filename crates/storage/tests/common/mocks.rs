use async_trait::async_trait;
use bytes::Bytes;
use flowpan_storage::error::{StorageError, StorageResult};
use flowpan_storage::traits::ObjectStore;
use flowpan_storage::MemoryBackend;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory backend that counts calls, for asserting how often storage is hit.
#[allow(dead_code)]
#[derive(Default)]
pub struct InstrumentedBackend {
    inner: MemoryBackend,
    pub puts: AtomicUsize,
    pub created: AtomicUsize,
    pub gets: AtomicUsize,
}

#[allow(dead_code)]
impl InstrumentedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InstrumentedBackend {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        self.puts.fetch_add(1, Ordering::SeqCst);
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

/// Backend whose writes always fail with an I/O error.
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

    async fn health_check(&self) -> StorageResult<()> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }
}
