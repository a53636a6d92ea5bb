//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use flowpan_core::config::{AppConfig, StorageConfig};
use flowpan_server::{AppState, create_router};
use flowpan_storage::{FilesystemBackend, MemoryBackend, ObjectStore};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server over in-memory storage.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create an in-memory test server with custom config modifications.
    pub fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = AppConfig::for_testing();
        modifier(&mut config);

        let storage: Arc<dyn ObjectStore> = Arc::new(MemoryBackend::new());
        Self::build(config, storage, None)
    }

    /// Create a test server over filesystem storage in a temporary directory.
    pub async fn with_filesystem() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_path = temp_dir.path().join("chunks");

        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );

        let config = AppConfig {
            storage: StorageConfig::Filesystem { path: storage_path },
            ..AppConfig::for_testing()
        };
        Self::build(config, storage, Some(temp_dir))
    }

    fn build(config: AppConfig, storage: Arc<dyn ObjectStore>, temp_dir: Option<TempDir>) -> Self {
        let state = AppState::new(config, storage);
        let router = create_router(state.clone());
        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request with an optional JSON body and parse the JSON reply.
    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let request = builder.body(body).unwrap();
        let (status, bytes) = self.send(request).await;

        let json: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// PUT raw chunk bytes and parse the JSON reply.
    pub async fn put_chunk(&self, uri: &str, data: Bytes) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header("Content-Type", "application/octet-stream")
            .body(Body::from(data))
            .unwrap();
        let (status, bytes) = self.send(request).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Send a request and return the raw reply body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }
}
