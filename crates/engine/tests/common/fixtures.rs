use bytes::Bytes;
use flowpan_core::{FileCommitted, PlanLimits, SessionId, UploadPlan, UploadTarget};
use flowpan_engine::{
    ChunkReceipt, CreateOutcome, EventBus, RegistrySettings, SessionRegistry, UploadSession,
};
use flowpan_storage::{ChunkStore, ObjectStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::mocks::{CountingIndex, InstrumentedBackend};

/// Registry wired to instrumented storage and index.
#[allow(dead_code)]
pub struct TestEngine {
    pub registry: Arc<SessionRegistry>,
    pub backend: Arc<InstrumentedBackend>,
    pub index: Arc<CountingIndex>,
    pub events: broadcast::Receiver<FileCommitted>,
}

#[allow(dead_code)]
impl TestEngine {
    pub fn new() -> Self {
        Self::with_settings(Self::settings())
    }

    /// Small chunks allowed, one minute idle timeout, ten minute retention.
    pub fn settings() -> RegistrySettings {
        RegistrySettings {
            limits: PlanLimits {
                min_chunk_size: 1,
                ..PlanLimits::default()
            },
            idle_timeout: Duration::from_secs(60),
            terminal_retention: Duration::from_secs(600),
            max_parallel_chunks: 4,
        }
    }

    pub fn with_settings(settings: RegistrySettings) -> Self {
        let backend = InstrumentedBackend::new();
        let index = CountingIndex::new();
        let bus = EventBus::new(64);
        let events = bus.subscribe();
        let registry = SessionRegistry::new(
            ChunkStore::new(backend.clone()),
            index.clone(),
            bus,
            settings,
        );
        Self {
            registry: Arc::new(registry),
            backend,
            index,
            events,
        }
    }

    /// Registry over an arbitrary backend.
    pub fn with_backend(backend: Arc<dyn ObjectStore>) -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(
            ChunkStore::new(backend),
            Arc::new(flowpan_engine::InMemoryHashIndex::new()),
            EventBus::new(8),
            Self::settings(),
        ))
    }

    /// Drain events published so far.
    pub fn take_events(&mut self) -> Vec<FileCommitted> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

#[allow(dead_code)]
pub fn target(name: &str) -> UploadTarget {
    UploadTarget {
        name: name.to_string(),
        parent_id: Some("root".to_string()),
    }
}

#[allow(dead_code)]
pub fn expect_session(outcome: CreateOutcome) -> (Arc<UploadSession>, bool) {
    match outcome {
        CreateOutcome::Session { session, resumed } => (session, resumed),
        CreateOutcome::InstantComplete(m) => panic!("expected a session, got instant {m:?}"),
    }
}

/// Send the chunks of `data` in the given index order; returns the receipts.
#[allow(dead_code)]
pub async fn upload_in_order(
    registry: &SessionRegistry,
    session_id: SessionId,
    plan: &UploadPlan,
    data: &[u8],
    order: &[u32],
) -> Vec<ChunkReceipt> {
    let mut receipts = Vec::new();
    for &index in order {
        let meta = plan.chunk_meta(index).unwrap();
        let start = meta.offset as usize;
        let bytes = Bytes::copy_from_slice(&data[start..start + meta.size as usize]);
        receipts.push(
            registry
                .receive_chunk(session_id, index, meta.hash, bytes)
                .await
                .unwrap(),
        );
    }
    receipts
}

/// Generate deterministic test data using a seeded pseudo-random generator.
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    let mut state = seed;

    // Simple LCG (Linear Congruential Generator)
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    data
}
