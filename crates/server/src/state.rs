//! Application state shared across handlers.

use flowpan_core::config::AppConfig;
use flowpan_engine::{EventBus, HashIndex, InMemoryHashIndex, RegistrySettings, SessionRegistry};
use flowpan_storage::{ChunkStore, ObjectStore};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Upload sessions, chunk store and hash index.
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    /// Create a new application state with an in-process hash index.
    pub fn new(config: AppConfig, storage: Arc<dyn ObjectStore>) -> Self {
        Self::with_index(config, storage, Arc::new(InMemoryHashIndex::new()))
    }

    /// Create a new application state over an existing hash index.
    pub fn with_index(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        index: Arc<dyn HashIndex>,
    ) -> Self {
        let events = EventBus::new(config.upload.event_channel_capacity);
        let registry = SessionRegistry::new(
            ChunkStore::new(storage),
            index,
            events,
            RegistrySettings::from(&config.upload),
        );
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
        }
    }

    pub fn chunk_store(&self) -> &ChunkStore {
        self.registry.chunk_store()
    }

    pub fn events(&self) -> &EventBus {
        self.registry.events()
    }
}
