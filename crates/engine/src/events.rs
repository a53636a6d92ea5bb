//! Broadcast of committed files to downstream collaborators.

use flowpan_core::FileCommitted;
use tokio::sync::broadcast;

/// Fan-out channel for [`FileCommitted`] events.
///
/// The file tree and the transcoding trigger each hold a receiver. Slow
/// receivers lag and miss events rather than blocking uploads.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FileCommitted>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FileCommitted> {
        self.sender.subscribe()
    }

    /// Publish an event; returns how many receivers got it.
    pub fn publish(&self, event: FileCommitted) -> usize {
        tracing::info!(
            file_hash = %event.file_hash,
            owner_id = %event.owner_id,
            name = %event.name,
            instant = event.instant,
            "file committed"
        );
        // No receivers is fine
        self.sender.send(event).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
