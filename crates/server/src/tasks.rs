//! Background tasks: session expiry and the committed-file consumer.

use crate::metrics::{ACTIVE_UPLOAD_SESSIONS, record_expired_sessions};
use flowpan_core::FileCommitted;
use flowpan_engine::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Spawn the expiry sweeper.
///
/// Every `interval` it expires idle sessions and drops terminal sessions
/// past their retention. Missed ticks are skipped rather than bunched.
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let stats = registry.sweep();
            record_expired_sessions(&registry);
            ACTIVE_UPLOAD_SESSIONS.set(registry.active_count() as i64);
            if stats.expired > 0 || stats.removed > 0 {
                tracing::info!(
                    expired = stats.expired,
                    removed = stats.removed,
                    remaining = registry.len(),
                    "upload session sweep finished"
                );
            }
        }
    })
}

/// Spawn the consumer that hands committed files to downstream collaborators.
///
/// File-tree and transcoding services live outside this process; the
/// consumer records each event and flags the ones that need a transcode.
/// Returns once every sender has been dropped.
pub fn spawn_event_logger(
    mut receiver: broadcast::Receiver<FileCommitted>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => log_committed(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "committed-file consumer lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("committed-file channel closed");
                    return;
                }
            }
        }
    })
}

fn log_committed(event: &FileCommitted) {
    tracing::info!(
        file_hash = %event.file_hash,
        owner_id = %event.owner_id,
        parent_id = ?event.parent_id,
        name = %event.name,
        category = ?event.category,
        instant = event.instant,
        "file-tree entry requested"
    );
    if event.needs_transcode {
        tracing::info!(
            file_hash = %event.file_hash,
            name = %event.name,
            "transcode requested"
        );
    }
}
