//! Per-upload session state.

use flowpan_core::upload::{ManifestRef, SessionStatusResponse};
use flowpan_core::{FileManifest, SessionId, SessionState, UploadPlan, UploadTarget};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::Instant;

/// Result of marking a chunk as received.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    /// The index was newly marked. `complete` is set for the mark that
    /// filled the last slot.
    Marked { complete: bool },
    /// The index had already been received.
    AlreadyReceived,
    /// The session no longer accepts chunks.
    Closed(SessionState),
}

struct Progress {
    received: Vec<bool>,
    received_count: u32,
    last_activity: Instant,
    finished_at: Option<Instant>,
}

/// One in-progress chunked upload.
///
/// Identity and plan are immutable. The lifecycle state is an atomic that
/// only moves through compare-and-swap, so exactly one caller wins each
/// transition. Received indices and timestamps sit behind a short-lived
/// mutex that is never held across an await point.
pub struct UploadSession {
    id: SessionId,
    owner_id: String,
    target: UploadTarget,
    plan: Arc<UploadPlan>,
    created_at: OffsetDateTime,
    state: AtomicU8,
    progress: Mutex<Progress>,
    manifest: OnceLock<Arc<FileManifest>>,
    failure: OnceLock<&'static str>,
}

impl UploadSession {
    pub fn new(owner_id: String, target: UploadTarget, plan: UploadPlan) -> Self {
        let count = plan.chunk_count() as usize;
        Self {
            id: SessionId::new(),
            owner_id,
            target,
            plan: Arc::new(plan),
            created_at: OffsetDateTime::now_utc(),
            state: AtomicU8::new(SessionState::Created as u8),
            progress: Mutex::new(Progress {
                received: vec![false; count],
                received_count: 0,
                last_activity: Instant::now(),
                finished_at: None,
            }),
            manifest: OnceLock::new(),
            failure: OnceLock::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    pub fn plan(&self) -> &Arc<UploadPlan> {
        &self.plan
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn total_chunks(&self) -> u32 {
        self.plan.chunk_count()
    }

    pub fn state(&self) -> SessionState {
        // Only valid discriminants are ever stored
        SessionState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(SessionState::Failed)
    }

    /// Move from `from` to `to` if the session is still in `from`.
    ///
    /// Returns `false` if another transition got there first.
    pub fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let won = self.swap_state(from, to);
        if won && to.is_terminal() {
            self.lock().finished_at = Some(Instant::now());
        }
        won
    }

    /// `transition` for callers already holding the progress lock.
    fn transition_locked(
        &self,
        progress: &mut Progress,
        from: SessionState,
        to: SessionState,
    ) -> bool {
        let won = self.swap_state(from, to);
        if won && to.is_terminal() {
            progress.finished_at = Some(Instant::now());
        }
        won
    }

    fn swap_state(&self, from: SessionState, to: SessionState) -> bool {
        let won = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            tracing::debug!(session_id = %self.id, from = %from, to = %to, "session transition");
        }
        won
    }

    /// Move to `to` from whichever of `from` the session is in.
    ///
    /// Returns the state the session was in when the transition won.
    pub fn transition_any(&self, from: &[SessionState], to: SessionState) -> Option<SessionState> {
        loop {
            let current = self.state();
            if !from.contains(&current) {
                return None;
            }
            if self.transition(current, to) {
                return Some(current);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        // A poisoned lock only means another thread panicked mid-update of
        // plain counters; the data is still usable.
        self.progress.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_received(&self, index: u32) -> bool {
        self.lock()
            .received
            .get(index as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Record chunk `index` as durably stored.
    pub fn mark_received(&self, index: u32) -> Mark {
        let mut progress = self.lock();

        let state = self.state();
        if !state.accepts_chunks() {
            return Mark::Closed(state);
        }

        let Some(slot) = progress.received.get_mut(index as usize) else {
            return Mark::Closed(state);
        };
        if *slot {
            progress.last_activity = Instant::now();
            return Mark::AlreadyReceived;
        }
        *slot = true;
        progress.received_count += 1;
        progress.last_activity = Instant::now();

        // First chunk; a concurrent abort may already have won
        self.transition(SessionState::Created, SessionState::Receiving);

        Mark::Marked {
            complete: progress.received_count == self.total_chunks(),
        }
    }

    /// Refresh the idle timer.
    pub fn touch(&self) {
        self.lock().last_activity = Instant::now();
    }

    pub fn received_count(&self) -> u32 {
        self.lock().received_count
    }

    pub fn received_indices(&self) -> Vec<u32> {
        let progress = self.lock();
        indices_where(&progress.received, true)
    }

    pub fn missing_indices(&self) -> Vec<u32> {
        let progress = self.lock();
        indices_where(&progress.received, false)
    }

    /// Time since the session reached a terminal state, if it has.
    pub fn finished_for(&self, now: Instant) -> Option<Duration> {
        self.lock()
            .finished_at
            .map(|at| now.saturating_duration_since(at))
    }

    /// Expire the session if it is still open and idle longer than `timeout`.
    ///
    /// Returns `true` if this call expired it.
    pub fn expire_if_idle(&self, now: Instant, timeout: Duration) -> bool {
        // Held across the idle check and the state change so that a chunk
        // marked in between either refreshes activity first or sees `Expired`.
        let mut progress = self.lock();
        if now.saturating_duration_since(progress.last_activity) < timeout {
            return false;
        }
        let expired = [SessionState::Created, SessionState::Receiving]
            .into_iter()
            .any(|from| self.transition_locked(&mut progress, from, SessionState::Expired));
        drop(progress);
        if expired {
            tracing::info!(session_id = %self.id, "upload session expired");
        }
        expired
    }

    pub fn manifest(&self) -> Option<&Arc<FileManifest>> {
        self.manifest.get()
    }

    pub(crate) fn set_manifest(&self, manifest: Arc<FileManifest>) {
        let _ = self.manifest.set(manifest);
    }

    /// Error code of a failed assembly.
    pub fn failure(&self) -> Option<&'static str> {
        self.failure.get().copied()
    }

    pub(crate) fn set_failure(&self, code: &'static str) {
        let _ = self.failure.set(code);
    }

    /// Snapshot for status queries.
    pub fn status(&self) -> SessionStatusResponse {
        let (received_indices, missing_indices) = {
            let progress = self.lock();
            (
                indices_where(&progress.received, true),
                indices_where(&progress.received, false),
            )
        };
        let state = self.state();
        SessionStatusResponse {
            session_id: self.id,
            state,
            task_status: state.task_status(),
            received_indices,
            missing_indices,
            total_chunks: self.total_chunks(),
            manifest: self.manifest().map(|m| ManifestRef::from(m.as_ref())),
            error_code: self.failure().map(str::to_string),
        }
    }
}

fn indices_where(received: &[bool], value: bool) -> Vec<u32> {
    received
        .iter()
        .enumerate()
        .filter(|(_, r)| **r == value)
        .map(|(i, _)| i as u32)
        .collect()
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("file_hash", &self.plan.file_hash)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
