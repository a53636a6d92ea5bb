//! Session registry: creation, chunk receipt, status, abort and expiry.

use crate::assembly::AssemblyEngine;
use crate::error::{Result, UploadError};
use crate::events::EventBus;
use crate::index::HashIndex;
use crate::session::{Mark, UploadSession};
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use flowpan_core::config::UploadConfig;
use flowpan_core::upload::{
    CreateSessionResponse, ManifestRef, SessionCreated, SessionStatusResponse, UploadChunkResponse,
};
use flowpan_core::{
    ChunkHash, FileCommitted, FileHash, FileManifest, PlanLimits, SessionId, SessionState,
    UploadPlan, UploadTarget,
};
use flowpan_storage::{ChunkStore, PutOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Registry limits and timers.
#[derive(Clone, Debug)]
pub struct RegistrySettings {
    pub limits: PlanLimits,
    pub idle_timeout: Duration,
    pub terminal_retention: Duration,
    pub max_parallel_chunks: u32,
}

impl From<&UploadConfig> for RegistrySettings {
    fn from(config: &UploadConfig) -> Self {
        Self {
            limits: config.plan_limits(),
            idle_timeout: config.idle_timeout(),
            terminal_retention: config.terminal_retention(),
            max_parallel_chunks: config.max_parallel_chunks,
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

/// Result of creating a session.
#[derive(Clone, Debug)]
pub enum CreateOutcome {
    /// Upload chunks into this session.
    Session {
        session: Arc<UploadSession>,
        /// An existing session for the same owner and plan was returned.
        resumed: bool,
    },
    /// The file is already stored; nothing needs to be uploaded.
    InstantComplete(Arc<FileManifest>),
}

impl CreateOutcome {
    pub fn into_response(self, max_parallel_chunks: u32) -> CreateSessionResponse {
        match self {
            Self::Session { session, resumed } => CreateSessionResponse::Session(SessionCreated {
                session_id: session.id(),
                state: session.state(),
                missing_indices: session.missing_indices(),
                resumed,
                max_parallel_chunks,
            }),
            Self::InstantComplete(manifest) => {
                CreateSessionResponse::InstantComplete(ManifestRef::from(manifest.as_ref()))
            }
        }
    }
}

/// Result of receiving one chunk.
#[derive(Clone, Debug)]
pub struct ChunkReceipt {
    pub index: u32,
    /// The index had already been received by this session.
    pub duplicate: bool,
    /// What the chunk store did; `None` when the store was not called.
    pub stored: Option<PutOutcome>,
    /// Bytes received in this request.
    pub size: usize,
    pub state: SessionState,
    /// Set on the receipt that completed the upload.
    pub committed: Option<Arc<FileManifest>>,
}

impl ChunkReceipt {
    pub fn to_response(&self) -> UploadChunkResponse {
        UploadChunkResponse {
            accepted: true,
            index: self.index,
            duplicate: self.duplicate,
            state: self.state,
            committed: self.committed.as_deref().map(ManifestRef::from),
        }
    }
}

/// Counts from one expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Sessions moved to `Expired` by this sweep.
    pub expired: usize,
    /// Terminal sessions dropped from the table.
    pub removed: usize,
}

/// All live upload sessions.
///
/// Sessions sit in a sharded map so that requests for unrelated sessions
/// never contend. A second map tracks the live session for each
/// (owner, file hash) pair so that re-creating an upload resumes it.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<UploadSession>>,
    live: DashMap<(String, FileHash), SessionId>,
    chunks: ChunkStore,
    index: Arc<dyn HashIndex>,
    assembly: AssemblyEngine,
    events: EventBus,
    settings: RegistrySettings,
    /// Expiries not yet handed out by `take_expired`.
    expired: AtomicU64,
}

impl SessionRegistry {
    pub fn new(
        chunks: ChunkStore,
        index: Arc<dyn HashIndex>,
        events: EventBus,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            live: DashMap::new(),
            assembly: AssemblyEngine::new(index.clone(), events.clone()),
            chunks,
            index,
            events,
            settings,
            expired: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn chunk_store(&self) -> &ChunkStore {
        &self.chunks
    }

    pub fn index(&self) -> &Arc<dyn HashIndex> {
        &self.index
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Get a session by id.
    pub fn get(&self, session_id: &SessionId) -> Option<Arc<UploadSession>> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }

    fn session(&self, session_id: SessionId) -> Result<Arc<UploadSession>> {
        self.get(&session_id)
            .ok_or(UploadError::SessionNotFound(session_id))
    }

    /// Number of sessions in the table, terminal ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions that have not reached a terminal state.
    pub fn active_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|e| !e.value().state().is_terminal())
            .count()
    }

    /// Start an upload.
    ///
    /// The plan is validated before anything else. If its file hash is
    /// already committed the upload completes instantly without a session.
    #[tracing::instrument(skip(self, target, plan), fields(file_hash = %plan.file_hash, chunks = plan.chunk_hashes.len()))]
    pub async fn create_session(
        &self,
        owner_id: &str,
        target: UploadTarget,
        plan: UploadPlan,
    ) -> Result<CreateOutcome> {
        plan.validate(&self.settings.limits)?;

        if let Some(manifest) = self.index.lookup(&plan.file_hash).await? {
            if manifest.file_size != plan.file_size || manifest.chunk_hashes != plan.chunk_hashes {
                tracing::warn!("plan contradicts committed manifest");
                return Err(UploadError::IntegrityConflict {
                    file_hash: plan.file_hash,
                });
            }
            tracing::info!(owner_id, "instant upload");
            self.events.publish(FileCommitted::new(
                manifest.file_hash,
                manifest.file_size,
                owner_id,
                &target,
                None,
            ));
            return Ok(CreateOutcome::InstantComplete(manifest));
        }

        let (session, resumed) = self.insert_or_resume(owner_id, target, plan);
        if resumed {
            tracing::info!(session_id = %session.id(), owner_id, "upload session resumed");
            return Ok(CreateOutcome::Session { session, resumed });
        }

        tracing::info!(session_id = %session.id(), owner_id, "upload session created");

        if session.total_chunks() == 0
            && session.transition(SessionState::Created, SessionState::Completing)
        {
            self.assembly.assemble(&session).await?;
        }

        Ok(CreateOutcome::Session { session, resumed })
    }

    fn insert_or_resume(
        &self,
        owner_id: &str,
        target: UploadTarget,
        plan: UploadPlan,
    ) -> (Arc<UploadSession>, bool) {
        let now = Instant::now();
        let key = (owner_id.to_string(), plan.file_hash);

        // Held across the check and insert so that concurrent creates for one
        // (owner, file) agree on a single session.
        match self.live.entry(key) {
            Entry::Occupied(mut slot) => {
                if let Some(existing) = self.get(slot.get()) {
                    self.expire_if_idle(&existing, now);
                    if !existing.state().is_terminal() {
                        if existing.plan().as_ref() == &plan {
                            existing.touch();
                            return (existing, true);
                        }
                        if existing
                            .transition_any(
                                &[SessionState::Created, SessionState::Receiving],
                                SessionState::Aborted,
                            )
                            .is_some()
                        {
                            tracing::info!(
                                superseded = %existing.id(),
                                "upload session superseded by a new plan"
                            );
                        }
                    }
                }
                let session = self.insert(owner_id, target, plan);
                slot.insert(session.id());
                (session, false)
            }
            Entry::Vacant(slot) => {
                let session = self.insert(owner_id, target, plan);
                slot.insert(session.id());
                (session, false)
            }
        }
    }

    fn insert(&self, owner_id: &str, target: UploadTarget, plan: UploadPlan) -> Arc<UploadSession> {
        let session = Arc::new(UploadSession::new(owner_id.to_string(), target, plan));
        self.sessions.insert(session.id(), session.clone());
        session
    }

    /// Accept one chunk of a session.
    ///
    /// The chunk must match the plan's hash and size for `index`. It is
    /// written to the chunk store before the index is marked, so a storage
    /// failure leaves the index missing and the request can be retried.
    #[tracing::instrument(skip(self, hash, data), fields(size = data.len()))]
    pub async fn receive_chunk(
        &self,
        session_id: SessionId,
        index: u32,
        hash: ChunkHash,
        data: Bytes,
    ) -> Result<ChunkReceipt> {
        let session = self.session(session_id)?;
        self.expire_if_idle(&session, Instant::now());

        let state = session.state();
        match state {
            SessionState::Expired => return Err(UploadError::SessionExpired(session_id)),
            SessionState::Aborted | SessionState::Failed => {
                return Err(UploadError::SessionTerminal { session_id, state });
            }
            _ => {}
        }

        let plan = session.plan();
        let total = plan.chunk_count();
        let (Some(expected_hash), Some(expected_size)) = (
            plan.chunk_hashes.get(index as usize),
            plan.expected_chunk_size(index),
        ) else {
            return Err(UploadError::ChunkIndexOutOfRange { index, total });
        };

        if *expected_hash != hash {
            tracing::warn!(index, "chunk hash does not match plan");
            return Err(UploadError::PlanMismatch {
                index,
                expected: *expected_hash,
                actual: hash,
            });
        }

        if data.len() != expected_size as usize {
            return Err(UploadError::ChunkSizeMismatch {
                index,
                expected: expected_size,
                actual: data.len(),
            });
        }

        let size = data.len();
        if session.is_received(index) {
            session.touch();
            return Ok(ChunkReceipt {
                index,
                duplicate: true,
                stored: None,
                size,
                state: session.state(),
                committed: None,
            });
        }

        // Every index of a completing or committed session is received
        if !state.accepts_chunks() {
            return Err(UploadError::SessionTerminal { session_id, state });
        }

        let stored = match self.chunks.put(&hash, data).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = UploadError::from(e);
                if err.is_retryable() {
                    tracing::warn!(index, error = %err, "chunk store write failed");
                } else {
                    tracing::warn!(index, error = %err, "chunk rejected");
                }
                return Err(err);
            }
        };

        let complete = match session.mark_received(index) {
            Mark::Marked { complete } => complete,
            Mark::AlreadyReceived => {
                return Ok(ChunkReceipt {
                    index,
                    duplicate: true,
                    stored: Some(stored),
                    size,
                    state: session.state(),
                    committed: None,
                });
            }
            Mark::Closed(SessionState::Expired) => {
                return Err(UploadError::SessionExpired(session_id));
            }
            Mark::Closed(state) => {
                return Err(UploadError::SessionTerminal { session_id, state });
            }
        };

        tracing::debug!(index, ?stored, "chunk received");

        let committed = if complete
            && session.transition(SessionState::Receiving, SessionState::Completing)
        {
            Some(self.assembly.assemble(&session).await?)
        } else {
            None
        };

        Ok(ChunkReceipt {
            index,
            duplicate: false,
            stored: Some(stored),
            size,
            state: session.state(),
            committed,
        })
    }

    /// Current state and chunk bookkeeping of a session.
    pub fn session_status(&self, session_id: SessionId) -> Result<SessionStatusResponse> {
        let session = self.session(session_id)?;
        self.expire_if_idle(&session, Instant::now());
        Ok(session.status())
    }

    /// Cancel an upload.
    ///
    /// Returns the state after the call. Aborting a session that already
    /// completed or ended is a no-op that reports that state. Stored chunks
    /// are left in place.
    #[tracing::instrument(skip(self))]
    pub fn abort_session(&self, session_id: SessionId) -> Result<SessionState> {
        let session = self.session(session_id)?;
        self.expire_if_idle(&session, Instant::now());

        if session
            .transition_any(
                &[SessionState::Created, SessionState::Receiving],
                SessionState::Aborted,
            )
            .is_some()
        {
            tracing::info!(
                received = session.received_count(),
                total = session.total_chunks(),
                "upload session aborted"
            );
            return Ok(SessionState::Aborted);
        }

        let state = session.state();
        tracing::debug!(state = %state, "abort ignored");
        Ok(state)
    }

    /// Committed manifest for `file_hash`, if any.
    pub async fn lookup_manifest(&self, file_hash: &FileHash) -> Result<Option<Arc<FileManifest>>> {
        self.index.lookup(file_hash).await
    }

    /// Expire idle sessions and drop terminal ones past their retention.
    pub fn sweep(&self) -> SweepStats {
        let now = Instant::now();
        let mut stats = SweepStats::default();

        let snapshot: Vec<Arc<UploadSession>> =
            self.sessions.iter().map(|e| e.value().clone()).collect();

        for session in snapshot {
            if self.expire_if_idle(&session, now) {
                stats.expired += 1;
            }
            if let Some(age) = session.finished_for(now)
                && age >= self.settings.terminal_retention
            {
                self.remove(&session);
                stats.removed += 1;
            }
        }

        stats
    }

    fn expire_if_idle(&self, session: &UploadSession, now: Instant) -> bool {
        let expired = session.expire_if_idle(now, self.settings.idle_timeout);
        if expired {
            self.expired.fetch_add(1, Ordering::Relaxed);
        }
        expired
    }

    /// Sessions expired since the previous call, whether by a sweep or by a
    /// request that found them idle.
    pub fn take_expired(&self) -> u64 {
        self.expired.swap(0, Ordering::Relaxed)
    }

    fn remove(&self, session: &UploadSession) {
        let id = session.id();
        self.sessions.remove(&id);
        self.live.remove_if(
            &(session.owner_id().to_string(), session.plan().file_hash),
            |_, live_id| *live_id == id,
        );
    }
}
