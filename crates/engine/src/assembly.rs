//! Manifest assembly for fully received sessions.

use crate::error::{Result, UploadError};
use crate::events::EventBus;
use crate::index::{HashIndex, RegisterOutcome};
use crate::session::UploadSession;
use flowpan_core::{FileCommitted, FileHash, FileManifest, SessionState};
use std::sync::Arc;

/// Turns a completed session into a committed manifest.
#[derive(Clone)]
pub struct AssemblyEngine {
    index: Arc<dyn HashIndex>,
    events: EventBus,
}

impl AssemblyEngine {
    pub fn new(index: Arc<dyn HashIndex>, events: EventBus) -> Self {
        Self { index, events }
    }

    /// Assemble a session that has just moved to `Completing`.
    ///
    /// The caller must be the one that won the `Receiving -> Completing`
    /// transition; that transition is what keeps assembly to a single run per
    /// session. Integrity failures move the session to `Failed`.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id(), file_hash = %session.plan().file_hash))]
    pub async fn assemble(&self, session: &UploadSession) -> Result<Arc<FileManifest>> {
        let plan = session.plan();

        if !plan.file_hash_matches() {
            let err = UploadError::FileHashMismatch {
                declared: plan.file_hash,
                computed: FileHash::compute(&plan.chunk_hashes),
            };
            return Err(self.fail(session, err));
        }

        let manifest = FileManifest::from_plan(plan);
        // An index outage also fails the session. Its chunks stay stored, so a
        // fresh session for the same plan writes nothing new.
        let outcome = match self.index.register(manifest).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail(session, err)),
        };

        if let RegisterOutcome::Existing(_) = outcome {
            tracing::debug!("manifest already registered by another upload");
        }
        let manifest = outcome.into_manifest();

        session.set_manifest(manifest.clone());
        if !session.transition(SessionState::Completing, SessionState::Committed) {
            // Only the assembling caller moves a session out of Completing
            tracing::warn!(state = %session.state(), "session left completing during assembly");
        }

        self.events.publish(FileCommitted::new(
            manifest.file_hash,
            manifest.file_size,
            session.owner_id(),
            session.target(),
            Some(session.id()),
        ));

        tracing::info!(
            file_size = manifest.file_size,
            chunks = manifest.chunk_count(),
            "upload committed"
        );
        Ok(manifest)
    }

    fn fail(&self, session: &UploadSession, err: UploadError) -> UploadError {
        session.set_failure(err.code());
        session.transition(SessionState::Completing, SessionState::Failed);
        tracing::error!(
            session_id = %session.id(),
            owner_id = %session.owner_id(),
            code = err.code(),
            error = %err,
            "upload assembly failed"
        );
        err
    }
}
