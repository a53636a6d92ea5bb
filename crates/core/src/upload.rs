//! Upload session identifiers, states and wire types.

use crate::manifest::{FileHash, FileManifest};
use crate::plan::UploadPlan;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an upload session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidSessionId(e.to_string()))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upload session state.
///
/// `Created -> Receiving -> Completing -> Committed` is the success path.
/// `Expired`, `Aborted` and `Failed` are terminal failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SessionState {
    /// Session exists, no chunk accepted yet.
    Created = 0,
    /// At least one chunk accepted.
    Receiving = 1,
    /// Every chunk received, assembly in progress.
    Completing = 2,
    /// Manifest committed.
    Committed = 3,
    /// Idle past the timeout.
    Expired = 4,
    /// Cancelled by the client.
    Aborted = 5,
    /// Assembly failed an integrity check.
    Failed = 6,
}

impl SessionState {
    /// Decode from the `repr(u8)` discriminant.
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Created,
            1 => Self::Receiving,
            2 => Self::Completing,
            3 => Self::Committed,
            4 => Self::Expired,
            5 => Self::Aborted,
            6 => Self::Failed,
            _ => return None,
        })
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Receiving => "receiving",
            Self::Completing => "completing",
            Self::Committed => "committed",
            Self::Expired => "expired",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    /// Check if the session can still accept new chunks.
    pub fn accepts_chunks(&self) -> bool {
        matches!(self, Self::Created | Self::Receiving)
    }

    /// Check if the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed | Self::Expired | Self::Aborted | Self::Failed
        )
    }

    /// Status label the upload panel shows for this state.
    pub fn task_status(&self) -> TaskStatus {
        match self {
            Self::Created => TaskStatus::Waiting,
            Self::Receiving | Self::Completing => TaskStatus::Uploading,
            Self::Committed => TaskStatus::Success,
            Self::Expired | Self::Aborted | Self::Failed => TaskStatus::Fail,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload task status vocabulary used by the upload panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Waiting,
    Uploading,
    Success,
    /// Completed by instant upload, no bytes transferred.
    Seconds,
    Fail,
}

/// Where the committed file should appear in the owner's file tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// Display name of the file.
    pub name: String,
    /// Parent folder in the file tree (`None` for the root).
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Request to create an upload session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Owner of the resulting file-tree entry.
    pub owner_id: String,
    /// Target name and folder.
    #[serde(flatten)]
    pub target: UploadTarget,
    /// Shape of the upload.
    pub plan: UploadPlan,
}

/// Lightweight reference to a committed manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRef {
    pub file_hash: FileHash,
    pub file_size: u64,
    pub chunk_count: u32,
}

impl From<&FileManifest> for ManifestRef {
    fn from(manifest: &FileManifest) -> Self {
        Self {
            file_hash: manifest.file_hash,
            file_size: manifest.file_size,
            chunk_count: manifest.chunk_count() as u32,
        }
    }
}

/// A session the client should upload chunks into.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
    pub state: SessionState,
    /// Chunk indices still to be sent.
    pub missing_indices: Vec<u32>,
    /// True when an existing session for the same file was returned.
    pub resumed: bool,
    /// Maximum parallel chunk uploads the client should use.
    pub max_parallel_chunks: u32,
}

/// Response from creating an upload session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateSessionResponse {
    Session(SessionCreated),
    /// The content is already stored; nothing to upload.
    InstantComplete(ManifestRef),
}

/// Response from querying session state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub session_id: SessionId,
    pub state: SessionState,
    pub task_status: TaskStatus,
    pub received_indices: Vec<u32>,
    pub missing_indices: Vec<u32>,
    pub total_chunks: u32,
    /// Committed manifest, once the session reached `committed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestRef>,
    /// Error code for sessions that ended in `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl SessionStatusResponse {
    /// Fraction of chunks received, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_chunks == 0 {
            return 1.0;
        }
        self.received_indices.len() as f64 / f64::from(self.total_chunks)
    }
}

/// Response from uploading one chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadChunkResponse {
    pub accepted: bool,
    pub index: u32,
    /// True when the chunk had already been received by this session.
    pub duplicate: bool,
    pub state: SessionState,
    /// Set on the request that completed the upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed: Option<ManifestRef>,
}

/// Response from aborting a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbortSessionResponse {
    pub ok: bool,
    /// State after the call; `committed` if completion won the race.
    pub state: SessionState,
}
