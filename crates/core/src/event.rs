//! Events emitted to file-tree and media collaborators.

use crate::manifest::FileHash;
use crate::upload::{SessionId, UploadTarget};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Coarse file category, as shown by the file browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Video,
    Music,
    Image,
    Doc,
    Other,
}

impl FileCategory {
    /// Classify a file by its name's extension (case-insensitive).
    pub fn from_name(name: &str) -> Self {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return Self::Other;
        };
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "mkv" | "mov" | "avi" | "webm" | "flv" | "wmv" | "m4v" | "ts" => Self::Video,
            "mp3" | "flac" | "wav" | "aac" | "ogg" | "m4a" | "wma" => Self::Music,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" | "psd" | "heic" => {
                Self::Image
            }
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "md" => Self::Doc,
            _ => Self::Other,
        }
    }

    /// Whether a committed file of this category goes to transcoding.
    pub fn needs_transcode(&self) -> bool {
        matches!(self, Self::Video)
    }
}

/// A file became available to its owner.
///
/// Consumers create the visible directory entry from this, and the
/// transcoding trigger picks up entries with `needs_transcode`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileCommitted {
    pub file_hash: FileHash,
    pub file_size: u64,
    pub owner_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub category: FileCategory,
    pub needs_transcode: bool,
    /// True when no bytes were transferred (instant upload).
    pub instant: bool,
    /// Session that produced the file; `None` for instant uploads.
    pub session_id: Option<SessionId>,
    #[serde(with = "time::serde::rfc3339")]
    pub committed_at: OffsetDateTime,
}

impl FileCommitted {
    /// Build the event for a file-tree entry pointing at `file_hash`.
    pub fn new(
        file_hash: FileHash,
        file_size: u64,
        owner_id: &str,
        target: &UploadTarget,
        session_id: Option<SessionId>,
    ) -> Self {
        let category = FileCategory::from_name(&target.name);
        Self {
            file_hash,
            file_size,
            owner_id: owner_id.to_string(),
            parent_id: target.parent_id.clone(),
            name: target.name.clone(),
            category,
            needs_transcode: category.needs_transcode(),
            instant: session_id.is_none(),
            session_id,
            committed_at: OffsetDateTime::now_utc(),
        }
    }
}
