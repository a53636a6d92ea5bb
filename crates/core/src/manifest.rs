//! File hashes and committed file manifests.

use crate::chunk::ChunkHash;
use crate::hash::ContentHash;
use crate::plan::UploadPlan;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use time::OffsetDateTime;

/// A file hash (SHA-256 of ordered chunk hashes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHash(ContentHash);

impl FileHash {
    /// Compute the file hash from ordered chunk hashes.
    pub fn compute(chunk_hashes: &[ChunkHash]) -> Self {
        let mut hasher = Sha256::new();
        for hash in chunk_hashes {
            hasher.update(hash.content_hash().as_bytes());
        }
        Self(ContentHash::from_bytes(hasher.finalize().into()))
    }

    /// Get the underlying content hash.
    pub fn content_hash(&self) -> &ContentHash {
        &self.0
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        Ok(Self(ContentHash::from_hex(s)?))
    }

    /// Encode as hex string.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Debug for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A committed file: the ordered chunks that make up its bytes.
///
/// Manifests are content addressed and carry no owner, name or folder.
/// Any number of file-tree entries may point at the same manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileManifest {
    /// The file hash (derived from chunk hashes).
    pub file_hash: FileHash,
    /// Total file size.
    pub file_size: u64,
    /// Size of each chunk (except possibly the last).
    pub chunk_size: u32,
    /// Ordered list of chunk hashes.
    pub chunk_hashes: Vec<ChunkHash>,
    /// Object store keys of the chunk blobs, parallel to `chunk_hashes`.
    pub storage_refs: Vec<String>,
    /// When the manifest was first committed.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FileManifest {
    /// Build a manifest for a fully received plan.
    pub fn from_plan(plan: &UploadPlan) -> Self {
        Self {
            file_hash: plan.file_hash,
            file_size: plan.file_size,
            chunk_size: plan.chunk_size,
            chunk_hashes: plan.chunk_hashes.clone(),
            storage_refs: plan
                .chunk_hashes
                .iter()
                .map(ChunkHash::to_object_key)
                .collect(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Whether two manifests describe the same bytes.
    ///
    /// Timestamps and storage refs are ignored.
    pub fn same_content(&self, other: &FileManifest) -> bool {
        self.file_hash == other.file_hash
            && self.file_size == other.file_size
            && self.chunk_hashes == other.chunk_hashes
    }

    /// Get the number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunk_hashes.len()
    }
}
