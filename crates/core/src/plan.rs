//! Client-declared upload plans.

use crate::chunk::{ChunkHash, ChunkMeta, split_into_chunks};
use crate::manifest::FileHash;
use serde::{Deserialize, Serialize};

/// Bounds a plan must respect to be accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanLimits {
    /// Smallest accepted chunk size in bytes.
    pub min_chunk_size: u32,
    /// Largest accepted chunk size in bytes.
    pub max_chunk_size: u32,
    /// Largest accepted file size in bytes.
    pub max_file_size: u64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            min_chunk_size: crate::MIN_CHUNK_SIZE,
            max_chunk_size: crate::MAX_CHUNK_SIZE,
            max_file_size: crate::MAX_FILE_SIZE,
        }
    }
}

/// The full shape of an upload, declared by the client before any bytes move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPlan {
    /// Declared hash of the whole file.
    pub file_hash: FileHash,
    /// Total file size in bytes.
    pub file_size: u64,
    /// Size of every chunk except possibly the last.
    pub chunk_size: u32,
    /// Ordered chunk hashes.
    pub chunk_hashes: Vec<ChunkHash>,
}

impl UploadPlan {
    /// Build the plan a well-behaved client would declare for `data`.
    pub fn from_data(data: &[u8], chunk_size: u32) -> Self {
        let chunk_hashes: Vec<ChunkHash> = split_into_chunks(data, chunk_size)
            .into_iter()
            .map(|(meta, _)| meta.hash)
            .collect();
        Self {
            file_hash: FileHash::compute(&chunk_hashes),
            file_size: data.len() as u64,
            chunk_size,
            chunk_hashes,
        }
    }

    /// Number of chunks implied by the size arithmetic.
    pub fn expected_chunk_count(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.file_size.div_ceil(u64::from(self.chunk_size))
    }

    /// Number of declared chunks.
    pub fn chunk_count(&self) -> u32 {
        self.chunk_hashes.len() as u32
    }

    /// Check the plan's arithmetic against the limits.
    ///
    /// This does not check `file_hash` against `chunk_hashes`; that check
    /// belongs to assembly, once every chunk has been verified.
    pub fn validate(&self, limits: &PlanLimits) -> crate::Result<()> {
        if self.chunk_size < limits.min_chunk_size || self.chunk_size > limits.max_chunk_size {
            return Err(crate::Error::InvalidChunkSize {
                size: u64::from(self.chunk_size),
                min: u64::from(limits.min_chunk_size),
                max: u64::from(limits.max_chunk_size),
            });
        }

        if self.file_size > limits.max_file_size {
            return Err(crate::Error::InvalidPlan(format!(
                "file_size {} exceeds maximum {}",
                self.file_size, limits.max_file_size
            )));
        }

        let expected = self.expected_chunk_count();
        if self.chunk_hashes.len() as u64 != expected {
            return Err(crate::Error::InvalidPlan(format!(
                "chunk_hashes has {} entries but file_size {} with chunk_size {} requires {}",
                self.chunk_hashes.len(),
                self.file_size,
                self.chunk_size,
                expected
            )));
        }

        if expected > u64::from(u32::MAX) {
            return Err(crate::Error::InvalidPlan(format!(
                "chunk count {expected} does not fit a u32 index"
            )));
        }

        Ok(())
    }

    /// Expected byte size of the chunk at `index`.
    ///
    /// Returns `None` if the index is out of bounds.
    pub fn expected_chunk_size(&self, index: u32) -> Option<u32> {
        let count = self.chunk_count();
        if index >= count {
            return None;
        }
        if index + 1 < count {
            Some(self.chunk_size)
        } else {
            let full = u64::from(count - 1) * u64::from(self.chunk_size);
            Some((self.file_size - full) as u32)
        }
    }

    /// Metadata of the chunk at `index`.
    pub fn chunk_meta(&self, index: u32) -> Option<ChunkMeta> {
        let size = self.expected_chunk_size(index)?;
        Some(ChunkMeta {
            index,
            hash: self.chunk_hashes[index as usize],
            size,
            offset: u64::from(index) * u64::from(self.chunk_size),
        })
    }

    /// Iterate over all chunk metadata in index order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkMeta> + '_ {
        (0..self.chunk_count()).filter_map(|i| self.chunk_meta(i))
    }

    /// Whether the declared file hash matches the declared chunk list.
    pub fn file_hash_matches(&self) -> bool {
        FileHash::compute(&self.chunk_hashes) == self.file_hash
    }
}
