//! Chunk types and hashing.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chunk hash (SHA-256 of chunk contents).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkHash(ContentHash);

impl ChunkHash {
    /// Compute the hash of chunk data.
    pub fn compute(data: &[u8]) -> Self {
        Self(ContentHash::compute(data))
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

    /// Get the object store key for this chunk.
    pub fn to_object_key(&self) -> String {
        let hex = self.to_hex();
        format!("chunks/{}/{}/{}", &hex[..2], &hex[2..4], hex)
    }

    /// Verify that `data` hashes to this chunk hash.
    pub fn verify(&self, data: &[u8]) -> crate::Result<()> {
        let actual = Self::compute(data);
        if &actual != self {
            return Err(crate::Error::HashMismatch {
                expected: self.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Position and identity of one chunk within a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Position in the file (0-indexed).
    pub index: u32,
    /// The chunk hash.
    pub hash: ChunkHash,
    /// Size in bytes.
    pub size: u32,
    /// Byte offset of the chunk in the file.
    pub offset: u64,
}

impl ChunkMeta {
    /// Offset one past the last byte of this chunk.
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.size)
    }
}

/// Split data into chunks of the given size.
///
/// This is the client-side half of a plan: it yields the metadata the
/// client declares up front together with the bytes it will later send.
pub fn split_into_chunks(data: &[u8], chunk_size: u32) -> Vec<(ChunkMeta, &[u8])> {
    data.chunks(chunk_size as usize)
        .enumerate()
        .map(|(i, bytes)| {
            let meta = ChunkMeta {
                index: i as u32,
                hash: ChunkHash::compute(bytes),
                size: bytes.len() as u32,
                offset: i as u64 * u64::from(chunk_size),
            };
            (meta, bytes)
        })
        .collect()
}
