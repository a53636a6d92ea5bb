//! Test fixtures for generating upload data and requests.

use bytes::Bytes;
use flowpan_core::UploadPlan;
use serde_json::{Value, json};

/// Generate deterministic test data based on a seed.
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        // Simple LCG for deterministic data
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// Split data into chunks of specified size.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn split_into_chunks(data: &[u8], chunk_size: usize) -> Vec<Bytes> {
    data.chunks(chunk_size)
        .map(Bytes::copy_from_slice)
        .collect()
}

/// Body for `POST /v1/uploads`.
#[allow(dead_code)]
pub fn create_body(owner_id: &str, name: &str, plan: &UploadPlan) -> Value {
    json!({
        "owner_id": owner_id,
        "name": name,
        "parent_id": "root",
        "plan": plan,
    })
}

/// URI for uploading chunk `index` of `plan` into `session_id`.
#[allow(dead_code)]
pub fn chunk_uri(session_id: &str, plan: &UploadPlan, index: usize) -> String {
    format!(
        "/v1/uploads/{}/chunks/{}/{}",
        session_id,
        index,
        plan.chunk_hashes[index].to_hex()
    )
}
