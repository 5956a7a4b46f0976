//! Textual encoding of embeddings for the record store.
//!
//! Vectors are written as JSON arrays. `serde_json` prints each `f32` in its
//! shortest round-trip decimal form, so decoding yields the same bits.

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Encode an embedding as a JSON array of floats.
pub fn serialize(embedding: &[f32]) -> Result<String> {
    // JSON has no NaN or infinity; serde_json would silently write `null`
    if let Some(index) = embedding.iter().position(|x| !x.is_finite()) {
        return Err(EmbeddingError::NonFiniteComponent { index });
    }
    Ok(serde_json::to_string(embedding)?)
}

/// Decode an embedding written by [`serialize`].
pub fn deserialize(blob: &str) -> Result<Embedding> {
    Ok(serde_json::from_str(blob)?)
}
