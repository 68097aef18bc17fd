//! External-collaborator seam for embeddings and nearest-neighbor search.
//!
//! The core never embeds text or runs similarity search itself — it consumes
//! an [`EmbeddingProvider`] and a [`VectorIndex`] and treats both as opaque.
//! Two deterministic reference implementations ship with the crate so the
//! whole pipeline is testable offline: [`hashed::HashedEmbedder`] and
//! [`linear::LinearIndex`]. Production deployments plug in a real model
//! backend and an ANN index.

pub mod hashed;
pub mod linear;

use crate::error::Result;

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of a fixed dimensionality.
/// A backend that is unreachable or times out returns
/// [`MemoryError::EmbeddingUnavailable`](crate::MemoryError::EmbeddingUnavailable);
/// callers abort the surrounding operation with no partial state.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for
    /// batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Trait for the vector store holding memory embeddings, keyed by memory id.
///
/// `insert`/`remove` persist and evict embedding payloads; `search` returns
/// the `k` nearest keys with a cosine similarity score, descending.
pub trait VectorIndex: Send {
    fn insert(&mut self, key: &str, vector: &[f32]) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;

    fn contains(&self, key: &str) -> bool;

    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(String, f64)>>;
}

/// Cosine similarity between two vectors. Zero-magnitude input yields 0.0.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
