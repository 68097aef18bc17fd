//! Deterministic feature-hashed bag-of-words embedder.
//!
//! Each lowercased alphanumeric token is hashed (FNV-1a) into one of `dims`
//! buckets with a sign bit to cancel collision bias, and the accumulated
//! vector is L2-normalized. Token overlap therefore maps to cosine
//! similarity, which is enough for the classifiers and for reproducible
//! tests. Not a substitute for a real model backend.

use super::EmbeddingProvider;
use crate::error::Result;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Default dimensionality. Wide enough that short texts rarely collide.
pub const DEFAULT_DIMS: usize = 256;

#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dims: usize,
}

impl HashedEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMS)
    }
}

impl EmbeddingProvider for HashedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dims];

        for token in tokenize(text) {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dims as u64) as usize;
            // High bit decides the sign, independent of the bucket choice
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Lowercased alphanumeric tokens.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine;

    #[test]
    fn embed_is_deterministic() {
        let embedder = HashedEmbedder::default();
        let a = embedder.embed("the quick brown fox").unwrap();
        let b = embedder.embed("the quick brown fox").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn embed_is_normalized() {
        let embedder = HashedEmbedder::default();
        let v = embedder.embed("some arbitrary text here").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn overlapping_texts_are_more_similar_than_disjoint() {
        let embedder = HashedEmbedder::default();
        let base = embedder.embed("rust ownership and borrowing rules").unwrap();
        let close = embedder.embed("ownership and borrowing in rust").unwrap();
        let far = embedder.embed("grilled cheese sandwich recipe").unwrap();

        assert!(cosine(&base, &close) > cosine(&base, &far));
        assert!(cosine(&base, &close) > 0.6);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = HashedEmbedder::default();
        let v = embedder.embed("   ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
