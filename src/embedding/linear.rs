//! Exhaustive-scan reference implementation of [`VectorIndex`].
//!
//! Keeps every vector in a `HashMap` and answers `search` with a full cosine
//! scan. Deterministic and dependency-free, which is what the store tests
//! need; real deployments replace it with an ANN index behind the same
//! trait.

use super::{cosine, VectorIndex};
use crate::error::Result;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct LinearIndex {
    vectors: HashMap<String, Vec<f32>>,
}

impl LinearIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl VectorIndex for LinearIndex {
    fn insert(&mut self, key: &str, vector: &[f32]) -> Result<()> {
        self.vectors.insert(key.to_string(), vector.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.vectors.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.vectors.contains_key(key)
    }

    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(String, f64)>> {
        let mut scored: Vec<(String, f64)> = self
            .vectors
            .iter()
            .map(|(key, v)| (key.clone(), cosine(vector, v)))
            .collect();

        // Descending by similarity, key as tiebreaker for determinism
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }
}
