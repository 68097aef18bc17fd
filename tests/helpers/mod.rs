#![allow(dead_code)]

use std::sync::Arc;

use engram::config::EngramConfig;
use engram::embedding::hashed::HashedEmbedder;
use engram::embedding::linear::LinearIndex;
use engram::memory::{DualMemoryManager, MemoryStore, Scope};

/// A fresh in-memory store with the deterministic reference embedder.
pub fn test_store(scope: Scope) -> MemoryStore {
    MemoryStore::in_memory(
        scope,
        Arc::new(HashedEmbedder::default()),
        Box::new(LinearIndex::new()),
        EngramConfig::default(),
    )
    .unwrap()
}

/// A manager over two fresh in-memory stores sharing one embedder.
pub fn test_manager() -> DualMemoryManager {
    let embedder: Arc<HashedEmbedder> = Arc::new(HashedEmbedder::default());
    let config = EngramConfig::default();
    let project = MemoryStore::in_memory(
        Scope::Project,
        embedder.clone(),
        Box::new(LinearIndex::new()),
        config.clone(),
    )
    .unwrap();
    let user = MemoryStore::in_memory(
        Scope::User,
        embedder.clone(),
        Box::new(LinearIndex::new()),
        config.clone(),
    )
    .unwrap();
    DualMemoryManager::new(project, user, embedder, &config).unwrap()
}
