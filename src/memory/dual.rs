//! Dual-store orchestration: one project store, one user store.
//!
//! Writes are routed by the scope classifier (or pinned by the caller);
//! recall fans out to both stores, boosts project hits, and collapses
//! cross-store near-duplicates. Operations addressed by id try the project
//! store first and fall through to the user store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classify::{ScopeClassifier, ScopeDecision};
use crate::config::{EngramConfig, RetrievalConfig};
use crate::embedding::{cosine, EmbeddingProvider, VectorIndex};
use crate::error::{MemoryError, Result};
use crate::memory::stats::StoreStats;
use crate::memory::store::{MaintenanceReport, MemoryStore};
use crate::memory::types::{Fact, Memory, Scope, Sector};

/// Filenames/dirs that mark a project root, checked in order.
const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "go.mod",
    "CMakeLists.txt",
];

/// How far up the directory tree the marker walk goes.
const MAX_MARKER_DEPTH: usize = 10;

/// How the caller wants a write routed.
#[derive(Debug, Clone, Copy, Default)]
pub enum ScopeChoice {
    /// Let the scope classifier decide.
    #[default]
    Auto,
    /// Pin the write to one store.
    Fixed(Scope),
}

/// Result of a routed store.
#[derive(Debug, Serialize)]
pub struct DualStoreResult {
    pub memory: Memory,
    pub deduplicated: bool,
    /// Classifier confidence; `None` when the scope was pinned.
    pub confidence: Option<f64>,
}

/// One blended recall result.
#[derive(Debug, Clone, Serialize)]
pub struct RecallHit {
    pub memory: Memory,
    pub scope: Scope,
    pub score: f64,
}

/// A fact tagged with the store it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ScopedFact {
    pub scope: Scope,
    pub fact: Fact,
}

/// Per-store statistics.
#[derive(Debug, Serialize)]
pub struct DualStats {
    pub project: StoreStats,
    pub user: StoreStats,
}

/// Routes between a project-scope store and a user-scope store.
pub struct DualMemoryManager {
    project: MemoryStore,
    user: MemoryStore,
    scopes: ScopeClassifier,
    embedder: Arc<dyn EmbeddingProvider>,
    retrieval: RetrievalConfig,
}

impl DualMemoryManager {
    /// Pair two already-open stores under one classifier.
    pub fn new(
        project: MemoryStore,
        user: MemoryStore,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &EngramConfig,
    ) -> Result<Self> {
        let scopes = ScopeClassifier::new(embedder.as_ref(), config.classifier.scope_threshold)?;
        Ok(Self {
            project,
            user,
            scopes,
            embedder,
            retrieval: config.retrieval.clone(),
        })
    }

    /// Open both scope databases: the project one under `project_root`, the
    /// user one at its configured (usually home-relative) path.
    pub fn open(
        config: EngramConfig,
        project_root: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        project_index: Box<dyn VectorIndex>,
        user_index: Box<dyn VectorIndex>,
    ) -> anyhow::Result<Self> {
        let project = MemoryStore::open(
            config.resolved_project_db_path(project_root),
            Scope::Project,
            embedder.clone(),
            project_index,
            config.clone(),
        )?;
        let user = MemoryStore::open(
            config.resolved_user_db_path(),
            Scope::User,
            embedder.clone(),
            user_index,
            config.clone(),
        )?;
        Ok(Self::new(project, user, embedder, &config)?)
    }

    fn store_for(&self, scope: Scope) -> &MemoryStore {
        match scope {
            Scope::Project => &self.project,
            Scope::User => &self.user,
        }
    }

    /// Classify a piece of content without storing it.
    pub fn classify_scope(&self, content: &str) -> Result<ScopeDecision> {
        self.scopes.classify_text(self.embedder.as_ref(), content)
    }

    /// Store content in the right scope. With [`ScopeChoice::Auto`] the
    /// content is embedded once and the embedding is reused for scope
    /// classification, sector classification, and indexing.
    pub fn store(
        &self,
        content: &str,
        tags: &[String],
        choice: ScopeChoice,
    ) -> Result<DualStoreResult> {
        let embedding = self.embedder.embed(content)?;
        let (scope, confidence) = match choice {
            ScopeChoice::Fixed(scope) => (scope, None),
            ScopeChoice::Auto => {
                let decision = self.scopes.classify(&embedding);
                tracing::debug!(
                    scope = %decision.scope,
                    confidence = decision.confidence,
                    "scope classified"
                );
                (decision.scope, Some(decision.confidence))
            }
        };

        let result = self.store_for(scope).store_embedded(content, tags, embedding)?;
        Ok(DualStoreResult {
            memory: result.memory,
            deduplicated: result.deduplicated,
            confidence,
        })
    }

    /// Blended recall across both stores.
    ///
    /// Both stores are over-fetched, project hits get the configured boost,
    /// and cross-store near-duplicates (by content embedding) collapse to
    /// the higher-scoring copy.
    pub fn recall(&self, query: &str, limit: Option<usize>) -> Result<Vec<RecallHit>> {
        let limit = limit.unwrap_or(self.retrieval.default_limit).max(1);
        let fetch = limit * 3 / 2 + 1;
        let embedding = self.embedder.embed(query)?;

        let mut hits: Vec<RecallHit> = Vec::new();
        for hit in self.project.query_embedded(query, &embedding, fetch)? {
            hits.push(RecallHit {
                scope: Scope::Project,
                score: hit.score * self.retrieval.project_boost,
                memory: hit.memory,
            });
        }
        for hit in self.user.query_embedded(query, &embedding, fetch)? {
            hits.push(RecallHit {
                scope: Scope::User,
                score: hit.score,
                memory: hit.memory,
            });
        }
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.memory.id.cmp(&b.memory.id))
        });

        let mut kept: Vec<RecallHit> = Vec::new();
        let mut kept_embeddings: Vec<Vec<f32>> = Vec::new();
        for hit in hits {
            if kept.len() == limit {
                break;
            }
            let hit_embedding = self.embedder.embed(&hit.memory.content)?;
            let duplicate = kept.iter().zip(&kept_embeddings).any(|(k, kept_emb)| {
                k.scope != hit.scope
                    && cosine(kept_emb, &hit_embedding) >= self.retrieval.dedup_threshold
            });
            if duplicate {
                tracing::debug!(id = %hit.memory.id, "cross-store duplicate dropped from recall");
                continue;
            }
            kept.push(hit);
            kept_embeddings.push(hit_embedding);
        }
        Ok(kept)
    }

    /// Fetch by id, trying the project store first.
    pub fn get(&self, id: &str) -> Result<Memory> {
        match self.project.get(id) {
            Err(MemoryError::NotFound { .. }) => self.user.get(id),
            other => other,
        }
    }

    /// Delete by id from whichever store holds it.
    pub fn delete(&self, id: &str) -> Result<bool> {
        if self.project.delete(id)? {
            return Ok(true);
        }
        self.user.delete(id)
    }

    /// Wipe the memories of one store, or both. Facts stay. Returns the
    /// total number of memories removed.
    pub fn delete_all(&self, scope: Option<Scope>) -> Result<usize> {
        let mut removed = 0;
        if scope.map_or(true, |s| s == Scope::Project) {
            removed += self.project.delete_all()?;
        }
        if scope.map_or(true, |s| s == Scope::User) {
            removed += self.user.delete_all()?;
        }
        Ok(removed)
    }

    /// Reinforce by id, trying the project store first.
    pub fn reinforce(&self, id: &str) -> Result<Memory> {
        match self.project.reinforce(id) {
            Err(MemoryError::NotFound { .. }) => self.user.reinforce(id),
            other => other,
        }
    }

    /// List memories across stores, optionally filtered, ordered by
    /// persisted salience descending.
    pub fn list(&self, scope: Option<Scope>, sector: Option<Sector>) -> Result<Vec<Memory>> {
        let mut memories = Vec::new();
        if scope.map_or(true, |s| s == Scope::Project) {
            memories.extend(self.project.list(sector)?);
        }
        if scope.map_or(true, |s| s == Scope::User) {
            memories.extend(self.user.list(sector)?);
        }
        memories.sort_by(|a, b| {
            b.salience
                .partial_cmp(&a.salience)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(memories)
    }

    /// Store a fact in the given scope's temporal graph.
    #[allow(clippy::too_many_arguments)]
    pub fn store_fact(
        &self,
        scope: Scope,
        subject: &str,
        predicate: &str,
        object: &str,
        at: DateTime<Utc>,
        confidence: f64,
        source_memory_id: Option<&str>,
    ) -> Result<Fact> {
        self.store_for(scope)
            .store_fact(subject, predicate, object, at, confidence, source_memory_id)
    }

    /// Point-in-time fact query across both stores.
    pub fn query_facts(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Vec<ScopedFact>> {
        let mut facts: Vec<ScopedFact> = Vec::new();
        for fact in self.project.query_facts(subject, predicate, object, at)? {
            facts.push(ScopedFact {
                scope: Scope::Project,
                fact,
            });
        }
        for fact in self.user.query_facts(subject, predicate, object, at)? {
            facts.push(ScopedFact {
                scope: Scope::User,
                fact,
            });
        }
        sort_facts(&mut facts);
        Ok(facts)
    }

    /// Merged chronological history of an entity across both stores.
    pub fn get_timeline(&self, entity: &str) -> Result<Vec<ScopedFact>> {
        let mut facts: Vec<ScopedFact> = Vec::new();
        for fact in self.project.get_timeline(entity)? {
            facts.push(ScopedFact {
                scope: Scope::Project,
                fact,
            });
        }
        for fact in self.user.get_timeline(entity)? {
            facts.push(ScopedFact {
                scope: Scope::User,
                fact,
            });
        }
        sort_facts(&mut facts);
        Ok(facts)
    }

    /// Run a maintenance pass on one store, or both.
    pub fn apply_decay(&self, scope: Option<Scope>) -> Result<MaintenanceReport> {
        let mut report = MaintenanceReport {
            memories_updated: 0,
            facts_decayed: 0,
            edges_pruned: 0,
        };
        if scope.map_or(true, |s| s == Scope::Project) {
            let r = self.project.apply_decay()?;
            report.memories_updated += r.memories_updated;
            report.facts_decayed += r.facts_decayed;
            report.edges_pruned += r.edges_pruned;
        }
        if scope.map_or(true, |s| s == Scope::User) {
            let r = self.user.apply_decay()?;
            report.memories_updated += r.memories_updated;
            report.facts_decayed += r.facts_decayed;
            report.edges_pruned += r.edges_pruned;
        }
        Ok(report)
    }

    pub fn stats(&self) -> Result<DualStats> {
        Ok(DualStats {
            project: self.project.stats()?,
            user: self.user.stats()?,
        })
    }
}

fn sort_facts(facts: &mut [ScopedFact]) {
    facts.sort_by(|a, b| {
        a.fact
            .valid_from
            .cmp(&b.fact.valid_from)
            .then_with(|| a.fact.id.cmp(&b.fact.id))
    });
}

/// Walk up from `start` looking for a project marker. Returns the first
/// directory containing one, or `None` within the depth limit.
pub fn detect_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    for _ in 0..MAX_MARKER_DEPTH {
        if PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()) {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
    None
}
