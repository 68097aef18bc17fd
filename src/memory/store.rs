//! Single-scope store — the full write and read pipelines.
//!
//! [`MemoryStore::store`] runs embed → sector classify → dedup gate →
//! insert + auto-link inside a transaction. The vector index is written
//! first and rolled back by key removal if the SQL transaction fails, so a
//! failed store leaves no partial state in either collaborator.
//!
//! [`MemoryStore::query`] blends vector similarity, sector affinity, and
//! current salience into one score, then widens the result set through the
//! waypoint graph. Retrieval reinforces what it returns.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::classify::{sector_affinity, SectorClassifier};
use crate::config::EngramConfig;
use crate::db::{self, format_ts, ts_from_sql};
use crate::decay::{self, DecayConfig};
use crate::embedding::{EmbeddingProvider, VectorIndex};
use crate::error::{MemoryError, Result};
use crate::memory::stats::{self, StoreStats};
use crate::memory::types::{Fact, Memory, Scope, Sector, WaypointEdge};
use crate::temporal;
use crate::waypoint;

const MEMORY_COLUMNS: &str = "id, content, scope, sector, embedding_key, salience, \
     access_count, created_at, last_accessed_at, tags";

/// Expansion branches below this accumulated weight are not followed.
const MIN_EXPANSION_WEIGHT: f64 = 0.1;

/// Score discount for memories reached through the waypoint graph instead
/// of direct similarity.
const EXPANSION_SCORE_FACTOR: f64 = 0.5;

/// How many direct hits seed the graph expansion.
const EXPANSION_SEEDS: usize = 3;

pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let scope_str: String = row.get(2)?;
    let sector_str: String = row.get(3)?;
    let created: String = row.get(7)?;
    let accessed: String = row.get(8)?;
    let tags_json: Option<String> = row.get(9)?;

    let tags = match tags_json {
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?,
        None => Vec::new(),
    };

    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        scope: scope_str.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(2, "scope".into(), rusqlite::types::Type::Text)
        })?,
        sector: sector_str.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(3, "sector".into(), rusqlite::types::Type::Text)
        })?,
        embedding_key: row.get(4)?,
        salience: row.get(5)?,
        access_count: row.get(6)?,
        created_at: ts_from_sql(&created)?,
        last_accessed_at: ts_from_sql(&accessed)?,
        tags,
    })
}

/// Result returned from a store operation.
#[derive(Debug, Serialize)]
pub struct StoreResult {
    pub memory: Memory,
    /// `true` if an existing near-duplicate was reinforced instead of
    /// creating a new record.
    pub deduplicated: bool,
    /// Waypoint edges created by auto-linking.
    pub links: Vec<WaypointEdge>,
}

/// A memory returned from a query, with its blended score.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHit {
    pub memory: Memory,
    pub score: f64,
}

/// Counters from one maintenance pass.
#[derive(Debug, Serialize)]
pub struct MaintenanceReport {
    pub memories_updated: usize,
    pub facts_decayed: usize,
    pub edges_pruned: usize,
}

struct StoreInner {
    conn: Connection,
    index: Box<dyn VectorIndex>,
}

/// One scope database with its embedding provider and vector index.
pub struct MemoryStore {
    scope: Scope,
    inner: Mutex<StoreInner>,
    embedder: Arc<dyn EmbeddingProvider>,
    sectors: SectorClassifier,
    config: EngramConfig,
    db_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Open (or create) the scope database at `path` and rehydrate the
    /// vector index from any rows it is missing.
    pub fn open(
        path: impl AsRef<Path>,
        scope: Scope,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        config: EngramConfig,
    ) -> anyhow::Result<Self> {
        let conn = db::open_database(&path)?;

        // Vectors written under one dimensionality are useless under another
        let dims = embedder.dimensions();
        match db::migrations::get_embedding_dimensions(&conn)? {
            Some(stored) if stored != dims => anyhow::bail!(
                "embedding dimensions changed: store has {stored}, provider produces {dims}"
            ),
            Some(_) => {}
            None => db::migrations::set_embedding_dimensions(&conn, dims)?,
        }

        let sectors = SectorClassifier::new(embedder.as_ref())?;
        let store = Self {
            scope,
            inner: Mutex::new(StoreInner { conn, index }),
            embedder,
            sectors,
            config,
            db_path: Some(path.as_ref().to_path_buf()),
        };
        store.rehydrate_index()?;
        Ok(store)
    }

    /// An ephemeral store backed by an in-memory database.
    pub fn in_memory(
        scope: Scope,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        config: EngramConfig,
    ) -> anyhow::Result<Self> {
        let conn = db::open_memory_database()?;
        let sectors = SectorClassifier::new(embedder.as_ref())?;
        Ok(Self {
            scope,
            inner: Mutex::new(StoreInner { conn, index }),
            embedder,
            sectors,
            config,
            db_path: None,
        })
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("store mutex poisoned")
    }

    /// Re-embed rows whose key is absent from the index. Runs at open so a
    /// fresh (or swapped) index converges with the database.
    fn rehydrate_index(&self) -> Result<usize> {
        let mut inner = self.lock();

        let missing: Vec<(String, String)> = {
            let mut stmt = inner
                .conn
                .prepare("SELECT embedding_key, content FROM memories")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<(String, String)>, _>>()?;
            rows.into_iter()
                .filter(|(key, _)| !inner.index.contains(key))
                .collect()
        };

        let rehydrated = missing.len();
        for (key, content) in missing {
            let embedding = self.embedder.embed(&content)?;
            inner.index.insert(&key, &embedding)?;
        }
        if rehydrated > 0 {
            tracing::info!(scope = %self.scope, rehydrated, "vector index rehydrated");
        }
        Ok(rehydrated)
    }

    /// Full write path: embed, classify the sector, dedup-gate, insert, and
    /// auto-link to similar neighbors.
    pub fn store(&self, content: &str, tags: &[String]) -> Result<StoreResult> {
        let embedding = self.embedder.embed(content)?;
        self.store_embedded(content, tags, embedding)
    }

    /// Store with an already-computed embedding of `content`.
    pub(crate) fn store_embedded(
        &self,
        content: &str,
        tags: &[String],
        embedding: Vec<f32>,
    ) -> Result<StoreResult> {
        let sector = self.sectors.classify(content, Some(&embedding));
        let now = Utc::now();
        let mut inner = self.lock();

        let candidates = inner
            .index
            .search(&embedding, self.config.classifier.auto_link_k)?;

        // Dedup gate: near-identical content reinforces the existing record
        if let Some((key, similarity)) = candidates.first() {
            if *similarity >= self.config.retrieval.dedup_threshold {
                let similarity = *similarity;
                let existing = key.clone();
                let memory =
                    reinforce_memory(&inner.conn, &self.config.decay.salience, &existing, now)?;
                tracing::debug!(id = %memory.id, similarity, "store deduplicated");
                return Ok(StoreResult {
                    memory,
                    deduplicated: true,
                    links: Vec::new(),
                });
            }
        }

        let id = uuid::Uuid::now_v7().to_string();
        let memory = Memory {
            id: id.clone(),
            content: content.to_string(),
            scope: self.scope,
            sector,
            embedding_key: id.clone(),
            salience: 1.0,
            access_count: 0,
            created_at: now,
            last_accessed_at: now,
            tags: tags.to_vec(),
        };

        // Vector first; removed again if the SQL transaction fails
        inner.index.insert(&id, &embedding)?;
        match insert_with_links(
            &mut inner.conn,
            &memory,
            &candidates,
            self.config.classifier.link_threshold,
            now,
        ) {
            Ok(links) => {
                tracing::debug!(id = %memory.id, sector = %memory.sector, linked = links.len(), "memory stored");
                Ok(StoreResult {
                    memory,
                    deduplicated: false,
                    links,
                })
            }
            Err(err) => {
                if let Err(remove_err) = inner.index.remove(&id) {
                    tracing::warn!(
                        id,
                        error = %remove_err,
                        "vector rollback failed, index holds a key with no backing row"
                    );
                }
                Err(err)
            }
        }
    }

    /// Ranked retrieval. Scores blend vector similarity, sector affinity
    /// between the query and each memory, and current salience; results the
    /// graph expansion pulls in are discounted. Everything returned is
    /// reinforced.
    pub fn query(&self, text: &str, limit: usize) -> Result<Vec<QueryHit>> {
        let embedding = self.embedder.embed(text)?;
        self.query_embedded(text, &embedding, limit)
    }

    /// Query with an already-computed embedding of `text`.
    pub(crate) fn query_embedded(
        &self,
        text: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<QueryHit>> {
        let query_sector = self.sectors.classify(text, Some(embedding));
        let now = Utc::now();
        let inner = self.lock();

        let raw = inner.index.search(embedding, limit.max(1) * 4)?;
        let mut hits: Vec<QueryHit> = Vec::new();
        for (key, similarity) in raw {
            let Some(memory) = get_by_id(&inner.conn, &key)? else {
                tracing::warn!(key, "vector index entry without a backing row");
                continue;
            };
            let salience = decay::current_salience(&self.config.decay.salience, &memory, now);
            let score = similarity.clamp(0.0, 1.0)
                * sector_affinity(query_sector, memory.sector)
                * (0.5 + 0.5 * salience);
            hits.push(QueryHit { memory, score });
        }
        sort_hits(&mut hits);

        // Widen through the association graph from the strongest hits
        if self.config.retrieval.expansion_limit > 0 && !hits.is_empty() {
            let seeds: Vec<String> = hits
                .iter()
                .take(EXPANSION_SEEDS)
                .map(|h| h.memory.id.clone())
                .collect();
            let expanded = waypoint::expand(
                &inner.conn,
                &seeds,
                self.config.retrieval.expansion_limit,
                MIN_EXPANSION_WEIGHT,
            )?;
            for exp in expanded {
                if hits.iter().any(|h| h.memory.id == exp.memory_id) {
                    continue;
                }
                let Some(memory) = get_by_id(&inner.conn, &exp.memory_id)? else {
                    continue;
                };
                let salience = decay::current_salience(&self.config.decay.salience, &memory, now);
                let score = exp.weight * EXPANSION_SCORE_FACTOR * (0.5 + 0.5 * salience);
                hits.push(QueryHit { memory, score });
            }
            sort_hits(&mut hits);
        }
        hits.truncate(limit);

        // Retrieval is access: reinforce what we return
        for hit in &mut hits {
            hit.memory =
                reinforce_memory(&inner.conn, &self.config.decay.salience, &hit.memory.id, now)?;
        }
        Ok(hits)
    }

    /// Fetch a memory without reinforcing it.
    pub fn get(&self, id: &str) -> Result<Memory> {
        let inner = self.lock();
        get_by_id(&inner.conn, id)?.ok_or_else(|| MemoryError::memory_not_found(id))
    }

    /// All memories, optionally filtered by sector, ordered by persisted
    /// salience descending.
    pub fn list(&self, sector: Option<Sector>) -> Result<Vec<Memory>> {
        let inner = self.lock();
        let mut stmt = inner.conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories \
             WHERE (?1 IS NULL OR sector = ?1) \
             ORDER BY salience DESC, id ASC"
        ))?;
        let memories = stmt
            .query_map(params![sector.map(|s| s.as_str())], memory_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(memories)
    }

    /// Explicitly reinforce a memory.
    pub fn reinforce(&self, id: &str) -> Result<Memory> {
        let inner = self.lock();
        reinforce_memory(&inner.conn, &self.config.decay.salience, id, Utc::now())
    }

    /// Delete a memory, its vector, and every waypoint edge touching it.
    /// Facts that cited it keep their (now dangling) weak reference. Returns
    /// `false` for an unknown id.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut inner = self.lock();
        let removed = inner
            .conn
            .execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Ok(false);
        }
        // Waypoints cascade with the row
        inner.index.remove(id)?;
        tracing::debug!(id, "memory deleted");
        Ok(true)
    }

    /// Delete every memory in the store, with vectors and waypoint edges.
    /// Facts are kept: recorded history outlives the memories behind it.
    /// Returns the number of memories removed.
    pub fn delete_all(&self) -> Result<usize> {
        let mut inner = self.lock();
        let keys: Vec<String> = {
            let mut stmt = inner.conn.prepare("SELECT embedding_key FROM memories")?;
            let collected = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            collected
        };

        let removed = inner.conn.execute("DELETE FROM memories", [])?;
        for key in &keys {
            inner.index.remove(key)?;
        }
        if removed > 0 {
            tracing::info!(scope = %self.scope, removed, "all memories deleted");
        }
        Ok(removed)
    }

    /// One maintenance pass: decay salience, decay open-fact confidence,
    /// prune weak waypoint edges.
    pub fn apply_decay(&self) -> Result<MaintenanceReport> {
        let now = Utc::now();
        let inner = self.lock();
        let memories_updated = decay::apply_decay(&inner.conn, &self.config.decay.salience, now)?;
        let facts_decayed =
            temporal::apply_confidence_decay(&inner.conn, self.config.decay.fact_decay_rate, now)?;
        let edges_pruned = waypoint::prune_weak(&inner.conn, self.config.decay.prune_min_weight)?;

        tracing::info!(
            scope = %self.scope,
            memories_updated,
            facts_decayed,
            edges_pruned,
            "maintenance pass complete"
        );
        Ok(MaintenanceReport {
            memories_updated,
            facts_decayed,
            edges_pruned,
        })
    }

    /// Manually link two memories (or strengthen an existing edge).
    pub fn link(
        &self,
        a: &str,
        b: &str,
        weight: f64,
        relation: Option<&str>,
    ) -> Result<WaypointEdge> {
        let inner = self.lock();
        waypoint::link(&inner.conn, a, b, weight, relation, Utc::now())
    }

    /// Override an edge's weight, bypassing the max-merge rule.
    pub fn set_link_weight(&self, a: &str, b: &str, weight: f64) -> Result<WaypointEdge> {
        let inner = self.lock();
        waypoint::set_weight(&inner.conn, a, b, weight, Utc::now())
    }

    /// Associated memory ids with edge weights, strongest first.
    pub fn neighbors(&self, id: &str, min_weight: Option<f64>) -> Result<Vec<(String, f64)>> {
        let inner = self.lock();
        waypoint::neighbors(&inner.conn, id, min_weight)
    }

    /// Drop every association of a memory without deleting the memory
    /// itself. Returns the number of edges removed.
    pub fn unlink(&self, id: &str) -> Result<usize> {
        let inner = self.lock();
        waypoint::unlink(&inner.conn, id)
    }

    /// Strengthen the edges along a traversal path that produced a useful
    /// result.
    pub fn reinforce_path(&self, path: &[String]) -> Result<usize> {
        let inner = self.lock();
        waypoint::reinforce_path(&inner.conn, path, Utc::now())
    }

    pub fn store_fact(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        at: DateTime<Utc>,
        confidence: f64,
        source_memory_id: Option<&str>,
    ) -> Result<Fact> {
        let mut inner = self.lock();
        temporal::store_fact(
            &mut inner.conn,
            subject,
            predicate,
            object,
            at,
            confidence,
            source_memory_id,
        )
    }

    pub fn query_facts(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Fact>> {
        let inner = self.lock();
        temporal::query_facts(&inner.conn, subject, predicate, object, at)
    }

    pub fn get_timeline(&self, entity: &str) -> Result<Vec<Fact>> {
        let inner = self.lock();
        temporal::get_timeline(&inner.conn, entity)
    }

    pub fn invalidate_fact(&self, fact_id: &str, at: DateTime<Utc>) -> Result<Fact> {
        let inner = self.lock();
        temporal::invalidate_fact(&inner.conn, fact_id, at)
    }

    /// Permanently delete a fact recorded in error. Returns `false` for an
    /// unknown id.
    pub fn delete_fact(&self, fact_id: &str) -> Result<bool> {
        let inner = self.lock();
        temporal::delete_fact(&inner.conn, fact_id)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let inner = self.lock();
        stats::store_stats(&inner.conn, self.db_path.as_deref())
    }
}

fn sort_hits(hits: &mut [QueryHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.memory.id.cmp(&b.memory.id))
    });
}

fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Memory>> {
    let memory = conn
        .query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
            params![id],
            memory_from_row,
        )
        .optional()?;
    Ok(memory)
}

/// Load, reinforce, and persist in one step.
fn reinforce_memory(
    conn: &Connection,
    config: &DecayConfig,
    id: &str,
    now: DateTime<Utc>,
) -> Result<Memory> {
    let mut memory = get_by_id(conn, id)?.ok_or_else(|| MemoryError::memory_not_found(id))?;
    decay::reinforce(config, &mut memory, now);
    conn.execute(
        "UPDATE memories SET salience = ?1, access_count = ?2, last_accessed_at = ?3 WHERE id = ?4",
        params![
            memory.salience,
            memory.access_count,
            format_ts(&memory.last_accessed_at),
            id
        ],
    )?;
    Ok(memory)
}

/// Insert the memory row and its auto-links inside one transaction.
fn insert_with_links(
    conn: &mut Connection,
    memory: &Memory,
    candidates: &[(String, f64)],
    link_threshold: f64,
    now: DateTime<Utc>,
) -> Result<Vec<WaypointEdge>> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO memories (id, content, scope, sector, embedding_key, salience, access_count, created_at, last_accessed_at, tags) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9)",
        params![
            memory.id,
            memory.content,
            memory.scope.as_str(),
            memory.sector.as_str(),
            memory.embedding_key,
            memory.salience,
            memory.access_count,
            format_ts(&now),
            serde_json::to_string(&memory.tags)?,
        ],
    )?;
    let links = waypoint::auto_link(&tx, &memory.id, candidates, link_threshold, now)?;
    tx.commit()?;
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::hashed::HashedEmbedder;
    use crate::embedding::linear::LinearIndex;

    fn test_store() -> MemoryStore {
        MemoryStore::in_memory(
            Scope::User,
            Arc::new(HashedEmbedder::default()),
            Box::new(LinearIndex::new()),
            EngramConfig::default(),
        )
        .unwrap()
    }

    /// Unit vector along one dimension, for deterministic similarities.
    fn axis(dim: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 256];
        v[dim] = 1.0;
        v
    }

    /// Unit vector with cosine `sim` against `axis(dim)`.
    fn near_axis(dim: usize, other: usize, sim: f32) -> Vec<f32> {
        let mut v = vec![0.0f32; 256];
        v[dim] = sim;
        v[other] = (1.0 - sim * sim).sqrt();
        v
    }

    #[test]
    fn store_and_get_round_trip() {
        let store = test_store();
        let result = store
            .store("A mutex guarantees exclusive access", &["rust".to_string()])
            .unwrap();
        assert!(!result.deduplicated);
        assert_eq!(result.memory.scope, Scope::User);
        assert_eq!(result.memory.salience, 1.0);

        let fetched = store.get(&result.memory.id).unwrap();
        assert_eq!(fetched.content, "A mutex guarantees exclusive access");
        assert_eq!(fetched.tags, vec!["rust".to_string()]);
        assert_eq!(fetched.embedding_key, fetched.id);

        assert!(matches!(
            store.get("missing"),
            Err(MemoryError::NotFound { .. })
        ));
    }

    #[test]
    fn near_duplicate_reinforces_instead_of_inserting() {
        let store = test_store();
        let first = store
            .store_embedded("original phrasing", &[], axis(0))
            .unwrap();

        // Cosine 0.95 against the first vector, above the 0.9 gate
        let second = store
            .store_embedded("slightly different phrasing", &[], near_axis(0, 1, 0.95))
            .unwrap();

        assert!(second.deduplicated);
        assert_eq!(second.memory.id, first.memory.id);
        assert_eq!(second.memory.access_count, 1);
        assert_eq!(store.list(None).unwrap().len(), 1);
        // Dedup keeps the original content
        assert_eq!(second.memory.content, "original phrasing");
    }

    #[test]
    fn similar_but_distinct_memories_are_auto_linked() {
        let store = test_store();
        let first = store.store_embedded("first topic", &[], axis(0)).unwrap();

        // Cosine 0.8: above the 0.75 link threshold, below the dedup gate
        let second = store
            .store_embedded("adjacent topic", &[], near_axis(0, 1, 0.8))
            .unwrap();

        assert!(!second.deduplicated);
        assert_eq!(second.links.len(), 1);
        let edge = &second.links[0];
        let pair = [edge.from_id.as_str(), edge.to_id.as_str()];
        assert!(pair.contains(&first.memory.id.as_str()));
        assert!(pair.contains(&second.memory.id.as_str()));
        assert!((edge.weight - 0.8).abs() < 0.01);
    }

    #[test]
    fn unrelated_memories_are_not_linked() {
        let store = test_store();
        store.store_embedded("one thing", &[], axis(0)).unwrap();
        let second = store.store_embedded("another", &[], axis(1)).unwrap();
        assert!(second.links.is_empty());
    }

    #[test]
    fn query_ranks_closer_memories_first_and_reinforces() {
        let store = test_store();
        let close = store.store_embedded("close match", &[], axis(0)).unwrap();
        let far = store
            .store_embedded("far match", &[], near_axis(0, 1, 0.3))
            .unwrap();

        let hits = store.query_embedded("close match", &axis(0), 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].memory.id, close.memory.id);
        assert_eq!(hits[1].memory.id, far.memory.id);
        assert!(hits[0].score > hits[1].score);

        // Retrieval counted as access
        assert!(hits.iter().all(|h| h.memory.access_count == 1));
        let persisted = store.get(&far.memory.id).unwrap();
        assert_eq!(persisted.access_count, 1);
        assert!(persisted.salience >= 1.0 - 1e-9);
    }

    #[test]
    fn query_expands_through_waypoints() {
        let store = test_store();
        let seed = store.store_embedded("seed", &[], axis(0)).unwrap();
        // Linked to the seed (0.8) but orthogonal to the query vector
        let neighbor = store
            .store_embedded("neighbor", &[], near_axis(0, 1, 0.8))
            .unwrap();
        assert_eq!(neighbor.links.len(), 1);

        // Expansion from the seed must not duplicate the direct hit
        let hits = store.query_embedded("seed", &axis(0), 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.memory.id.as_str()).collect();
        assert!(ids.contains(&seed.memory.id.as_str()));
        assert!(ids.contains(&neighbor.memory.id.as_str()));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn delete_removes_row_vector_and_edges() {
        let store = test_store();
        let first = store.store_embedded("first", &[], axis(0)).unwrap();
        let second = store
            .store_embedded("second", &[], near_axis(0, 1, 0.8))
            .unwrap();
        assert_eq!(second.links.len(), 1);

        assert!(store.delete(&first.memory.id).unwrap());
        assert!(!store.delete(&first.memory.id).unwrap());

        // Edge cascaded away, vector gone from search
        let survivors = store.query_embedded("second", &axis(0), 10).unwrap();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].memory.id, second.memory.id);
        let stats = store.stats().unwrap();
        assert_eq!(stats.waypoint_edges, 0);
        assert_eq!(stats.total_memories, 1);
    }

    #[test]
    fn deleting_a_source_memory_leaves_facts_dangling() {
        let store = test_store();
        let result = store.store("the project uses sqlite", &[]).unwrap();
        store
            .store_fact(
                "project",
                "uses",
                "sqlite",
                Utc::now(),
                0.9,
                Some(&result.memory.id),
            )
            .unwrap();

        assert!(store.delete(&result.memory.id).unwrap());
        let facts = store.get_timeline("project").unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(
            facts[0].source_memory_id.as_deref(),
            Some(result.memory.id.as_str())
        );
    }

    #[test]
    fn delete_all_clears_memories_but_keeps_facts() {
        let store = test_store();
        let first = store.store_embedded("first", &[], axis(0)).unwrap();
        let second = store
            .store_embedded("second", &[], near_axis(0, 1, 0.8))
            .unwrap();
        assert_eq!(second.links.len(), 1);
        let fact = store
            .store_fact(
                "project",
                "uses",
                "sqlite",
                Utc::now(),
                0.9,
                Some(&first.memory.id),
            )
            .unwrap();

        assert_eq!(store.delete_all().unwrap(), 2);
        assert_eq!(store.delete_all().unwrap(), 0);

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_memories, 0);
        assert_eq!(stats.waypoint_edges, 0);
        assert_eq!(stats.facts.total, 1);

        // Vectors are gone from search as well
        assert!(store.query_embedded("first", &axis(0), 10).unwrap().is_empty());

        // An erroneous fact can still be purged afterwards
        assert!(store.delete_fact(&fact.id).unwrap());
        assert!(!store.delete_fact(&fact.id).unwrap());
    }

    #[test]
    fn failed_insert_rolls_the_vector_back() {
        let store = test_store();
        let ghost = store.store_embedded("ghost", &[], axis(0)).unwrap();
        // Drop the row behind the index entry so the next auto-link hits a
        // foreign key violation mid-transaction
        store
            .lock()
            .conn
            .execute("DELETE FROM memories WHERE id = ?1", params![ghost.memory.id])
            .unwrap();

        let result = store.store_embedded("doomed", &[], near_axis(0, 1, 0.8));
        assert!(matches!(result, Err(MemoryError::Storage(_))));

        // Neither the row nor the vector survived the failed store
        assert!(store.list(None).unwrap().is_empty());
        let hits = store.query_embedded("doomed", &near_axis(0, 1, 0.8), 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn list_filters_by_sector() {
        let store = test_store();
        store
            .store("Yesterday I went to the conference and met the team", &[])
            .unwrap();
        store
            .store("A semaphore is a synchronization primitive, a known fact", &[])
            .unwrap();

        let episodic = store.list(Some(Sector::Episodic)).unwrap();
        assert_eq!(episodic.len(), 1);
        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn explicit_reinforce_bumps_salience_and_count() {
        let store = test_store();
        let result = store.store("something worth keeping", &[]).unwrap();

        let reinforced = store.reinforce(&result.memory.id).unwrap();
        assert_eq!(reinforced.access_count, 1);

        assert!(matches!(
            store.reinforce("missing"),
            Err(MemoryError::NotFound { .. })
        ));
    }

    #[test]
    fn maintenance_pass_on_fresh_store_is_a_no_op() {
        let store = test_store();
        store.store("fresh memory", &[]).unwrap();
        store
            .store_fact("a", "b", "c", Utc::now(), 1.0, None)
            .unwrap();

        let report = store.apply_decay().unwrap();
        assert_eq!(report.memories_updated, 0);
        assert_eq!(report.facts_decayed, 0);
        assert_eq!(report.edges_pruned, 0);
    }

    #[test]
    fn manual_links_are_managed_through_the_store() {
        let store = test_store();
        let a = store.store_embedded("one topic", &[], axis(0)).unwrap();
        let b = store.store_embedded("unrelated", &[], axis(1)).unwrap();
        let (a, b) = (a.memory.id, b.memory.id);

        let edge = store.link(&a, &b, 0.6, Some("contradicts")).unwrap();
        assert_eq!(edge.relation, "contradicts");
        assert_eq!(store.neighbors(&a, None).unwrap(), vec![(b.clone(), 0.6)]);

        let edge = store.set_link_weight(&a, &b, 0.2).unwrap();
        assert!((edge.weight - 0.2).abs() < 1e-12);

        let reinforced = store.reinforce_path(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(reinforced, 1);
        assert!((store.neighbors(&a, None).unwrap()[0].1 - 0.25).abs() < 1e-9);

        assert_eq!(store.unlink(&a).unwrap(), 1);
        assert!(store.neighbors(&a, None).unwrap().is_empty());
        // Unlinking does not delete the memory
        assert!(store.get(&a).is_ok());
    }

    #[test]
    fn changed_embedding_dimensions_refuse_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.db");
        let config = EngramConfig::default();

        MemoryStore::open(
            &path,
            Scope::User,
            Arc::new(HashedEmbedder::default()),
            Box::new(LinearIndex::new()),
            config.clone(),
        )
        .unwrap();

        let reopened = MemoryStore::open(
            &path,
            Scope::User,
            Arc::new(HashedEmbedder::new(128)),
            Box::new(LinearIndex::new()),
            config,
        );
        assert!(reopened.is_err());
    }

    #[test]
    fn rehydration_rebuilds_a_lost_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.db");
        let embedder: Arc<HashedEmbedder> = Arc::new(HashedEmbedder::default());
        let config = EngramConfig::default();

        let id = {
            let store = MemoryStore::open(
                &path,
                Scope::User,
                embedder.clone(),
                Box::new(LinearIndex::new()),
                config.clone(),
            )
            .unwrap();
            store.store("a memory that must survive", &[]).unwrap().memory.id
        };

        // Reopen with an empty index: the row is re-embedded at open
        let store = MemoryStore::open(
            &path,
            Scope::User,
            embedder,
            Box::new(LinearIndex::new()),
            config,
        )
        .unwrap();
        let hits = store.query("a memory that must survive", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory.id, id);
    }
}
