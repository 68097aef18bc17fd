//! Waypoint association graph between memories.
//!
//! Edges are semantically undirected and stored once under canonical
//! `(min, max)` id ordering, so re-linking the same pair can never create a
//! duplicate. Association discovery stays outside this module: `auto_link`
//! takes similarity candidates as input rather than searching itself, which
//! keeps the graph free of embedding dependencies and independently
//! testable.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{format_ts, ts_from_sql};
use crate::error::{MemoryError, Result};
use crate::memory::types::WaypointEdge;

/// Default relation label for an edge.
pub const DEFAULT_RELATION: &str = "related";

/// Per-hop damping applied to accumulated weight during expansion.
const EXPANSION_DAMPING: f64 = 0.8;

/// Weight boost applied to each edge of a reinforced path.
const PATH_REINFORCE_BOOST: f64 = 0.05;

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<WaypointEdge> {
    let created: String = row.get(4)?;
    let updated: String = row.get(5)?;
    Ok(WaypointEdge {
        from_id: row.get(0)?,
        to_id: row.get(1)?,
        weight: row.get(2)?,
        relation: row.get(3)?,
        created_at: ts_from_sql(&created)?,
        updated_at: ts_from_sql(&updated)?,
    })
}

/// Canonical unordered-pair ordering. Self-loops are an invariant violation.
fn canonical<'a>(a: &'a str, b: &'a str) -> Result<(&'a str, &'a str)> {
    match a.cmp(b) {
        std::cmp::Ordering::Less => Ok((a, b)),
        std::cmp::Ordering::Greater => Ok((b, a)),
        std::cmp::Ordering::Equal => Err(MemoryError::InvariantViolation(format!(
            "self-loop waypoint edge on {a}"
        ))),
    }
}

/// Create or strengthen an edge between two memories.
///
/// An existing edge keeps the maximum of its current and the proposed
/// weight; use [`set_weight`] to override downward explicitly.
pub fn link(
    conn: &Connection,
    a: &str,
    b: &str,
    weight: f64,
    relation: Option<&str>,
    now: DateTime<Utc>,
) -> Result<WaypointEdge> {
    let (from_id, to_id) = canonical(a, b)?;
    let weight = weight.clamp(0.0, 1.0);
    let now_str = format_ts(&now);

    let existing: Option<f64> = conn
        .query_row(
            "SELECT weight FROM waypoints WHERE from_id = ?1 AND to_id = ?2",
            params![from_id, to_id],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(current) => {
            // Merging keeps a deliberate label unless the caller names a new one
            let merged = current.max(weight);
            conn.execute(
                "UPDATE waypoints SET weight = ?1, relation = COALESCE(?2, relation), \
                 updated_at = ?3 WHERE from_id = ?4 AND to_id = ?5",
                params![merged, relation, now_str, from_id, to_id],
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO waypoints (from_id, to_id, weight, relation, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    from_id,
                    to_id,
                    weight,
                    relation.unwrap_or(DEFAULT_RELATION),
                    now_str
                ],
            )?;
        }
    }

    get_edge(conn, from_id, to_id)?
        .ok_or_else(|| MemoryError::InvariantViolation("edge vanished after link".into()))
}

/// Explicitly overwrite an edge's weight, ignoring the max-merge rule.
pub fn set_weight(
    conn: &Connection,
    a: &str,
    b: &str,
    weight: f64,
    now: DateTime<Utc>,
) -> Result<WaypointEdge> {
    let (from_id, to_id) = canonical(a, b)?;
    let affected = conn.execute(
        "UPDATE waypoints SET weight = ?1, updated_at = ?2 WHERE from_id = ?3 AND to_id = ?4",
        params![weight.clamp(0.0, 1.0), format_ts(&now), from_id, to_id],
    )?;
    if affected == 0 {
        return Err(MemoryError::NotFound {
            kind: "waypoint edge",
            id: format!("{from_id}~{to_id}"),
        });
    }
    get_edge(conn, from_id, to_id)?
        .ok_or_else(|| MemoryError::InvariantViolation("edge vanished after update".into()))
}

fn get_edge(conn: &Connection, from_id: &str, to_id: &str) -> Result<Option<WaypointEdge>> {
    let edge = conn
        .query_row(
            "SELECT from_id, to_id, weight, relation, created_at, updated_at \
             FROM waypoints WHERE from_id = ?1 AND to_id = ?2",
            params![from_id, to_id],
            edge_from_row,
        )
        .optional()?;
    Ok(edge)
}

/// Link a freshly stored memory to every candidate at or above the
/// similarity threshold, with edge weight = similarity. Candidates are
/// supplied by the external vector collaborator, ranked or not.
pub fn auto_link(
    conn: &Connection,
    memory_id: &str,
    candidates: &[(String, f64)],
    threshold: f64,
    now: DateTime<Utc>,
) -> Result<Vec<WaypointEdge>> {
    let mut edges = Vec::new();
    for (candidate_id, similarity) in candidates {
        if candidate_id == memory_id {
            continue;
        }
        if *similarity < threshold {
            continue;
        }
        edges.push(link(conn, memory_id, candidate_id, *similarity, None, now)?);
    }
    Ok(edges)
}

/// Neighbors of a memory with their edge weights, descending by weight.
pub fn neighbors(
    conn: &Connection,
    memory_id: &str,
    min_weight: Option<f64>,
) -> Result<Vec<(String, f64)>> {
    let floor = min_weight.unwrap_or(0.0);
    let mut stmt = conn.prepare(
        "SELECT CASE WHEN from_id = ?1 THEN to_id ELSE from_id END AS other, weight \
         FROM waypoints \
         WHERE (from_id = ?1 OR to_id = ?1) AND weight >= ?2 \
         ORDER BY weight DESC, other ASC",
    )?;

    let rows = stmt
        .query_map(params![memory_id, floor], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Remove every edge touching a memory. Returns the number removed.
pub fn unlink(conn: &Connection, memory_id: &str) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM waypoints WHERE from_id = ?1 OR to_id = ?1",
        params![memory_id],
    )?;
    Ok(removed)
}

/// Drop edges whose weight fell below the floor. Returns the number pruned.
pub fn prune_weak(conn: &Connection, min_weight: f64) -> Result<usize> {
    let pruned = conn.execute(
        "DELETE FROM waypoints WHERE weight < ?1",
        params![min_weight],
    )?;
    if pruned > 0 {
        tracing::debug!(pruned, min_weight, "weak waypoint edges pruned");
    }
    Ok(pruned)
}

/// A memory reached by graph expansion, with its accumulated path weight.
#[derive(Debug, Clone, Serialize)]
pub struct Expansion {
    pub memory_id: String,
    /// Product of edge weights along the path, damped per hop.
    pub weight: f64,
    /// Traversal path from the seed to this memory, inclusive.
    pub path: Vec<String>,
}

/// Breadth-first expansion from seed memories through the association graph.
///
/// Accumulated weight decays multiplicatively along the path; branches below
/// `min_weight` are pruned. Used to surface related memories that direct
/// similarity search missed.
pub fn expand(
    conn: &Connection,
    seeds: &[String],
    max_expansion: usize,
    min_weight: f64,
) -> Result<Vec<Expansion>> {
    use std::collections::{HashSet, VecDeque};

    let mut visited: HashSet<String> = seeds.iter().cloned().collect();
    let mut queue: VecDeque<Expansion> = seeds
        .iter()
        .map(|id| Expansion {
            memory_id: id.clone(),
            weight: 1.0,
            path: vec![id.clone()],
        })
        .collect();
    let mut expanded = Vec::new();

    while let Some(current) = queue.pop_front() {
        if expanded.len() >= max_expansion {
            break;
        }
        for (neighbor_id, edge_weight) in neighbors(conn, &current.memory_id, None)? {
            if visited.contains(&neighbor_id) {
                continue;
            }
            let weight = current.weight * edge_weight * EXPANSION_DAMPING;
            if weight < min_weight {
                continue;
            }

            let mut path = current.path.clone();
            path.push(neighbor_id.clone());
            let item = Expansion {
                memory_id: neighbor_id.clone(),
                weight,
                path,
            };
            visited.insert(neighbor_id);
            expanded.push(item.clone());
            queue.push_back(item);

            if expanded.len() >= max_expansion {
                break;
            }
        }
    }

    expanded.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.memory_id.cmp(&b.memory_id))
    });
    Ok(expanded)
}

/// Strengthen every edge along a traversal path that led to a used result.
pub fn reinforce_path(conn: &Connection, path: &[String], now: DateTime<Utc>) -> Result<usize> {
    if path.len() < 2 {
        return Ok(0);
    }

    let now_str = format_ts(&now);
    let mut reinforced = 0usize;
    for pair in path.windows(2) {
        let (from_id, to_id) = canonical(&pair[0], &pair[1])?;
        reinforced += conn.execute(
            "UPDATE waypoints SET weight = MIN(weight + ?1, 1.0), updated_at = ?2 \
             WHERE from_id = ?3 AND to_id = ?4",
            params![PATH_REINFORCE_BOOST, now_str, from_id, to_id],
        )?;
    }
    Ok(reinforced)
}
