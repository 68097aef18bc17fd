//! Temporal knowledge graph: time-versioned subject–predicate–object facts.
//!
//! Facts carry a half-open validity window `[valid_from, valid_until)`;
//! `valid_until = NULL` means still true. Storing a new fact for a
//! (subject, predicate) key closes the currently open one, so the key holds
//! at most one open fact at any time. Facts are appended in non-decreasing
//! time order per key — historical backfill is rejected as
//! [`MemoryError::OutOfOrderFact`].

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{format_ts, ts_from_sql};
use crate::error::{MemoryError, Result};
use crate::memory::types::Fact;

/// Confidence never decays below this floor.
const CONFIDENCE_FLOOR: f64 = 0.1;

fn fact_from_row(row: &Row<'_>) -> rusqlite::Result<Fact> {
    let valid_from: String = row.get(4)?;
    let valid_until: Option<String> = row.get(5)?;
    Ok(Fact {
        id: row.get(0)?,
        subject: row.get(1)?,
        predicate: row.get(2)?,
        object: row.get(3)?,
        valid_from: ts_from_sql(&valid_from)?,
        valid_until: valid_until.as_deref().map(ts_from_sql).transpose()?,
        confidence: row.get(6)?,
        source_memory_id: row.get(7)?,
    })
}

const FACT_COLUMNS: &str =
    "id, subject, predicate, object, valid_from, valid_until, confidence, source_memory_id";

/// Store a fact, closing any open fact for the same (subject, predicate).
///
/// `at` must be strictly after the latest `valid_from` already recorded for
/// the key. The close-then-insert pair runs in one transaction; on error
/// nothing is persisted.
pub fn store_fact(
    conn: &mut Connection,
    subject: &str,
    predicate: &str,
    object: &str,
    at: DateTime<Utc>,
    confidence: f64,
    source_memory_id: Option<&str>,
) -> Result<Fact> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(MemoryError::InvariantViolation(format!(
            "fact confidence out of range: {confidence}"
        )));
    }

    let at_str = format_ts(&at);
    let tx = conn.transaction()?;

    // Append-only per key: the new fact must begin after every prior one
    let latest: Option<String> = tx
        .query_row(
            "SELECT MAX(valid_from) FROM facts WHERE subject = ?1 AND predicate = ?2",
            params![subject, predicate],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    if let Some(latest) = latest {
        if at_str <= latest {
            return Err(MemoryError::OutOfOrderFact {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                at: at_str,
                latest,
            });
        }
    }

    // Close the open fact for this key, if any. More than one open fact
    // means the invariant was already broken — surface, don't paper over.
    let open_ids: Vec<String> = {
        let mut stmt = tx.prepare(
            "SELECT id FROM facts WHERE subject = ?1 AND predicate = ?2 AND valid_until IS NULL",
        )?;
        let collected = stmt
            .query_map(params![subject, predicate], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };
    if open_ids.len() > 1 {
        return Err(MemoryError::InvariantViolation(format!(
            "multiple open facts for ({subject}, {predicate})"
        )));
    }
    if let Some(open_id) = open_ids.first() {
        tx.execute(
            "UPDATE facts SET valid_until = ?1 WHERE id = ?2",
            params![at_str, open_id],
        )?;
    }

    let fact = Fact {
        id: uuid::Uuid::now_v7().to_string(),
        subject: subject.to_string(),
        predicate: predicate.to_string(),
        object: object.to_string(),
        valid_from: at,
        valid_until: None,
        confidence,
        source_memory_id: source_memory_id.map(str::to_string),
    };

    tx.execute(
        "INSERT INTO facts (id, subject, predicate, object, valid_from, valid_until, confidence, source_memory_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)",
        params![
            fact.id,
            fact.subject,
            fact.predicate,
            fact.object,
            at_str,
            fact.confidence,
            fact.source_memory_id,
        ],
    )?;

    tx.commit()?;
    tracing::debug!(subject, predicate, at = %at_str, "fact stored");
    Ok(fact)
}

/// Facts matching the filters and valid at `at`. Unspecified filter fields
/// match all values.
pub fn query_facts(
    conn: &Connection,
    subject: Option<&str>,
    predicate: Option<&str>,
    object: Option<&str>,
    at: DateTime<Utc>,
) -> Result<Vec<Fact>> {
    let at_str = format_ts(&at);
    let mut stmt = conn.prepare(&format!(
        "SELECT {FACT_COLUMNS} FROM facts \
         WHERE (?1 IS NULL OR subject = ?1) \
           AND (?2 IS NULL OR predicate = ?2) \
           AND (?3 IS NULL OR object = ?3) \
           AND valid_from <= ?4 \
           AND (valid_until IS NULL OR valid_until > ?4) \
         ORDER BY valid_from ASC, id ASC"
    ))?;

    let facts = stmt
        .query_map(params![subject, predicate, object, at_str], fact_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(facts)
}

/// Full chronological history of an entity, matched as subject or object.
/// Unknown entities yield an empty sequence, not an error.
pub fn get_timeline(conn: &Connection, entity: &str) -> Result<Vec<Fact>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FACT_COLUMNS} FROM facts \
         WHERE subject = ?1 OR object = ?1 \
         ORDER BY valid_from ASC, id ASC"
    ))?;

    let facts = stmt
        .query_map(params![entity], fact_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(facts)
}

/// Close a fact's validity window at `at` without inserting a successor.
pub fn invalidate_fact(conn: &Connection, fact_id: &str, at: DateTime<Utc>) -> Result<Fact> {
    let fact: Option<Fact> = conn
        .query_row(
            &format!("SELECT {FACT_COLUMNS} FROM facts WHERE id = ?1"),
            params![fact_id],
            fact_from_row,
        )
        .optional()?;

    let mut fact = fact.ok_or_else(|| MemoryError::fact_not_found(fact_id))?;
    if at < fact.valid_from {
        return Err(MemoryError::InvariantViolation(format!(
            "valid_until before valid_from for fact {fact_id}"
        )));
    }

    conn.execute(
        "UPDATE facts SET valid_until = ?1 WHERE id = ?2",
        params![format_ts(&at), fact_id],
    )?;
    fact.valid_until = Some(at);
    Ok(fact)
}

/// Permanently remove a fact, history and all. Prefer [`invalidate_fact`]
/// when the fact was once true; deletion is for facts recorded in error.
/// Returns `false` for an unknown id.
pub fn delete_fact(conn: &Connection, fact_id: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM facts WHERE id = ?1", params![fact_id])?;
    if removed > 0 {
        tracing::debug!(fact_id, "fact deleted");
    }
    Ok(removed > 0)
}

/// Decay the confidence of open facts by `rate` per elapsed day since
/// `valid_from`, with a fixed floor. Returns the number of facts updated.
pub fn apply_confidence_decay(
    conn: &Connection,
    rate_per_day: f64,
    now: DateTime<Utc>,
) -> Result<usize> {
    struct Open {
        id: String,
        confidence: f64,
        valid_from: DateTime<Utc>,
    }

    let open: Vec<Open> = {
        let mut stmt = conn.prepare(
            "SELECT id, confidence, valid_from FROM facts \
             WHERE valid_until IS NULL AND confidence > ?1",
        )?;
        let collected = stmt
            .query_map(params![CONFIDENCE_FLOOR], |row| {
                let valid_from: String = row.get(2)?;
                Ok(Open {
                    id: row.get(0)?,
                    confidence: row.get(1)?,
                    valid_from: ts_from_sql(&valid_from)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };

    let mut updated = 0usize;
    for fact in open {
        let days = ((now - fact.valid_from).num_milliseconds().max(0)) as f64 / 86_400_000.0;
        let decayed = (fact.confidence * (1.0 - rate_per_day * days)).max(CONFIDENCE_FLOOR);
        if (decayed - fact.confidence).abs() > 1e-9 {
            conn.execute(
                "UPDATE facts SET confidence = ?1 WHERE id = ?2",
                params![decayed, fact.id],
            )?;
            updated += 1;
        }
    }
    Ok(updated)
}

/// Aggregate counts over the fact graph.
#[derive(Debug, Serialize)]
pub struct FactStats {
    pub total: u64,
    pub active: u64,
    pub closed: u64,
    pub unique_subjects: u64,
    pub unique_predicates: u64,
}

pub fn fact_stats(conn: &Connection) -> Result<FactStats> {
    let (total, active): (u64, u64) = conn.query_row(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE valid_until IS NULL) FROM facts",
        [],
        |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
    )?;
    let (unique_subjects, unique_predicates): (u64, u64) = conn.query_row(
        "SELECT COUNT(DISTINCT subject), COUNT(DISTINCT predicate) FROM facts",
        [],
        |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
    )?;

    Ok(FactStats {
        total,
        active,
        closed: total - active,
        unique_subjects,
        unique_predicates,
    })
}
