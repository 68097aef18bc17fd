use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::memory::types::Sector;
use crate::temporal::{self, FactStats};

/// Aggregate view over one scope store.
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_memories: u64,
    pub by_sector: HashMap<String, u64>,
    /// Mean of the persisted (last-materialized) salience values.
    pub average_salience: f64,
    pub waypoint_edges: u64,
    pub facts: FactStats,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

/// Compute store statistics.
///
/// `db_path` is used for file size calculation; pass None for in-memory
/// databases.
pub fn store_stats(conn: &Connection, db_path: Option<&Path>) -> Result<StoreStats> {
    let (total, average_salience): (u64, Option<f64>) = conn.query_row(
        "SELECT COUNT(*), AVG(salience) FROM memories",
        [],
        |row| Ok((row.get::<_, i64>(0)? as u64, row.get(1)?)),
    )?;

    let mut by_sector = HashMap::new();
    for sector in Sector::ALL {
        by_sector.insert(sector.as_str().to_string(), 0);
    }
    let mut stmt = conn.prepare("SELECT sector, COUNT(*) FROM memories GROUP BY sector")?;
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (sector, count) in rows {
        by_sector.insert(sector, count as u64);
    }

    let waypoint_edges: u64 = conn.query_row("SELECT COUNT(*) FROM waypoints", [], |row| {
        Ok(row.get::<_, i64>(0)? as u64)
    })?;

    let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM memories",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StoreStats {
        total_memories: total,
        by_sector,
        average_salience: average_salience.unwrap_or(0.0),
        waypoint_edges,
        facts: temporal::fact_stats(conn)?,
        db_size_bytes,
        oldest_memory: oldest,
        newest_memory: newest,
    })
}
