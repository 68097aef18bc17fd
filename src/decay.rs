//! Salience decay and reinforcement.
//!
//! Salience decays exponentially with time since last access. The half-life
//! stretches with usage — frequently accessed memories decay slower — and
//! with the memory's sector: reflective insights outlive emotional
//! reactions. Reinforcement bumps the access count and raises salience with
//! diminishing returns; it never lowers it. Batch decay persists recomputed
//! salience but deletes nothing; pruning is an explicit external operation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Deserialize;

use crate::db::format_ts;
use crate::error::Result;
use crate::memory::types::{Memory, Sector};

/// Changes smaller than this are not persisted by batch decay.
const SALIENCE_EPSILON: f64 = 0.001;

/// Decay policy knobs. Only monotonicity and clamping are contractual; the
/// numeric defaults are tunable policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Base half-life in days for an unaccessed memory.
    pub base_half_life_days: f64,
    /// Salience boost applied on reinforcement, with diminishing returns.
    pub reinforce_boost: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            base_half_life_days: 30.0,
            reinforce_boost: 0.15,
        }
    }
}

/// Sector multiplier on the base half-life. Ordering mirrors the sectors'
/// decay characters: reflective slowest, emotional fastest.
pub fn sector_half_life_multiplier(sector: Sector) -> f64 {
    match sector {
        Sector::Reflective => 3.0,
        Sector::Semantic => 1.5,
        Sector::Procedural => 1.0,
        Sector::Episodic => 0.5,
        Sector::Emotional => 0.4,
    }
}

/// Effective half-life in days for a memory: the base, stretched by the
/// sector multiplier and by `log(1 + access_count)`.
pub fn half_life_days(config: &DecayConfig, sector: Sector, access_count: u32) -> f64 {
    config.base_half_life_days
        * sector_half_life_multiplier(sector)
        * (1.0 + (1.0 + access_count as f64).ln())
}

/// Current salience of a memory at `now`, computed lazily from the persisted
/// base salience. Strictly decreasing in elapsed time for a fixed access
/// count; clamped to `[0, 1]`. Clock skew (`now` before the last access) is
/// treated as zero elapsed time.
pub fn current_salience(config: &DecayConfig, memory: &Memory, now: DateTime<Utc>) -> f64 {
    let elapsed_ms = (now - memory.last_accessed_at).num_milliseconds().max(0);
    let elapsed_days = elapsed_ms as f64 / 86_400_000.0;
    let half_life = half_life_days(config, memory.sector, memory.access_count);

    (memory.salience * (-elapsed_days / half_life).exp()).clamp(0.0, 1.0)
}

/// Reinforce a memory in place: bump the access count, stamp the access
/// time, and raise salience by `boost * (1 - salience)`. Never decreases
/// salience.
pub fn reinforce(config: &DecayConfig, memory: &mut Memory, now: DateTime<Utc>) {
    memory.access_count += 1;
    if now > memory.last_accessed_at {
        memory.last_accessed_at = now;
    }
    memory.salience =
        (memory.salience + config.reinforce_boost * (1.0 - memory.salience)).clamp(0.0, 1.0);
}

/// Recompute and persist salience for every memory in the store.
///
/// Returns the number of rows whose salience changed by more than an
/// epsilon. Never deletes a memory, no matter how low salience falls.
pub fn apply_decay(conn: &Connection, config: &DecayConfig, now: DateTime<Utc>) -> Result<usize> {
    struct Row {
        id: String,
        sector: Sector,
        salience: f64,
        access_count: u32,
        last_accessed_at: DateTime<Utc>,
    }

    let rows: Vec<Row> = {
        let mut stmt = conn.prepare(
            "SELECT id, sector, salience, access_count, last_accessed_at FROM memories",
        )?;
        let collected = stmt
            .query_map([], |row| {
                let sector_str: String = row.get(1)?;
                let last_str: String = row.get(4)?;
                Ok(Row {
                    id: row.get(0)?,
                    sector: sector_str.parse().map_err(|_| {
                        rusqlite::Error::InvalidColumnType(
                            1,
                            "sector".into(),
                            rusqlite::types::Type::Text,
                        )
                    })?,
                    salience: row.get(2)?,
                    access_count: row.get(3)?,
                    last_accessed_at: crate::db::ts_from_sql(&last_str)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };

    let mut updated = 0usize;
    for row in rows {
        let elapsed_ms = (now - row.last_accessed_at).num_milliseconds().max(0);
        let elapsed_days = elapsed_ms as f64 / 86_400_000.0;
        let half_life = half_life_days(config, row.sector, row.access_count);
        let new_salience = (row.salience * (-elapsed_days / half_life).exp()).clamp(0.0, 1.0);

        if (new_salience - row.salience).abs() > SALIENCE_EPSILON {
            conn.execute(
                "UPDATE memories SET salience = ?1 WHERE id = ?2",
                params![new_salience, row.id],
            )?;
            updated += 1;
        }
    }

    tracing::debug!(updated, now = %format_ts(&now), "batch decay applied");
    Ok(updated)
}
