//! SQL DDL for the per-scope database.
//!
//! Defines the `memories`, `facts`, `waypoints`, and `schema_meta` tables.
//! All DDL uses `IF NOT EXISTS` for idempotent initialization. Each scope
//! (project, user) owns a full copy of this schema in its own database file;
//! the two stores never share rows.

use rusqlite::Connection;

/// All schema DDL statements for a scope store.
const SCHEMA_SQL: &str = r#"
-- Memory records. The embedding itself lives in the external vector index;
-- embedding_key is the handle into it.
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    scope TEXT NOT NULL CHECK(scope IN ('project','user')),
    sector TEXT NOT NULL CHECK(sector IN ('episodic','semantic','procedural','emotional','reflective')),
    embedding_key TEXT NOT NULL,
    salience REAL NOT NULL DEFAULT 1.0 CHECK(salience >= 0.0 AND salience <= 1.0),
    access_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_accessed_at TEXT NOT NULL,
    tags TEXT,
    CHECK(last_accessed_at >= created_at)
);

CREATE INDEX IF NOT EXISTS idx_memories_sector ON memories(sector);
CREATE INDEX IF NOT EXISTS idx_memories_salience ON memories(salience);

-- Temporal fact graph. source_memory_id is a weak back-reference: no FK,
-- it may dangle after the source memory is deleted.
CREATE TABLE IF NOT EXISTS facts (
    id TEXT PRIMARY KEY,
    subject TEXT NOT NULL,
    predicate TEXT NOT NULL,
    object TEXT NOT NULL,
    valid_from TEXT NOT NULL,
    valid_until TEXT,
    confidence REAL NOT NULL DEFAULT 1.0 CHECK(confidence >= 0.0 AND confidence <= 1.0),
    source_memory_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_facts_key ON facts(subject, predicate);
CREATE INDEX IF NOT EXISTS idx_facts_object ON facts(object);
CREATE INDEX IF NOT EXISTS idx_facts_valid_from ON facts(valid_from);

-- Association edges, stored once per unordered pair under canonical
-- (from_id < to_id) ordering. Deleting a memory cascades its edges.
CREATE TABLE IF NOT EXISTS waypoints (
    from_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    to_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    weight REAL NOT NULL CHECK(weight >= 0.0 AND weight <= 1.0),
    relation TEXT NOT NULL DEFAULT 'related',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (from_id, to_id),
    CHECK(from_id < to_id)
);

CREATE INDEX IF NOT EXISTS idx_waypoints_to ON waypoints(to_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
