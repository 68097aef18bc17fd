//! Error kinds shared across the crate.
//!
//! Mutating operations abort with no partial effect when any of these are
//! returned: the SQL transaction is rolled back and any vector-index write is
//! undone by the caller.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// The embedding/vector collaborator is unreachable or timed out.
    /// Store and query operations abort; retries belong to the caller.
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Lookup by an unknown id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A fact was inserted at a timestamp not strictly after the latest
    /// `valid_from` for its (subject, predicate) key. Historical backfill is
    /// not supported; the caller must correct the timestamp.
    #[error("out-of-order fact for ({subject}, {predicate}): {at} is not after {latest}")]
    OutOfOrderFact {
        subject: String,
        predicate: String,
        at: String,
        latest: String,
    },

    /// A structural invariant was violated (self-loop edge, duplicate open
    /// fact, salience out of range). Should never occur under the documented
    /// contract; the mutating operation is aborted.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemoryError {
    /// Shorthand for a memory-id miss.
    pub fn memory_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "memory",
            id: id.into(),
        }
    }

    /// Shorthand for a fact-id miss.
    pub fn fact_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "fact",
            id: id.into(),
        }
    }
}
