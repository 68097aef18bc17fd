//! Core type definitions.
//!
//! Defines [`Scope`] (which physical store owns a memory), [`Sector`] (the
//! five cognitive categories), [`Memory`] (a full record), [`Fact`] (a
//! temporal assertion), and [`WaypointEdge`] (an association between two
//! memories).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level partition of memories. Set once at creation, immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Knowledge about the codebase/system being worked on.
    Project,
    /// Knowledge about the person: preferences, habits, general knowledge.
    User,
}

impl Scope {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "user" => Ok(Self::User),
            _ => Err(format!("unknown scope: {s}")),
        }
    }
}

/// The five cognitive sectors. Mutable — a memory can be re-classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    /// Events, experiences, time-specific memories — fast decay.
    Episodic,
    /// Facts, knowledge, definitions — slow decay, the ambiguity default.
    Semantic,
    /// How-to, steps, instructions — medium decay.
    Procedural,
    /// Feelings, attitudes, reactions — fastest decay.
    Emotional,
    /// Insights, lessons, meta-cognition — slowest decay.
    Reflective,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Episodic,
        Sector::Semantic,
        Sector::Procedural,
        Sector::Emotional,
        Sector::Reflective,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Emotional => "emotional",
            Self::Reflective => "reflective",
        }
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episodic" => Ok(Self::Episodic),
            "semantic" => Ok(Self::Semantic),
            "procedural" => Ok(Self::Procedural),
            "emotional" => Ok(Self::Emotional),
            "reflective" => Ok(Self::Reflective),
            _ => Err(format!("unknown sector: {s}")),
        }
    }
}

/// A stored unit of knowledge, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key. Immutable.
    pub id: String,
    /// The original text content.
    pub content: String,
    /// Owning store. Immutable after creation.
    pub scope: Scope,
    /// Cognitive category; may be re-classified later.
    pub sector: Sector,
    /// Handle into the external vector index. The embedding itself is not
    /// owned by this record.
    pub embedding_key: String,
    /// Retrieval-priority score in `[0.0, 1.0]`; decays over time and is
    /// boosted by reinforcement.
    pub salience: f64,
    /// Number of reinforcements (explicit or retrieval-driven).
    pub access_count: u32,
    pub created_at: DateTime<Utc>,
    /// Always `>= created_at`.
    pub last_accessed_at: DateTime<Utc>,
    /// Free-form labels.
    pub tags: Vec<String>,
}

/// A timestamped subject–predicate–object assertion with a validity window.
///
/// For any (subject, predicate) pair, at most one fact is open-ended
/// (`valid_until == None`) at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// UUID v7 primary key.
    pub id: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// When the fact became true.
    pub valid_from: DateTime<Utc>,
    /// When it stopped being true; `None` means still valid.
    pub valid_until: Option<DateTime<Utc>>,
    /// Certainty in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Weak back-reference to the memory that produced this fact. May dangle
    /// after that memory is deleted; the fact persists regardless.
    pub source_memory_id: Option<String>,
}

impl Fact {
    /// Whether the fact is valid at the given instant
    /// (`valid_from <= at < valid_until`).
    pub fn valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_until.map_or(true, |until| until > at)
    }
}

/// An undirected association between two memories, stored once under
/// canonical `from_id < to_id` ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointEdge {
    pub from_id: String,
    pub to_id: String,
    /// Association strength in `[0.0, 1.0]`.
    pub weight: f64,
    /// Relation label, `"related"` by default.
    pub relation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
