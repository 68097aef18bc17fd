//! Cognitive memory core for AI agents — scoped, sectored, decaying memory
//! with a temporal knowledge graph.
//!
//! Engram sits on top of an opaque embedding/vector-search backend and gives
//! a calling agent higher-level memory semantics. Incoming text is routed
//! into one of two physical stores (project vs. user) and tagged with one of
//! five cognitive sectors, each with its own decay behavior:
//!
//! | Sector | Purpose | Decay |
//! |--------|---------|-------|
//! | **Episodic** | Events, sessions, time-specific experiences | Fast |
//! | **Semantic** | Facts, knowledge, definitions | Slow |
//! | **Procedural** | How-to, steps, workflows | Medium |
//! | **Emotional** | Affect, attitudes, reactions | Fastest |
//! | **Reflective** | Insights, lessons, meta-cognition | Slowest |
//!
//! # Architecture
//!
//! - **Storage**: one SQLite database per scope (memories, facts, waypoint
//!   edges), opened in WAL mode
//! - **Embeddings**: delegated to an [`embedding::EmbeddingProvider`] /
//!   [`embedding::VectorIndex`] pair — the core never embeds or runs
//!   nearest-neighbor search itself
//! - **Retrieval**: vector similarity re-ranked by cross-sector affinity and
//!   time/usage-decayed salience, with association-graph expansion
//!
//! # Modules
//!
//! - [`config`] — configuration from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, and migrations
//! - [`embedding`] — collaborator traits plus deterministic reference impls
//! - [`classify`] — scope (project/user) and sector classifiers
//! - [`decay`] — salience decay and reinforcement
//! - [`temporal`] — point-in-time-queryable fact graph
//! - [`waypoint`] — weighted association edges between memories
//! - [`memory`] — [`memory::store::MemoryStore`] and
//!   [`memory::dual::DualMemoryManager`]

pub mod classify;
pub mod config;
pub mod db;
pub mod decay;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod temporal;
pub mod waypoint;

pub use error::{MemoryError, Result};
