//! Scope and sector classification.
//!
//! Both classifiers are pure functions of their exemplar configuration and
//! the input text: re-running `classify` with the same inputs is
//! deterministic, and no classification decision is cached as hidden state.

pub mod scope;
pub mod sector;

pub use scope::{ScopeClassifier, ScopeDecision};
pub use sector::{sector_affinity, SectorClassifier};
