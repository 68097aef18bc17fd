//! Memory storage and retrieval.
//!
//! [`store::MemoryStore`] owns one scope database plus its vector index and
//! runs the full store/query pipelines. [`dual::DualMemoryManager`] pairs a
//! project store with a user store and routes between them.

pub mod dual;
pub mod stats;
pub mod store;
pub mod types;

pub use dual::{DualMemoryManager, DualStoreResult, RecallHit, ScopeChoice, ScopedFact};
pub use store::{MaintenanceReport, MemoryStore, QueryHit, StoreResult};
pub use types::{Fact, Memory, Scope, Sector, WaypointEdge};
