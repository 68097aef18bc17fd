mod helpers;

use chrono::Utc;
use engram::memory::{Scope, ScopeChoice};
use engram::MemoryError;
use helpers::{test_manager, test_store};

#[test]
fn deleting_a_memory_removes_row_vector_and_edges() {
    let store = test_store(Scope::Project);
    let first = store.store("alpha bravo charlie delta echo", &[]).unwrap();
    let second = store
        .store("alpha bravo charlie delta foxtrot", &[])
        .unwrap();
    assert_eq!(second.links.len(), 1);

    assert!(store.delete(&first.memory.id).unwrap());

    assert!(matches!(
        store.get(&first.memory.id),
        Err(MemoryError::NotFound { .. })
    ));
    let stats = store.stats().unwrap();
    assert_eq!(stats.total_memories, 1);
    assert_eq!(stats.waypoint_edges, 0);

    // The vector is gone from search too
    let hits = store.query("alpha bravo charlie delta echo", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory.id, second.memory.id);
}

#[test]
fn deleting_an_unknown_id_reports_false() {
    let store = test_store(Scope::User);
    assert!(!store.delete("01900000-0000-7000-8000-000000000000").unwrap());
}

#[test]
fn facts_survive_their_source_memory() {
    let store = test_store(Scope::Project);
    let stored = store.store("alpha bravo charlie", &[]).unwrap();
    store
        .store_fact(
            "service",
            "uses",
            "sqlite",
            Utc::now(),
            0.9,
            Some(&stored.memory.id),
        )
        .unwrap();

    assert!(store.delete(&stored.memory.id).unwrap());

    let timeline = store.get_timeline("service").unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(
        timeline[0].source_memory_id.as_deref(),
        Some(stored.memory.id.as_str())
    );
}

#[test]
fn manager_delete_falls_through_to_the_owning_store() {
    let manager = test_manager();
    let result = manager
        .store("delta echo foxtrot", &[], ScopeChoice::Fixed(Scope::User))
        .unwrap();

    assert!(manager.delete(&result.memory.id).unwrap());
    assert!(!manager.delete(&result.memory.id).unwrap());
    assert!(matches!(
        manager.get(&result.memory.id),
        Err(MemoryError::NotFound { .. })
    ));
}
