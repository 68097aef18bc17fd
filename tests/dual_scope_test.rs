mod helpers;

use chrono::{Duration, Utc};
use engram::memory::{Scope, ScopeChoice, Sector};
use engram::MemoryError;
use helpers::test_manager;

#[test]
fn project_knowledge_routes_to_the_project_store() {
    let manager = test_manager();
    let result = manager
        .store(
            "This project uses FastAPI for REST APIs",
            &[],
            ScopeChoice::Auto,
        )
        .unwrap();

    assert_eq!(result.memory.scope, Scope::Project);
    assert_eq!(result.memory.sector, Sector::Semantic);
    assert!(result.confidence.unwrap() >= 0.65);
}

#[test]
fn preferences_route_to_the_user_store() {
    let manager = test_manager();
    let result = manager
        .store(
            "I prefer pytest over unittest for testing",
            &[],
            ScopeChoice::Auto,
        )
        .unwrap();

    assert_eq!(result.memory.scope, Scope::User);
    assert!(result.confidence.unwrap() >= 0.65);
}

#[test]
fn ambiguous_content_defaults_to_the_user_store() {
    let manager = test_manager();
    let result = manager
        .store("xylophone quark nebula marmalade", &[], ScopeChoice::Auto)
        .unwrap();

    assert_eq!(result.memory.scope, Scope::User);
    assert!(result.confidence.unwrap() < 0.65);
}

#[test]
fn pinned_scope_overrides_the_classifier() {
    let manager = test_manager();
    let result = manager
        .store(
            "I prefer pytest over unittest for testing",
            &[],
            ScopeChoice::Fixed(Scope::Project),
        )
        .unwrap();

    assert_eq!(result.memory.scope, Scope::Project);
    assert!(result.confidence.is_none());
}

#[test]
fn recall_prefers_the_project_copy_of_duplicated_knowledge() {
    let manager = test_manager();
    let content = "alpha bravo charlie delta echo";
    manager
        .store(content, &[], ScopeChoice::Fixed(Scope::Project))
        .unwrap();
    manager
        .store(content, &[], ScopeChoice::Fixed(Scope::User))
        .unwrap();

    let hits = manager.recall(content, Some(5)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].scope, Scope::Project);
}

#[test]
fn recall_merges_distinct_knowledge_from_both_stores() {
    let manager = test_manager();
    manager
        .store("alpha bravo charlie", &[], ScopeChoice::Fixed(Scope::Project))
        .unwrap();
    manager
        .store("delta echo foxtrot", &[], ScopeChoice::Fixed(Scope::User))
        .unwrap();

    let hits = manager.recall("alpha bravo charlie", Some(5)).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].scope, Scope::Project);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn fact_timelines_merge_across_scopes() {
    let manager = test_manager();
    let now = Utc::now();
    manager
        .store_fact(
            Scope::Project,
            "service",
            "depends_on",
            "postgres",
            now - Duration::days(10),
            1.0,
            None,
        )
        .unwrap();
    manager
        .store_fact(
            Scope::User,
            "me",
            "works_on",
            "service",
            now - Duration::days(5),
            1.0,
            None,
        )
        .unwrap();

    let timeline = manager.get_timeline("service").unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].scope, Scope::Project);
    assert_eq!(timeline[1].scope, Scope::User);
    assert!(timeline[0].fact.valid_from <= timeline[1].fact.valid_from);
}

#[test]
fn fact_supersession_is_visible_at_query_time() {
    let manager = test_manager();
    let now = Utc::now();
    manager
        .store_fact(
            Scope::Project,
            "service",
            "depends_on",
            "postgres",
            now - Duration::days(10),
            1.0,
            None,
        )
        .unwrap();
    manager
        .store_fact(
            Scope::Project,
            "service",
            "depends_on",
            "cockroachdb",
            now - Duration::days(2),
            1.0,
            None,
        )
        .unwrap();

    let current = manager
        .query_facts(Some("service"), Some("depends_on"), None, now)
        .unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].fact.object, "cockroachdb");

    let before = manager
        .query_facts(
            Some("service"),
            Some("depends_on"),
            None,
            now - Duration::days(5),
        )
        .unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].fact.object, "postgres");
}

#[test]
fn out_of_order_facts_are_rejected() {
    let manager = test_manager();
    let now = Utc::now();
    manager
        .store_fact(Scope::User, "me", "uses", "helix", now, 1.0, None)
        .unwrap();

    let backfill = manager.store_fact(
        Scope::User,
        "me",
        "uses",
        "vim",
        now - Duration::days(30),
        1.0,
        None,
    );
    assert!(matches!(backfill, Err(MemoryError::OutOfOrderFact { .. })));
}

#[test]
fn stats_are_reported_per_store() {
    let manager = test_manager();
    manager
        .store("alpha bravo charlie", &[], ScopeChoice::Fixed(Scope::Project))
        .unwrap();
    manager
        .store("delta echo foxtrot", &[], ScopeChoice::Fixed(Scope::User))
        .unwrap();
    manager
        .store("golf hotel india", &[], ScopeChoice::Fixed(Scope::User))
        .unwrap();

    let stats = manager.stats().unwrap();
    assert_eq!(stats.project.total_memories, 1);
    assert_eq!(stats.user.total_memories, 2);
}
