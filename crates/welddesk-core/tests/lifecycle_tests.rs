use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::num::NonZeroUsize;
use std::sync::Arc;
use welddesk_core::prelude::*;
use welddesk_core::schema::collections;
use welddesk_core::{LifecycleError, TransitionError};
use welddesk_store::live::snapshots;
use welddesk_store::{EntityStatus, MemoryStore, Query, StoreLimits};
use welddesk_test_utils::{
    actor, count_with_status, entity, id, seed, seed_ordered, seed_project_tree, status_of,
};

fn service(store: &Arc<MemoryStore>) -> LifecycleService<MemoryStore> {
    LifecycleService::new(Arc::clone(store), &AppConfig::default()).unwrap()
}

fn signed_in() -> Session {
    Session::authenticated(actor())
}

/// Project with weld logs, materials and a two-section document library
fn seed_full_project(store: &MemoryStore) {
    seed_project_tree(store, "p1", 2, 3);
    seed(store, "materials", "m1", &[("projectId", "p1")]);
    seed(store, "documentLibraries", "lib1", &[("projectId", "p1")]);
    seed_ordered(store, "documentSections", "s1", 1000, &[("libraryId", "lib1")]);
    seed_ordered(store, "documentSections", "s2", 2000, &[("libraryId", "lib1")]);
    seed_ordered(store, "documents", "d1", 1000, &[("sectionId", "s1"), ("libraryId", "lib1")]);
    seed_ordered(store, "documents", "d2", 1000, &[("sectionId", "s2"), ("libraryId", "lib1")]);
}

#[tokio::test]
async fn test_anonymous_delete_is_rejected_before_any_read() {
    let store = Arc::new(MemoryStore::new());
    seed_full_project(&store);
    let service = service(&store);

    for session in [Session::anonymous(), Session::from_user(Some("")), Session::from_user(None)] {
        let err = service
            .delete(&session, RootKind::Project, &id("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::AuthRequired));
    }

    assert!(store.stats().queries.is_empty());
    assert!(store.stats().committed_groups.is_empty());
}

#[tokio::test]
async fn test_project_delete_reaches_every_collection() {
    let store = Arc::new(MemoryStore::new());
    seed_full_project(&store);
    seed_project_tree(&store, "p2", 1, 1);
    let service = service(&store);

    let preview = service
        .preview_delete(&signed_in(), RootKind::Project, &id("p1"))
        .await
        .unwrap();
    let report = service
        .delete(&signed_in(), RootKind::Project, &id("p1"))
        .await
        .unwrap();

    // project + 2 logs + 6 welds + material + library + 2 sections + 2 documents
    assert_eq!(report.planned_writes, 15);
    assert_eq!(preview.planned_writes, report.planned_writes);
    for collection in [
        collections::WELD_LOGS,
        collections::MATERIALS,
        collections::DOCUMENT_LIBRARIES,
        collections::DOCUMENT_SECTIONS,
        collections::DOCUMENTS,
    ] {
        // p2's weld log is the only survivor
        let expected = usize::from(collection == collections::WELD_LOGS);
        assert_eq!(count_with_status(&store, collection, EntityStatus::Active), expected);
    }
    assert_eq!(status_of(&store, "projects", "p2"), EntityStatus::Active);
    assert_eq!(count_with_status(&store, "welds", EntityStatus::Active), 1);
}

#[tokio::test]
async fn test_section_delete_only_reaches_its_documents() {
    let store = Arc::new(MemoryStore::new());
    seed_full_project(&store);
    let service = service(&store);

    let report = service
        .delete(&signed_in(), RootKind::DocumentSection, &id("s1"))
        .await
        .unwrap();

    assert_eq!(report.planned_writes, 2);
    assert_eq!(status_of(&store, "documents", "d1"), EntityStatus::Deleted);
    assert_eq!(status_of(&store, "documents", "d2"), EntityStatus::Active);
    assert_eq!(status_of(&store, "documentSections", "s2"), EntityStatus::Active);
}

#[tokio::test]
async fn test_archive_restore_and_terminal_delete() {
    let store = Arc::new(MemoryStore::new());
    seed_full_project(&store);
    let service = service(&store);
    let materials = "materials".into();

    assert!(service.archive(&signed_in(), &materials, &id("m1")).await.unwrap());
    assert_eq!(status_of(&store, "materials", "m1"), EntityStatus::Archived);
    assert!(!service.archive(&signed_in(), &materials, &id("m1")).await.unwrap());

    assert!(service.restore(&signed_in(), &materials, &id("m1")).await.unwrap());
    assert_eq!(status_of(&store, "materials", "m1"), EntityStatus::Active);

    assert!(service.delete_single(&signed_in(), &materials, &id("m1")).await.unwrap());
    let m1 = entity(&store, "materials", "m1");
    assert!(m1.is_deleted());
    assert_eq!(m1.deleted_by.as_deref(), Some("inspector-1"));

    let err = service
        .restore(&signed_in(), &materials, &id("m1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Transition(TransitionError {
            from: EntityStatus::Deleted,
            to: EntityStatus::Active
        })
    ));
}

#[tokio::test]
async fn test_single_delete_refuses_records_with_dependents() {
    let store = Arc::new(MemoryStore::new());
    seed_full_project(&store);
    let service = service(&store);

    for (collection, doc) in [
        ("projects", "p1"),
        ("weldLogs", "p1-log0"),
        ("documentLibraries", "lib1"),
        ("documentSections", "s1"),
    ] {
        let err = service
            .delete_single(&signed_in(), &collection.into(), &id(doc))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::CascadeRequired(ref c) if c.as_str() == collection));
        assert_eq!(status_of(&store, collection, doc), EntityStatus::Active);
    }
    assert!(store.stats().committed_groups.is_empty());

    // Leaf records still go through
    assert!(service
        .delete_single(&signed_in(), &"welds".into(), &id("p1-log0-w0"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_status_change_on_missing_record() {
    let store = Arc::new(MemoryStore::new());
    let service = service(&store);

    let err = service
        .archive(&signed_in(), &"materials".into(), &id("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}

#[tokio::test]
async fn test_move_writes_only_two_siblings() {
    let store = Arc::new(MemoryStore::new());
    for (doc, order) in [("a", 1000), ("b", 2000), ("c", 3000)] {
        seed_ordered(&store, "documents", doc, order, &[("sectionId", "s1")]);
    }
    let service = service(&store);
    let scope = OrderScope::documents(id("s1"));

    let outcome = service
        .move_item(&signed_in(), &scope, &id("b"), MoveDirection::Up)
        .await
        .unwrap();

    assert!(outcome.moved);
    assert_eq!(outcome.writes, 2);
    assert!(!outcome.renumbered);
    assert_eq!(store.stats().committed_groups, vec![2]);
    assert_eq!(entity(&store, "documents", "b").order(), Some(1000));
    assert_eq!(entity(&store, "documents", "a").order(), Some(2000));
    assert_eq!(entity(&store, "documents", "c").order(), Some(3000));
}

#[tokio::test]
async fn test_move_respects_configured_group_limit() {
    let store = Arc::new(MemoryStore::new());
    for (doc, order) in [("a", 1000), ("b", 2000), ("c", 3000)] {
        seed_ordered(&store, "documents", doc, order, &[("sectionId", "s1")]);
    }
    let limits = StoreLimits::default().with_max_group_ops(NonZeroUsize::new(1).unwrap());
    let config = AppConfig::default().with_store(limits);
    let service = LifecycleService::new(Arc::clone(&store), &config).unwrap();

    let outcome = service
        .move_item(&signed_in(), &OrderScope::documents(id("s1")), &id("c"), MoveDirection::Up)
        .await
        .unwrap();

    assert_eq!(outcome.writes, 2);
    assert_eq!(store.stats().committed_groups, vec![1, 1]);
    assert_eq!(entity(&store, "documents", "c").order(), Some(2000));
    assert_eq!(entity(&store, "documents", "b").order(), Some(3000));
}

#[tokio::test]
async fn test_move_at_boundary_is_noop() {
    let store = Arc::new(MemoryStore::new());
    for (doc, order) in [("a", 1000), ("b", 2000)] {
        seed_ordered(&store, "documents", doc, order, &[("sectionId", "s1")]);
    }
    let service = service(&store);
    let scope = OrderScope::documents(id("s1"));

    let up = service
        .move_item(&signed_in(), &scope, &id("a"), MoveDirection::Up)
        .await
        .unwrap();
    let down = service
        .move_item(&signed_in(), &scope, &id("b"), MoveDirection::Down)
        .await
        .unwrap();

    assert!(!up.moved && !down.moved);
    assert!(store.stats().committed_groups.is_empty());
}

#[tokio::test]
async fn test_move_in_descending_scope() {
    let store = Arc::new(MemoryStore::new());
    // Newest first: c (3000), b (2000), a (1000)
    for (doc, order) in [("a", 1000), ("b", 2000), ("c", 3000)] {
        seed_ordered(&store, "documents", doc, order, &[("sectionId", "s1")]);
    }
    let service = service(&store);
    let scope = OrderScope::documents(id("s1")).with_direction(SortDirection::Descending);

    let outcome = service
        .move_item(&signed_in(), &scope, &id("a"), MoveDirection::Up)
        .await
        .unwrap();

    assert_eq!(outcome.writes, 2);
    assert_eq!(entity(&store, "documents", "a").order(), Some(2000));
    assert_eq!(entity(&store, "documents", "b").order(), Some(1000));
}

#[tokio::test]
async fn test_move_requires_auth_and_membership() {
    let store = Arc::new(MemoryStore::new());
    seed_ordered(&store, "documents", "a", 1000, &[("sectionId", "s1")]);
    let service = service(&store);
    let scope = OrderScope::documents(id("s1"));

    let err = service
        .move_item(&Session::anonymous(), &scope, &id("a"), MoveDirection::Down)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::AuthRequired));

    let err = service
        .move_item(&signed_in(), &scope, &id("zz"), MoveDirection::Down)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}

#[tokio::test]
async fn test_next_order_appends_after_highest_live_sibling() {
    let store = Arc::new(MemoryStore::new());
    let service = service(&store);
    let scope = OrderScope::document_sections(id("lib1"));

    assert_eq!(service.next_order(&scope).await.unwrap(), 1000);

    seed_ordered(&store, "documentSections", "s1", 1000, &[("libraryId", "lib1")]);
    seed_ordered(&store, "documentSections", "s2", 3000, &[("libraryId", "lib1")]);
    assert_eq!(service.next_order(&scope).await.unwrap(), 4000);

    service
        .delete(&signed_in(), RootKind::DocumentSection, &id("s2"))
        .await
        .unwrap();
    assert_eq!(service.next_order(&scope).await.unwrap(), 2000);
}

#[tokio::test]
async fn test_live_snapshot_follows_cascade() {
    let store = Arc::new(MemoryStore::new());
    seed_full_project(&store);
    let service = service(&store);

    let query = Query::new("welds".into()).live_only();
    let mut live = Box::pin(snapshots(Arc::clone(&store), query));
    assert_eq!(live.next().await.unwrap().unwrap().len(), 6);

    service
        .delete(&signed_in(), RootKind::WeldLog, &id("p1-log0"))
        .await
        .unwrap();

    assert_eq!(live.next().await.unwrap().unwrap().len(), 3);
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("welddesk.toml");
    std::fs::write(
        &path,
        "[store]\nmax_in_values = 10\n\n[ordering]\ngap = 100\nbase = 100\n",
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();

    assert_eq!(config.store.max_in_values.get(), 10);
    assert_eq!(config.store.max_group_ops.get(), 500);
    assert_eq!(config.ordering.gap.get(), 100);
    assert_eq!(config.ordering.base, 100);
}
