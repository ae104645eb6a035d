//! Tests for single-record and bulk updates.
//!
//! Updates are merge-patches: `Null` values unset fields, everything
//! else is `$set`, and an allow-list guards which fields callers may
//! touch.

use std::sync::Arc;

use bson::{doc, Bson, Document};
use tessera_store::backends::MemoryStore;
use tessera_store::tenant::Realm;
use tessera_store::{DocumentStore, FieldCondition, QueryDescriptor, Repository, StoreError};

use crate::common::fixtures::Ticket;

// ============================================================================
// Helper Functions
// ============================================================================

fn create_repository() -> Repository<Ticket> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    Repository::new(store, "tickets")
}

fn create_realm() -> Realm {
    Realm::new("test-realm")
}

async fn seed(repository: &Repository<Ticket>, realm: &Realm, ticket: Ticket) {
    repository.create(realm, &ticket).await.expect("seed create");
}

// ============================================================================
// Update Tests - Single Record
// ============================================================================

/// Test that an update applies its fields and returns the post-image.
#[tokio::test]
async fn test_update_sets_fields() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-1", "Flickering screen")).await;

    let updated = repository
        .update(
            &realm,
            "t-1",
            doc! { "status": "triaged", "priority": 1 },
            &[],
        )
        .await
        .expect("update should succeed");

    assert_eq!(updated.status, "triaged");
    assert_eq!(updated.priority, 1);
    assert_eq!(updated.title, "Flickering screen");
}

/// Test that a `Null` value removes the field instead of storing null.
#[tokio::test]
async fn test_update_null_unsets_field() {
    let repository = create_repository();
    let realm = create_realm();
    seed(
        &repository,
        &realm,
        Ticket::new("t-2", "Reassign me").with_assignee("florence"),
    )
    .await;

    let updated = repository
        .update(&realm, "t-2", doc! { "assignee": Bson::Null }, &[])
        .await
        .expect("update should succeed");

    assert_eq!(updated.assignee, None);
}

/// Test that an empty change set is rejected before touching the store.
#[tokio::test]
async fn test_update_empty_payload_rejected() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-3", "Untouched")).await;

    let result = repository.update(&realm, "t-3", Document::new(), &[]).await;

    assert!(matches!(
        result,
        Err(StoreError::InvalidUpdatePayload { .. })
    ));
}

/// Test that updating an unknown id reports the record as missing.
#[tokio::test]
async fn test_update_unknown_id_not_found() {
    let repository = create_repository();
    let realm = create_realm();

    let result = repository
        .update(&realm, "ghost", doc! { "status": "closed" }, &[])
        .await;

    assert!(matches!(result, Err(StoreError::RecordNotFound { .. })));
}

/// Test that fields outside the allow-list are dropped from the patch.
#[tokio::test]
async fn test_update_filters_disallowed_fields() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-4", "Partial patch")).await;

    let updated = repository
        .update(
            &realm,
            "t-4",
            doc! { "status": "closed", "priority": 5 },
            &["status"],
        )
        .await
        .expect("update should succeed");

    assert_eq!(updated.status, "closed");
    assert_eq!(updated.priority, 3, "disallowed field must stay untouched");
}

/// Test that a patch with no permitted fields leaves the record alone
/// and returns its current state.
#[tokio::test]
async fn test_update_all_fields_filtered_returns_current() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-5", "Read only")).await;

    let returned = repository
        .update(&realm, "t-5", doc! { "priority": 5 }, &["status"])
        .await
        .expect("update should succeed");

    assert_eq!(returned.priority, 3);
    assert_eq!(returned.title, "Read only");
}

/// Test that a fully-filtered patch against a missing record still
/// reports it as missing.
#[tokio::test]
async fn test_update_all_fields_filtered_missing_record() {
    let repository = create_repository();
    let realm = create_realm();

    let result = repository
        .update(&realm, "ghost", doc! { "priority": 5 }, &["status"])
        .await;

    assert!(matches!(result, Err(StoreError::RecordNotFound { .. })));
}

// ============================================================================
// Update Tests - Bulk
// ============================================================================

/// Test that a bulk update touches exactly the records the filter
/// matches and reports how many changed.
#[tokio::test]
async fn test_bulk_update_by_filters_updates_matches() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-1", "One")).await;
    seed(&repository, &realm, Ticket::new("t-2", "Two")).await;
    seed(
        &repository,
        &realm,
        Ticket::new("t-3", "Three").with_status("closed"),
    )
    .await;

    let open = QueryDescriptor::new().with_filter("status", FieldCondition::Eq(Bson::from("open")));
    let changed = repository
        .bulk_update_by_filters(&realm, &open, doc! { "status": "triaged" }, &[])
        .await
        .expect("bulk update should succeed");

    assert_eq!(changed, 2);
    let triaged =
        QueryDescriptor::new().with_filter("status", FieldCondition::Eq(Bson::from("triaged")));
    assert_eq!(repository.count(&realm, &triaged).await.expect("count"), 2);
    let closed = repository
        .get_by_id(&realm, "t-3")
        .await
        .expect("read")
        .expect("record exists");
    assert_eq!(closed.status, "closed");
}

/// Test that bulk updates refuse to run without filter criteria, even
/// when a sort is present, and that this guard fires before payload
/// validation.
#[tokio::test]
async fn test_bulk_update_requires_criteria() {
    let repository = create_repository();
    let realm = create_realm();

    let unfiltered = QueryDescriptor::new();
    let result = repository
        .bulk_update_by_filters(&realm, &unfiltered, Document::new(), &[])
        .await;
    assert!(matches!(
        result,
        Err(StoreError::InvalidQueryParameters { .. })
    ));

    let sort_only = QueryDescriptor::new().with_sort(
        "createdAt",
        tessera_store::SortDirection::Desc,
    );
    let result = repository
        .bulk_update_by_filters(&realm, &sort_only, doc! { "status": "x" }, &[])
        .await;
    assert!(matches!(
        result,
        Err(StoreError::InvalidQueryParameters { .. })
    ));
}

/// Test that a filtered bulk update with an empty payload is rejected.
#[tokio::test]
async fn test_bulk_update_empty_payload_rejected() {
    let repository = create_repository();
    let realm = create_realm();

    let open = QueryDescriptor::new().with_filter("status", FieldCondition::Eq(Bson::from("open")));
    let result = repository
        .bulk_update_by_filters(&realm, &open, Document::new(), &[])
        .await;

    assert!(matches!(
        result,
        Err(StoreError::InvalidUpdatePayload { .. })
    ));
}
