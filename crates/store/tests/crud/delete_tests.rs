//! Tests for single-record and bulk deletes.

use std::sync::Arc;

use bson::Bson;
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
// Delete Tests
// ============================================================================

/// Test that deleting a record removes it from reads.
#[tokio::test]
async fn test_delete_removes_record() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-1", "Short lived")).await;

    repository
        .delete(&realm, "t-1")
        .await
        .expect("delete should succeed");

    let found = repository.get_by_id(&realm, "t-1").await.expect("read");
    assert!(found.is_none());
}

/// Test that deleting an absent record is tolerated.
#[tokio::test]
async fn test_delete_missing_is_ok() {
    let repository = create_repository();
    let realm = create_realm();

    let result = repository.delete(&realm, "never-existed").await;

    assert!(result.is_ok());
}

/// Test that a bulk delete by ids removes the listed records and
/// reports how many existed.
#[tokio::test]
async fn test_bulk_delete_by_ids() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-1", "One")).await;
    seed(&repository, &realm, Ticket::new("t-2", "Two")).await;
    seed(&repository, &realm, Ticket::new("t-3", "Three")).await;

    let ids = vec!["t-1".to_string(), "t-3".to_string(), "ghost".to_string()];
    let removed = repository
        .bulk_delete_by_ids(&realm, &ids)
        .await
        .expect("bulk delete should succeed");

    assert_eq!(removed, 2);
    let survivor = repository.get_by_id(&realm, "t-2").await.expect("read");
    assert!(survivor.is_some());
}

/// Test that an empty id list deletes nothing and reports zero.
#[tokio::test]
async fn test_bulk_delete_by_ids_empty_list() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-1", "Keep me")).await;

    let removed = repository
        .bulk_delete_by_ids(&realm, &[])
        .await
        .expect("bulk delete should succeed");

    assert_eq!(removed, 0);
    assert!(repository
        .get_by_id(&realm, "t-1")
        .await
        .expect("read")
        .is_some());
}

/// Test that a bulk delete by filters removes only the matches.
#[tokio::test]
async fn test_bulk_delete_by_filters() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-1", "One")).await;
    seed(
        &repository,
        &realm,
        Ticket::new("t-2", "Two").with_status("closed"),
    )
    .await;
    seed(
        &repository,
        &realm,
        Ticket::new("t-3", "Three").with_status("closed"),
    )
    .await;

    let closed =
        QueryDescriptor::new().with_filter("status", FieldCondition::Eq(Bson::from("closed")));
    let removed = repository
        .bulk_delete_by_filters(&realm, &closed)
        .await
        .expect("bulk delete should succeed");

    assert_eq!(removed, 2);
    assert!(repository
        .get_by_id(&realm, "t-1")
        .await
        .expect("read")
        .is_some());
}

/// Test that bulk deletes refuse to run without filter criteria.
#[tokio::test]
async fn test_bulk_delete_requires_criteria() {
    let repository = create_repository();
    let realm = create_realm();
    seed(&repository, &realm, Ticket::new("t-1", "Safe")).await;

    let unfiltered = QueryDescriptor::new();
    let result = repository.bulk_delete_by_filters(&realm, &unfiltered).await;

    assert!(matches!(
        result,
        Err(StoreError::InvalidQueryParameters { .. })
    ));
    assert!(repository
        .get_by_id(&realm, "t-1")
        .await
        .expect("read")
        .is_some());
}
