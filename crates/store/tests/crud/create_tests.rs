//! Tests for record creation.
//!
//! This module tests the `create` method of the typed repository against
//! the in-memory backend.

use std::sync::Arc;

use tessera_store::backends::MemoryStore;
use tessera_store::tenant::Realm;
use tessera_store::{DocumentStore, Repository, StoreError};

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

// ============================================================================
// Create Tests
// ============================================================================

/// Test that creating a record succeeds and returns the stored entity.
#[tokio::test]
async fn test_create_returns_stored_entity() {
    let repository = create_repository();
    let realm = create_realm();
    let ticket = Ticket::new("t-1", "Printer on fire");

    let created = repository
        .create(&realm, &ticket)
        .await
        .expect("create should succeed");

    assert_eq!(created, ticket);
}

/// Test that a created record is visible to subsequent reads.
#[tokio::test]
async fn test_create_persists_for_reads() {
    let repository = create_repository();
    let realm = create_realm();
    let ticket = Ticket::new("t-2", "VPN drops hourly")
        .with_priority(1)
        .with_tags(vec!["network", "urgent"]);

    repository
        .create(&realm, &ticket)
        .await
        .expect("create should succeed");

    let found = repository
        .get_by_id(&realm, "t-2")
        .await
        .expect("read should succeed");
    assert_eq!(found, Some(ticket));
}

/// Test that creating two records with the same id reports a
/// duplicate-key creation failure.
#[tokio::test]
async fn test_create_duplicate_id_fails() {
    let repository = create_repository();
    let realm = create_realm();

    repository
        .create(&realm, &Ticket::new("t-3", "First"))
        .await
        .expect("first create should succeed");
    let result = repository.create(&realm, &Ticket::new("t-3", "Second")).await;

    match result {
        Err(StoreError::CreationFailed { collection, source }) => {
            assert_eq!(collection, "tickets");
            assert!(source.is_duplicate_key());
        }
        other => panic!("expected a duplicate-key creation failure, got {other:?}"),
    }
}

/// Test that records land in the collection the repository is bound to.
#[tokio::test]
async fn test_create_scoped_to_collection() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let tickets: Repository<Ticket> = Repository::new(Arc::clone(&store), "tickets");
    let archive: Repository<Ticket> = Repository::new(store, "archived_tickets");
    let realm = create_realm();

    tickets
        .create(&realm, &Ticket::new("t-4", "Keyboard missing keys"))
        .await
        .expect("create should succeed");

    let misfiled = archive
        .get_by_id(&realm, "t-4")
        .await
        .expect("read should succeed");
    assert!(misfiled.is_none(), "record must not leak across collections");
}
