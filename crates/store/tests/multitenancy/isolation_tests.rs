//! Tests for realm isolation.
//!
//! Every realm maps to its own database, so records, reservations, and
//! lifecycle operations in one realm must never be visible in another.

use std::sync::Arc;

use tessera_store::backends::MemoryStore;
use tessera_store::tenant::Realm;
use tessera_store::{DocumentStore, LedgerKind, Repository, StoreError, UniquenessLedger};

use crate::common::fixtures::Ticket;

const EMAILS: LedgerKind = LedgerKind::new("email", "index_emails");

// ============================================================================
// Helper Functions
// ============================================================================

fn create_store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new())
}

// ============================================================================
// Record Isolation Tests
// ============================================================================

/// Test that records with the same id in different realms stay
/// separate.
#[tokio::test]
async fn test_records_are_isolated_by_realm() {
    let store = create_store();
    let repository: Repository<Ticket> = Repository::new(store, "tickets");
    let acme = Realm::new("acme");
    let globex = Realm::new("globex");

    repository
        .create(&acme, &Ticket::new("t-1", "Acme's ticket"))
        .await
        .expect("create");

    let cross = repository.get_by_id(&globex, "t-1").await.expect("read");
    assert!(cross.is_none(), "record must not be visible across realms");

    repository
        .create(&globex, &Ticket::new("t-1", "Globex's ticket"))
        .await
        .expect("same id in another realm should succeed");
    let ours = repository
        .get_by_id(&acme, "t-1")
        .await
        .expect("read")
        .expect("record exists");
    assert_eq!(ours.title, "Acme's ticket");
}

/// Test that deleting in one realm leaves the other realm's record
/// intact.
#[tokio::test]
async fn test_delete_is_scoped_to_realm() {
    let store = create_store();
    let repository: Repository<Ticket> = Repository::new(store, "tickets");
    let acme = Realm::new("acme");
    let globex = Realm::new("globex");

    repository
        .create(&acme, &Ticket::new("t-1", "Acme's ticket"))
        .await
        .expect("create");
    repository
        .create(&globex, &Ticket::new("t-1", "Globex's ticket"))
        .await
        .expect("create");

    repository.delete(&acme, "t-1").await.expect("delete");

    assert!(repository.get_by_id(&acme, "t-1").await.expect("read").is_none());
    assert!(repository
        .get_by_id(&globex, "t-1")
        .await
        .expect("read")
        .is_some());
}

// ============================================================================
// Ledger Isolation Tests
// ============================================================================

/// Test that uniqueness reservations are per realm.
#[tokio::test]
async fn test_ledger_reservations_are_per_realm() {
    let store = create_store();
    let ledger = UniquenessLedger::new(store);
    let acme = Realm::new("acme");
    let globex = Realm::new("globex");

    ledger
        .register(&acme, EMAILS, "kim@example.com")
        .await
        .expect("first reservation");
    ledger
        .register(&globex, EMAILS, "kim@example.com")
        .await
        .expect("same value in another realm should succeed");

    let duplicate = ledger.register(&acme, EMAILS, "kim@example.com").await;
    assert!(matches!(duplicate, Err(StoreError::Conflict { .. })));
}

// ============================================================================
// Database Lifecycle Tests
// ============================================================================

/// Test that database names carry the configured prefix.
#[test]
fn test_database_names_carry_prefix() {
    let store = MemoryStore::with_database_prefix("tessera_");
    let realm = Realm::new("acme");

    assert_eq!(store.database_name(&realm), "tessera_acme");
    assert_eq!(store.database(&realm).name(), "tessera_acme");
}

/// Test that dropping one realm's database leaves the others alone.
#[tokio::test]
async fn test_drop_database_clears_only_one_realm() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let repository: Repository<Ticket> = Repository::new(Arc::clone(&store), "tickets");
    let acme = Realm::new("acme");
    let globex = Realm::new("globex");

    repository
        .create(&acme, &Ticket::new("t-1", "Acme's ticket"))
        .await
        .expect("create");
    repository
        .create(&globex, &Ticket::new("t-1", "Globex's ticket"))
        .await
        .expect("create");

    let dropped = store
        .drop_database(&store.database_name(&acme))
        .await
        .expect("drop should succeed");
    assert!(dropped);

    assert!(repository.get_by_id(&acme, "t-1").await.expect("read").is_none());
    assert!(repository
        .get_by_id(&globex, "t-1")
        .await
        .expect("read")
        .is_some());
}

/// Test that only realms holding data show up in the database listing.
#[tokio::test]
async fn test_list_databases_reflects_data() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let repository: Repository<Ticket> = Repository::new(Arc::clone(&store), "tickets");
    let acme = Realm::new("acme");
    let globex = Realm::new("globex");
    let idle = Realm::new("idle");

    repository
        .create(&acme, &Ticket::new("t-1", "One"))
        .await
        .expect("create");
    repository
        .create(&globex, &Ticket::new("t-1", "Two"))
        .await
        .expect("create");
    // resolving a handle without writing must not surface a database
    let _ = store.database(&idle);

    let databases = store.list_databases().await.expect("list");
    assert_eq!(databases, vec!["acme".to_string(), "globex".to_string()]);

    assert!(store.database_exists("acme").await.expect("exists"));
    assert!(!store.database_exists("idle").await.expect("exists"));
}
