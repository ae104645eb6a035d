//! Tests for end-to-end account provisioning.

use tessera_accounts::collections::{ACCOUNT_IDS, EMAILS, PHONES};
use tessera_accounts::{AccountError, AccountRecord, ProviderError};

use crate::common::harness::{create_harness, create_realm, seed_group};

// ============================================================================
// Happy Path Tests
// ============================================================================

/// Test that provisioning creates the provider user, the account, the
/// linkage record, and all ledger reservations.
#[tokio::test]
async fn test_provision_stores_account_and_linkage() {
    let harness = create_harness();
    let realm = create_realm();
    seed_group(&harness.store, &realm, "g-1").await;
    let account = AccountRecord::new("acct-1", "ada")
        .with_email("ada@example.com")
        .with_phone("555-0100")
        .with_name("Ada", "Lovelace")
        .with_group_ids(["g-1"]);

    let created = harness
        .service
        .provision(&realm, account)
        .await
        .expect("provision should succeed");

    assert_eq!(created.id, "acct-1");
    assert_eq!(created.username, "ada");

    let loaded = harness
        .service
        .load_artifacts(&realm, "acct-1")
        .await
        .expect("both records exist");
    assert_eq!(loaded.secrets.provider_user_id, "kc-1");
    assert_eq!(loaded.account.email.as_deref(), Some("ada@example.com"));

    let provider_user = harness.provider.user("kc-1").expect("user at provider");
    assert_eq!(provider_user.username.as_deref(), Some("ada"));
    assert_eq!(provider_user.email.as_deref(), Some("ada@example.com"));
    assert_eq!(provider_user.first_name.as_deref(), Some("Ada"));

    assert!(harness
        .ledger
        .is_registered(&realm, ACCOUNT_IDS, "acct-1")
        .await
        .expect("lookup"));
    assert!(harness
        .ledger
        .is_registered(&realm, EMAILS, "ada@example.com")
        .await
        .expect("lookup"));
    assert!(harness
        .ledger
        .is_registered(&realm, PHONES, "555-0100")
        .await
        .expect("lookup"));
}

/// Test that a blank id is replaced with a generated one during
/// provisioning.
#[tokio::test]
async fn test_provision_generates_missing_id() {
    let harness = create_harness();
    let realm = create_realm();

    let created = harness
        .service
        .provision(&realm, AccountRecord::new("", "sasha"))
        .await
        .expect("provision should succeed");

    assert!(!created.id.is_empty());
    assert!(created.id.parse::<i64>().is_ok());
    let fetched = harness
        .service
        .get(&realm, &created.id)
        .await
        .expect("read")
        .expect("record exists");
    assert_eq!(fetched.username, "sasha");
}

/// Test that accounts without contact details reserve nothing beyond
/// their id.
#[tokio::test]
async fn test_provision_without_contacts_skips_reservations() {
    let harness = create_harness();
    let realm = create_realm();

    harness
        .service
        .provision(&realm, AccountRecord::new("acct-2", "quiet"))
        .await
        .expect("provision should succeed");

    assert_eq!(harness.ledger.count(&realm, EMAILS).await.expect("count"), 0);
    assert_eq!(harness.ledger.count(&realm, PHONES).await.expect("count"), 0);
    assert_eq!(
        harness
            .ledger
            .count(&realm, ACCOUNT_IDS)
            .await
            .expect("count"),
        1
    );
}

// ============================================================================
// Failure Path Tests
// ============================================================================

/// Test that identifier conflicts are caught before the provider is
/// contacted.
#[tokio::test]
async fn test_provision_conflict_precedes_provider_call() {
    let harness = create_harness();
    let realm = create_realm();
    harness
        .ledger
        .register(&realm, EMAILS, "taken@example.com")
        .await
        .expect("reserve email");

    let result = harness
        .service
        .provision(
            &realm,
            AccountRecord::new("acct-3", "late").with_email("taken@example.com"),
        )
        .await;

    assert!(matches!(result, Err(AccountError::EmailTaken { .. })));
    assert!(harness.provider.calls().is_empty());
    assert!(harness
        .service
        .get(&realm, "acct-3")
        .await
        .expect("read")
        .is_none());
}

/// Test that a provider failure aborts provisioning before any local
/// write happens.
#[tokio::test]
async fn test_provision_provider_failure_aborts() {
    let harness = create_harness();
    let realm = create_realm();
    harness.provider.fail_next_create(ProviderError::Upstream {
        status: 500,
        detail: "boom".to_string(),
    });

    let result = harness
        .service
        .provision(&realm, AccountRecord::new("acct-4", "unlucky"))
        .await;

    assert!(matches!(result, Err(AccountError::Provider(_))));
    assert!(harness
        .service
        .get(&realm, "acct-4")
        .await
        .expect("read")
        .is_none());
    assert!(!harness
        .ledger
        .is_registered(&realm, ACCOUNT_IDS, "acct-4")
        .await
        .expect("lookup"));
}

/// Test that provisioning with unknown groups fails up front.
#[tokio::test]
async fn test_provision_requires_groups_to_exist() {
    let harness = create_harness();
    let realm = create_realm();

    let result = harness
        .service
        .provision(
            &realm,
            AccountRecord::new("acct-5", "joiner").with_group_ids(["g-404"]),
        )
        .await;

    assert!(matches!(result, Err(AccountError::GroupNotFound { .. })));
    assert_eq!(harness.provider.user_count(), 0);
}
