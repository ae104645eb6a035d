//! Cross-record uniqueness via reservation collections.
//!
//! Some values (account ids, email addresses, phone numbers) must be
//! unique across a whole realm even though the records holding
//! them live in ordinary collections. The [`UniquenessLedger`] claims
//! such a value by inserting a document whose `_id` *is* the value into
//! a dedicated reservation collection, so uniqueness rides on the
//! store's primary-key constraint instead of a read-then-write race.

use std::collections::HashSet;
use std::sync::Arc;

use bson::doc;

use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;
use crate::tenant::Realm;

/// A class of reserved values: a short name for logs and the
/// collection its reservations live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerKind {
    name: &'static str,
    collection: &'static str,
}

impl LedgerKind {
    /// Declares a ledger kind. Intended for `const` definitions next to
    /// the collections they guard.
    pub const fn new(name: &'static str, collection: &'static str) -> Self {
        LedgerKind { name, collection }
    }

    /// The short human-readable name, e.g. `"email"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The reservation collection, e.g. `"index_emails"`.
    pub fn collection(&self) -> &'static str {
        self.collection
    }
}

/// Claims and releases realm-scoped unique values, and answers
/// existence questions about ordinary records.
#[derive(Clone)]
pub struct UniquenessLedger {
    store: Arc<dyn DocumentStore>,
}

impl UniquenessLedger {
    /// Creates a ledger over the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        UniquenessLedger { store }
    }

    /// Claims `value` in the realm's reservation collection for `kind`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when the value is already claimed,
    /// [`StoreError::CreationFailed`] for any other backend fault.
    pub async fn register(&self, realm: &Realm, kind: LedgerKind, value: &str) -> StoreResult<()> {
        let database = self.store.database(realm);
        match database
            .insert_one(kind.collection(), doc! { "_id": value })
            .await
        {
            Ok(()) => {
                tracing::debug!(kind = kind.name(), value, realm = %realm, "value registered");
                Ok(())
            }
            Err(StoreError::Backend(source)) if source.is_duplicate_key() => {
                tracing::warn!(kind = kind.name(), value, realm = %realm, "value already registered");
                Err(StoreError::Conflict {
                    collection: kind.collection().to_string(),
                    value: value.to_string(),
                })
            }
            Err(StoreError::Backend(source)) => Err(StoreError::CreationFailed {
                collection: kind.collection().to_string(),
                source,
            }),
            Err(other) => Err(other),
        }
    }

    /// Returns `true` when `value` is currently claimed for `kind`.
    pub async fn is_registered(
        &self,
        realm: &Realm,
        kind: LedgerKind,
        value: &str,
    ) -> StoreResult<bool> {
        let database = self.store.database(realm);
        let found = database
            .find_one(kind.collection(), doc! { "_id": value })
            .await?;
        Ok(found.is_some())
    }

    /// Releases `value`. Releasing a value that was never claimed is
    /// not an error.
    pub async fn unregister(&self, realm: &Realm, kind: LedgerKind, value: &str) -> StoreResult<()> {
        let database = self.store.database(realm);
        let removed = database
            .find_one_and_delete(kind.collection(), doc! { "_id": value })
            .await?;
        if removed.is_none() {
            tracing::debug!(kind = kind.name(), value, realm = %realm, "no reservation to release");
        }
        Ok(())
    }

    /// Number of values currently claimed for `kind`.
    pub async fn count(&self, realm: &Realm, kind: LedgerKind) -> StoreResult<u64> {
        let database = self.store.database(realm);
        database.count(kind.collection(), doc! {}).await
    }

    /// Returns `true` when a record with `id` exists in `collection`.
    pub async fn document_exists(
        &self,
        realm: &Realm,
        collection: &str,
        id: &str,
    ) -> StoreResult<bool> {
        let database = self.store.database(realm);
        let found = database.find_one(collection, doc! { "_id": id }).await?;
        Ok(found.is_some())
    }

    /// Returns `true` when every id in `ids` names an existing record
    /// in `collection`. An empty list is vacuously satisfied, and
    /// duplicate ids count once.
    pub async fn all_documents_exist(
        &self,
        realm: &Realm,
        collection: &str,
        ids: &[String],
    ) -> StoreResult<bool> {
        if ids.is_empty() {
            return Ok(true);
        }
        let distinct: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let database = self.store.database(realm);
        let found = database
            .count(collection, doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(found == distinct.len() as u64)
    }
}
