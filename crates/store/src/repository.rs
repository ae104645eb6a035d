//! Generic, collection-scoped persistence operations.
//!
//! A [`Repository`] binds an entity type to one collection and exposes
//! the full CRUD surface every realm sees: typed create/read, partial
//! updates restricted to an allow-list, paginated descriptor search,
//! and guarded bulk operations. All realm scoping happens through the
//! store's database resolution; the repository itself holds no
//! realm state.

use std::marker::PhantomData;
use std::sync::Arc;

use bson::{Bson, Document, doc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::ledger::UniquenessLedger;
use crate::page::Page;
use crate::query::{QueryDescriptor, SortDirection, compile};
use crate::store::{DocumentStore, FindSpec};
use crate::tenant::Realm;

/// Field search falls back to when the caller names no sort on it.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Collection-scoped repository for documents of type `T`.
///
/// `T` must round-trip through BSON; its serialized form is what the
/// backend stores, so the record id lives in the `_id` field of that
/// form.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    ledger: UniquenessLedger,
    collection: String,
    config: StoreConfig,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            store: Arc::clone(&self.store),
            ledger: self.ledger.clone(),
            collection: self.collection.clone(),
            config: self.config.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Creates a repository over `collection` with default settings.
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self::with_config(store, collection, StoreConfig::default())
    }

    /// Creates a repository with explicit settings.
    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        config: StoreConfig,
    ) -> Self {
        Repository {
            ledger: UniquenessLedger::new(Arc::clone(&store)),
            store,
            collection: collection.into(),
            config,
            _entity: PhantomData,
        }
    }

    /// The collection this repository operates on.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Inserts `entity` and returns the stored form.
    ///
    /// # Errors
    ///
    /// [`StoreError::CreationFailed`] when the backend rejects the
    /// insert, including id collisions.
    pub async fn create(&self, realm: &Realm, entity: &T) -> StoreResult<T> {
        let document = bson::to_document(entity)?;
        let database = self.store.database(realm);
        match database
            .insert_one(&self.collection, document.clone())
            .await
        {
            Ok(()) => deserialize_document(document),
            Err(StoreError::Backend(source)) => {
                tracing::error!(
                    collection = %self.collection,
                    error = %source,
                    "insert rejected by backend"
                );
                Err(StoreError::CreationFailed {
                    collection: self.collection.clone(),
                    source,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Fetches a record by id.
    pub async fn get_by_id(&self, realm: &Realm, id: &str) -> StoreResult<Option<T>> {
        let database = self.store.database(realm);
        match database.find_one(&self.collection, doc! { "_id": id }).await? {
            Some(document) => Ok(Some(deserialize_document(document)?)),
            None => Ok(None),
        }
    }

    /// Applies a partial update to one record and returns the updated
    /// form.
    ///
    /// Only top-level fields named in `allowed` are applied (an empty
    /// allow-list admits everything). A `null` value removes the field;
    /// anything else replaces it. When filtering leaves nothing to
    /// write, the current record is returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidUpdatePayload`] when `changes` is empty
    /// - [`StoreError::RecordNotFound`] when no record has `id`
    /// - [`StoreError::UpdateFailed`] when the record disappears
    ///   between the existence check and the write
    pub async fn update(
        &self,
        realm: &Realm,
        id: &str,
        changes: Document,
        allowed: &[&str],
    ) -> StoreResult<T> {
        if changes.is_empty() {
            return Err(StoreError::invalid_update("no fields to update"));
        }

        let permitted = retain_allowed(changes, allowed);
        if permitted.is_empty() {
            tracing::debug!(
                collection = %self.collection,
                id,
                "update carried no permitted fields"
            );
            return self.require_by_id(realm, id).await;
        }

        if !self
            .ledger
            .document_exists(realm, &self.collection, id)
            .await?
        {
            return Err(StoreError::not_found(&self.collection, id));
        }

        let update = split_set_unset(permitted);
        let database = self.store.database(realm);
        match database
            .find_one_and_update(&self.collection, doc! { "_id": id }, update)
            .await?
        {
            Some(document) => deserialize_document(document),
            None => {
                tracing::error!(collection = %self.collection, id, "update lost its target");
                Err(StoreError::UpdateFailed {
                    collection: self.collection.clone(),
                    id: id.to_string(),
                    reason: "record disappeared between existence check and write".to_string(),
                })
            }
        }
    }

    /// Applies a partial update to every record matching `descriptor`
    /// and returns how many were modified.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidQueryParameters`] for an empty descriptor
    /// (a mass write must be deliberate), and
    /// [`StoreError::InvalidUpdatePayload`] when no permitted fields
    /// remain.
    pub async fn bulk_update_by_filters(
        &self,
        realm: &Realm,
        descriptor: &QueryDescriptor,
        changes: Document,
        allowed: &[&str],
    ) -> StoreResult<u64> {
        if descriptor.is_empty() {
            return Err(StoreError::invalid_query(
                "refusing bulk update with no filter criteria",
            ));
        }
        if changes.is_empty() {
            return Err(StoreError::invalid_update("no fields to update"));
        }
        let permitted = retain_allowed(changes, allowed);
        if permitted.is_empty() {
            return Err(StoreError::invalid_update("no permitted fields in update"));
        }

        let compiled = compile(descriptor);
        let update = split_set_unset(permitted);
        let database = self.store.database(realm);
        database
            .update_many(&self.collection, compiled.filter, update)
            .await
    }

    /// Deletes one record by id. Deleting an absent record is not an
    /// error.
    pub async fn delete(&self, realm: &Realm, id: &str) -> StoreResult<()> {
        let database = self.store.database(realm);
        match database
            .delete_many(&self.collection, doc! { "_id": id })
            .await
        {
            Ok(0) => {
                tracing::warn!(collection = %self.collection, id, "no record to delete");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(StoreError::Backend(source)) => Err(StoreError::DeleteFailed {
                collection: self.collection.clone(),
                source,
            }),
            Err(other) => Err(other),
        }
    }

    /// Deletes the listed records and returns how many existed. An
    /// empty list deletes nothing.
    pub async fn bulk_delete_by_ids(&self, realm: &Realm, ids: &[String]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let database = self.store.database(realm);
        database
            .delete_many(&self.collection, doc! { "_id": { "$in": ids.to_vec() } })
            .await
    }

    /// Deletes every record matching `descriptor` and returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidQueryParameters`] for an empty descriptor.
    pub async fn bulk_delete_by_filters(
        &self,
        realm: &Realm,
        descriptor: &QueryDescriptor,
    ) -> StoreResult<u64> {
        if descriptor.is_empty() {
            return Err(StoreError::invalid_query(
                "refusing bulk delete with no filter criteria",
            ));
        }
        let compiled = compile(descriptor);
        let database = self.store.database(realm);
        database.delete_many(&self.collection, compiled.filter).await
    }

    /// Counts the records matching `descriptor`.
    pub async fn count(&self, realm: &Realm, descriptor: &QueryDescriptor) -> StoreResult<u64> {
        let compiled = compile(descriptor);
        let database = self.store.database(realm);
        database.count(&self.collection, compiled.filter).await
    }

    /// Runs a paginated search.
    ///
    /// `page` is zero-based. A `size` of zero selects the configured
    /// default, and any size is clamped to the configured maximum. The
    /// total match count is taken before the page slice so the
    /// envelope's counters describe the whole result set. Unless the
    /// descriptor already sorts on the creation field, newest-first on
    /// that field is appended as the final tiebreak.
    pub async fn search(
        &self,
        realm: &Realm,
        descriptor: &QueryDescriptor,
        page: u32,
        size: u32,
    ) -> StoreResult<Page<T>> {
        let size = if size == 0 {
            self.config.default_page_size
        } else {
            size
        };
        let size = size.clamp(1, self.config.max_page_size.max(1));

        let compiled = compile(descriptor);
        let database = self.store.database(realm);
        let total = database
            .count(&self.collection, compiled.filter.clone())
            .await?;

        let mut sort = compiled.sort;
        if !sort.contains_key(CREATED_AT_FIELD) {
            sort.insert(CREATED_AT_FIELD, SortDirection::Desc.as_i32());
        }
        let spec = FindSpec::new()
            .sort(sort)
            .skip(u64::from(page) * u64::from(size))
            .limit(i64::from(size));

        let documents = database.find(&self.collection, compiled.filter, spec).await?;
        let mut content = Vec::with_capacity(documents.len());
        for document in documents {
            content.push(deserialize_document(document)?);
        }
        Ok(Page::new(content, page, size, total))
    }

    async fn require_by_id(&self, realm: &Realm, id: &str) -> StoreResult<T> {
        self.get_by_id(realm, id)
            .await?
            .ok_or_else(|| StoreError::not_found(&self.collection, id))
    }
}

/// Drops every top-level field not named in `allowed`. An empty
/// allow-list admits everything.
fn retain_allowed(changes: Document, allowed: &[&str]) -> Document {
    if allowed.is_empty() {
        return changes;
    }
    changes
        .into_iter()
        .filter(|(key, _)| allowed.contains(&key.as_str()))
        .collect()
}

/// Splits a flat change set into the native update document: non-null
/// values become `$set` entries, nulls become `$unset` entries.
fn split_set_unset(changes: Document) -> Document {
    let mut set = Document::new();
    let mut unset = Document::new();
    for (key, value) in changes {
        match value {
            Bson::Null => {
                unset.insert(key, "");
            }
            other => {
                set.insert(key, other);
            }
        }
    }
    let mut update = Document::new();
    if !set.is_empty() {
        update.insert("$set", set);
    }
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    update
}

fn deserialize_document<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(bson::from_document(document)?)
}
