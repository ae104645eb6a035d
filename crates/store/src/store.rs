//! Document store abstraction.
//!
//! [`DocumentStore`] is the seam between the tenant-facing services and a
//! concrete backend. A store resolves a [`Realm`] to an isolated
//! [`DocumentDatabase`]; the database exposes the small set of
//! collection-addressed primitives the ledger, the repository, and the
//! provisioning services are built on.
//!
//! Filters and updates are plain [`bson::Document`] values in the
//! store's native predicate form; the query compiler produces them,
//! and every backend must honor the operator subset it emits (`$and`,
//! `$or`, `$in`, `$nin`, `$all`, `$size`, `$exists`, `$regex`, `$gte`,
//! `$lte` plus direct equality).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use bson::doc;
//! use tessera_store::backends::MemoryStore;
//! use tessera_store::store::DocumentStore;
//! use tessera_store::tenant::Realm;
//!
//! let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
//! let realm = Realm::new("acme");
//! let database = store.database(&realm);
//! database.insert_one("accounts", doc! { "_id": "1" }).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;

use crate::error::StoreResult;
use crate::tenant::Realm;

/// Options applied to a `find` call: sort order and result window.
#[derive(Debug, Clone, Default)]
pub struct FindSpec {
    /// Ordered sort document (`field -> 1 | -1`). Empty means backend
    /// natural order.
    pub sort: Document,
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
}

impl FindSpec {
    /// Creates an empty spec: no sort, no window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort document.
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the skip offset.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the result limit.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Backend abstraction over a multi-database document store.
///
/// Implementations must be safe to share across tasks; all methods take
/// `&self` and handles returned by [`DocumentStore::database`] are
/// independently usable.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the backend's name for logs and diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Resolves a realm to its isolated database handle.
    ///
    /// Resolution is pure: the database name is derived from the realm
    /// plus any configured prefix, and no I/O happens until the handle is
    /// used. A database that has never been written to still resolves;
    /// it materializes on first write.
    fn database(&self, realm: &Realm) -> Arc<dyn DocumentDatabase>;

    /// Returns the database name a realm resolves to.
    fn database_name(&self, realm: &Realm) -> String;

    /// Returns `true` when a database with this exact name exists.
    ///
    /// # Arguments
    ///
    /// * `name` - A database name, not a realm; callers resolving a realm
    ///   should pass [`DocumentStore::database_name`] output.
    async fn database_exists(&self, name: &str) -> StoreResult<bool>;

    /// Lists the names of all databases visible to the backend.
    async fn list_databases(&self) -> StoreResult<Vec<String>>;

    /// Drops a database by name.
    ///
    /// # Returns
    ///
    /// `false` when no database with this name exists (nothing is
    /// touched), `true` after a successful drop.
    ///
    /// # Errors
    ///
    /// Backend faults during the existence check or the drop itself.
    async fn drop_database(&self, name: &str) -> StoreResult<bool>;
}

/// One realm's database: collection-addressed document primitives.
#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    /// The database name this handle is bound to.
    fn name(&self) -> &str;

    /// Inserts a single document.
    ///
    /// Documents without an `_id` get one assigned by the backend.
    ///
    /// # Errors
    ///
    /// [`BackendError::DuplicateKey`](crate::error::BackendError) when
    /// the document's `_id` is already present in the collection.
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Finds the first document matching `filter`.
    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>>;

    /// Finds all documents matching `filter`, applying the sort order
    /// and result window from `spec`.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> StoreResult<Vec<Document>>;

    /// Counts the documents matching `filter`.
    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Applies an update document (`$set` / `$unset`) to every document
    /// matching `filter`.
    ///
    /// # Returns
    ///
    /// The number of documents actually modified.
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<u64>;

    /// Atomically updates the first document matching `filter`.
    ///
    /// # Returns
    ///
    /// The post-image of the updated document, or `None` when nothing
    /// matched.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<Option<Document>>;

    /// Atomically removes the first document matching `filter`.
    ///
    /// # Returns
    ///
    /// The removed document, or `None` when nothing matched.
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Option<Document>>;

    /// Deletes every document matching `filter`.
    ///
    /// # Returns
    ///
    /// The number of documents deleted.
    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64>;
}
