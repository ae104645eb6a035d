//! MongoDB backend.
//!
//! Thin mapping of the backend traits onto the official driver. Realm
//! resolution is purely name arithmetic: the driver hands out database
//! handles without touching the network, so [`DocumentStore::database`]
//! stays synchronous and cheap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::Document;
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection};

use crate::config::MongoConfig;
use crate::error::{BackendError, StoreResult};
use crate::store::{DocumentDatabase, DocumentStore, FindSpec};
use crate::tenant::Realm;

const BACKEND_NAME: &str = "mongodb";

/// Document store backed by a MongoDB deployment.
#[derive(Debug)]
pub struct MongoStore {
    client: Client,
    database_prefix: String,
}

impl MongoStore {
    /// Connects using the given configuration.
    ///
    /// The driver establishes connections lazily, so this validates the
    /// URI and builds the client but does not reach the deployment yet.
    ///
    /// # Errors
    ///
    /// [`BackendError::Unavailable`] for an unusable URI or client
    /// options.
    pub async fn connect(config: &MongoConfig) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|err| BackendError::Unavailable {
                message: format!("invalid connection string: {err}"),
            })?;
        options.app_name = Some(config.app_name.clone());
        options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
        options.server_selection_timeout =
            Some(Duration::from_secs(config.connect_timeout_secs));

        let client = Client::with_options(options).map_err(|err| BackendError::Unavailable {
            message: format!("client construction failed: {err}"),
        })?;
        tracing::info!(app_name = %config.app_name, "mongodb client ready");
        Ok(MongoStore {
            client,
            database_prefix: String::new(),
        })
    }

    /// Wraps an already-configured client.
    pub fn with_client(client: Client) -> Self {
        MongoStore {
            client,
            database_prefix: String::new(),
        }
    }

    /// Sets the prefix prepended to every realm's database name.
    pub fn with_database_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_prefix = prefix.into();
        self
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn database(&self, realm: &Realm) -> Arc<dyn DocumentDatabase> {
        let name = self.database_name(realm);
        Arc::new(MongoDatabase {
            database: self.client.database(&name),
            name,
        })
    }

    fn database_name(&self, realm: &Realm) -> String {
        format!("{}{}", self.database_prefix, realm.as_str())
    }

    async fn database_exists(&self, name: &str) -> StoreResult<bool> {
        let names = self.client.list_database_names().await?;
        Ok(names.iter().any(|candidate| candidate == name))
    }

    async fn list_databases(&self) -> StoreResult<Vec<String>> {
        Ok(self.client.list_database_names().await?)
    }

    async fn drop_database(&self, name: &str) -> StoreResult<bool> {
        if !self.database_exists(name).await? {
            tracing::debug!(database = name, "no database to drop");
            return Ok(false);
        }
        self.client.database(name).drop().await?;
        tracing::info!(database = name, "database dropped");
        Ok(true)
    }
}

/// One realm's database handle.
pub struct MongoDatabase {
    name: String,
    database: mongodb::Database,
}

impl MongoDatabase {
    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentDatabase for MongoDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()> {
        self.collection(collection).insert_one(document).await?;
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> StoreResult<Vec<Document>> {
        let handle = self.collection(collection);
        let mut action = handle.find(filter);
        if !spec.sort.is_empty() {
            action = action.sort(spec.sort);
        }
        if let Some(skip) = spec.skip {
            action = action.skip(skip);
        }
        if let Some(limit) = spec.limit {
            action = action.limit(limit);
        }
        let cursor = action.await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .update_many(filter, update)
            .await?;
        Ok(result.modified_count)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one_and_delete(filter)
            .await?)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let result = self.collection(collection).delete_many(filter).await?;
        Ok(result.deleted_count)
    }
}
