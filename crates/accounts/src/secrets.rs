//! Storage for each account's provider linkage.
//!
//! Linkage records live in their own collection, keyed by account id,
//! so the account document itself never carries provider internals.

use std::sync::Arc;

use bson::doc;

use tessera_store::{DocumentStore, Realm, StoreError, StoreResult};

use crate::collections::ACCOUNT_SECRETS;
use crate::model::SecretsRecord;

/// Persists [`SecretsRecord`]s.
#[derive(Clone)]
pub struct SecretsService {
    store: Arc<dyn DocumentStore>,
}

impl SecretsService {
    /// Creates the service over the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        SecretsService { store }
    }

    /// Inserts a new linkage record.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when the account already has one.
    pub async fn save(&self, realm: &Realm, secrets: &SecretsRecord) -> StoreResult<()> {
        let document = bson::to_document(secrets)?;
        let database = self.store.database(realm);
        match database.insert_one(ACCOUNT_SECRETS, document).await {
            Ok(()) => Ok(()),
            Err(StoreError::Backend(source)) if source.is_duplicate_key() => {
                tracing::warn!(account_id = %secrets.account_id, "linkage already present");
                Err(StoreError::Conflict {
                    collection: ACCOUNT_SECRETS.to_string(),
                    value: secrets.account_id.clone(),
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Loads the linkage for an account.
    pub async fn find(&self, realm: &Realm, account_id: &str) -> StoreResult<Option<SecretsRecord>> {
        let database = self.store.database(realm);
        match database
            .find_one(ACCOUNT_SECRETS, doc! { "_id": account_id })
            .await?
        {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Rewrites the provider user id and returns the updated record.
    /// With `None` nothing is written; the current record is returned
    /// as-is.
    pub async fn update_provider_id(
        &self,
        realm: &Realm,
        account_id: &str,
        provider_user_id: Option<&str>,
    ) -> StoreResult<Option<SecretsRecord>> {
        let Some(provider_user_id) = provider_user_id else {
            return self.find(realm, account_id).await;
        };
        let database = self.store.database(realm);
        match database
            .find_one_and_update(
                ACCOUNT_SECRETS,
                doc! { "_id": account_id },
                doc! { "$set": { "providerUserId": provider_user_id } },
            )
            .await?
        {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Removes the linkage. Returns whether a record existed.
    pub async fn delete(&self, realm: &Realm, account_id: &str) -> StoreResult<bool> {
        let database = self.store.database(realm);
        let removed = database
            .find_one_and_delete(ACCOUNT_SECRETS, doc! { "_id": account_id })
            .await?;
        Ok(removed.is_some())
    }
}
