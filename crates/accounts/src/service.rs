//! Account lifecycle orchestration.
//!
//! [`AccountService`] coordinates the identity provider, the account
//! repository, the secrets service, and the uniqueness ledger so the
//! rest of the platform sees provisioning, update, and deletion as
//! single operations. Workflows are sequences of independent writes,
//! not transactions; each step's failure behavior is documented on the
//! method.

use std::sync::Arc;

use bson::Document;
use serde_json::Value as JsonValue;

use tessera_store::{
    DocumentStore, LedgerKind, Page, QueryDescriptor, Realm, Repository, StoreConfig,
    UniquenessLedger,
};

use crate::collections::{ACCOUNTS, ACCOUNT_IDS, EMAILS, GROUPS, PHONES};
use crate::error::{AccountError, AccountResult};
use crate::idgen::AccountIdGenerator;
use crate::model::{
    ALLOWED_UPDATE_KEYS, AccountRecord, IdentifierClaims, LoadedArtifacts, SecretsRecord,
};
use crate::provider::{IdentityProvider, ProviderUser};
use crate::secrets::SecretsService;

/// Orchestrates account provisioning against an identity provider and
/// the realm-scoped store.
#[derive(Clone)]
pub struct AccountService {
    provider: Arc<dyn IdentityProvider>,
    accounts: Repository<AccountRecord>,
    ledger: UniquenessLedger,
    secrets: SecretsService,
    idgen: Arc<AccountIdGenerator>,
}

impl AccountService {
    /// Creates the service with default store settings.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn IdentityProvider>,
        idgen: Arc<AccountIdGenerator>,
    ) -> Self {
        Self::with_config(store, provider, idgen, StoreConfig::default())
    }

    /// Creates the service with explicit store settings.
    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn IdentityProvider>,
        idgen: Arc<AccountIdGenerator>,
        config: StoreConfig,
    ) -> Self {
        AccountService {
            provider,
            accounts: Repository::with_config(Arc::clone(&store), ACCOUNTS, config),
            ledger: UniquenessLedger::new(Arc::clone(&store)),
            secrets: SecretsService::new(store),
            idgen,
        }
    }

    /// Validates a set of identifier claims without writing anything,
    /// and resolves the definitive account id.
    ///
    /// Checks run in a fixed order and the first failure wins: realm,
    /// then id, then email, then phone, then group existence. A blank
    /// or absent id is replaced with a generated one.
    pub async fn prepare_identifiers(
        &self,
        realm: &Realm,
        claims: IdentifierClaims,
    ) -> AccountResult<IdentifierClaims> {
        if realm.is_blank() {
            return Err(AccountError::RealmRequired);
        }

        let id = match claims.id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let generated = self.idgen.next_id_string();
                tracing::info!(account_id = %generated, realm = %realm, "generated account id");
                generated
            }
        };
        if self.ledger.is_registered(realm, ACCOUNT_IDS, &id).await? {
            return Err(AccountError::IdTaken { id });
        }

        if let Some(email) = non_blank(&claims.email) {
            if self.ledger.is_registered(realm, EMAILS, email).await? {
                return Err(AccountError::EmailTaken {
                    email: email.to_string(),
                });
            }
        }
        if let Some(phone) = non_blank(&claims.phone) {
            if self.ledger.is_registered(realm, PHONES, phone).await? {
                return Err(AccountError::PhoneTaken {
                    phone: phone.to_string(),
                });
            }
        }

        if (claims.groups_required || !claims.group_ids.is_empty())
            && !self
                .ledger
                .all_documents_exist(realm, GROUPS, &claims.group_ids)
                .await?
        {
            return Err(AccountError::GroupNotFound {
                ids: claims.group_ids.clone(),
            });
        }

        Ok(IdentifierClaims {
            id: Some(id),
            ..claims
        })
    }

    /// Provisions a new account end to end: claims are validated, the
    /// user is created at the identity provider, the account and its
    /// provider linkage are stored, and the identifiers are claimed in
    /// the ledger.
    ///
    /// The steps are not transactional; a failure part-way leaves the
    /// earlier writes in place.
    pub async fn provision(
        &self,
        realm: &Realm,
        account: AccountRecord,
    ) -> AccountResult<AccountRecord> {
        let prepared = self
            .prepare_identifiers(realm, IdentifierClaims::from(&account))
            .await?;
        let mut account = account;
        if let Some(id) = prepared.id {
            account.id = id;
        }

        let provider_user_id = self
            .provider
            .create_user(realm, &account.to_provider_user())
            .await?;

        let created = self.accounts.create(realm, &account).await?;
        self.secrets
            .save(realm, &SecretsRecord::new(&account.id, &provider_user_id))
            .await?;

        self.ledger.register(realm, ACCOUNT_IDS, &account.id).await?;
        if let Some(email) = non_blank(&account.email) {
            self.ledger.register(realm, EMAILS, email).await?;
        }
        if let Some(phone) = non_blank(&account.phone) {
            self.ledger.register(realm, PHONES, phone).await?;
        }

        tracing::info!(account_id = %account.id, realm = %realm, "account provisioned");
        Ok(created)
    }

    /// Loads an account together with its provider linkage.
    ///
    /// # Errors
    ///
    /// [`AccountError::AccountNotFound`] when either record is absent.
    pub async fn load_artifacts(&self, realm: &Realm, id: &str) -> AccountResult<LoadedArtifacts> {
        let secrets = self
            .secrets
            .find(realm, id)
            .await?
            .ok_or_else(|| AccountError::not_found(id))?;
        let account = self
            .accounts
            .get_by_id(realm, id)
            .await?
            .ok_or_else(|| AccountError::not_found(id))?;
        Ok(LoadedArtifacts { account, secrets })
    }

    /// Fetches an account by id.
    pub async fn get(&self, realm: &Realm, id: &str) -> AccountResult<Option<AccountRecord>> {
        Ok(self.accounts.get_by_id(realm, id).await?)
    }

    /// Runs a paginated account search.
    pub async fn search(
        &self,
        realm: &Realm,
        descriptor: &QueryDescriptor,
        page: u32,
        size: u32,
    ) -> AccountResult<Page<AccountRecord>> {
        Ok(self.accounts.search(realm, descriptor, page, size).await?)
    }

    /// Applies a field-level update to an account.
    ///
    /// The changes map may carry `username`, `email`, `phone`,
    /// `firstName`, `lastName`, `enabled`, `emailVerified`, and
    /// `groupIds`; unknown keys are logged and ignored. Profile changes
    /// are pushed to the identity provider first; if the provider
    /// refuses, nothing is written locally
    /// ([`AccountError::UpdateRejected`]). Email and phone changes then
    /// move their ledger reservations, the diff lands in the store, and
    /// the fresh record is returned.
    pub async fn update(
        &self,
        realm: &Realm,
        id: &str,
        changes: &serde_json::Map<String, JsonValue>,
    ) -> AccountResult<AccountRecord> {
        let LoadedArtifacts {
            mut account,
            secrets,
        } = self.load_artifacts(realm, id).await?;

        let old_email = account.email.clone();
        let old_phone = account.phone.clone();

        let mut diff = Document::new();
        let mut outgoing = ProviderUser::default();

        for (key, value) in changes {
            match key.as_str() {
                "username" => {
                    let Some(username) = trimmed_value(value) else {
                        return Err(AccountError::invalid_update("username cannot be removed"));
                    };
                    if username != account.username {
                        diff.insert("username", username.clone());
                        outgoing.username = Some(username.clone());
                        account.username = username;
                    }
                }
                "email" => {
                    let email = trimmed_value(value);
                    if email != account.email {
                        diff.insert("email", bson_text(&email));
                        outgoing.email = email.clone();
                        account.email = email;
                    }
                }
                "phone" => {
                    let phone = trimmed_value(value);
                    if phone != account.phone {
                        diff.insert("phone", bson_text(&phone));
                        account.phone = phone;
                    }
                }
                "firstName" => {
                    let first_name = text_value(value);
                    if first_name != account.first_name {
                        diff.insert("firstName", bson_text(&first_name));
                        outgoing.first_name = first_name.clone();
                        account.first_name = first_name;
                    }
                }
                "lastName" => {
                    let last_name = text_value(value);
                    if last_name != account.last_name {
                        diff.insert("lastName", bson_text(&last_name));
                        outgoing.last_name = last_name.clone();
                        account.last_name = last_name;
                    }
                }
                "enabled" => {
                    let enabled = coerce_bool(value);
                    if enabled != account.enabled {
                        diff.insert("enabled", enabled);
                        outgoing.enabled = Some(enabled);
                        account.enabled = enabled;
                    }
                }
                "emailVerified" => {
                    let verified = coerce_bool(value);
                    if verified != account.email_verified {
                        diff.insert("emailVerified", verified);
                        outgoing.email_verified = Some(verified);
                        account.email_verified = verified;
                    }
                }
                "groupIds" => {
                    let JsonValue::Array(items) = value else {
                        return Err(AccountError::invalid_update("groupIds must be a list"));
                    };
                    let ids = string_items(items);
                    if !ids.is_empty()
                        && !self.ledger.all_documents_exist(realm, GROUPS, &ids).await?
                    {
                        return Err(AccountError::GroupNotFound { ids });
                    }
                    // membership writes are not diffed against the
                    // current value
                    diff.insert("groupIds", ids.clone());
                    account.group_ids = ids;
                }
                other => {
                    tracing::warn!(field = other, "ignoring unknown update field");
                }
            }
        }

        // the provider sees every update, even an empty one
        self.provider
            .update_user(realm, &secrets.provider_user_id, &outgoing)
            .await
            .map_err(|source| AccountError::UpdateRejected {
                id: id.to_string(),
                source,
            })?;

        self.reconcile_reservation(realm, EMAILS, &old_email, &account.email)
            .await?;
        self.reconcile_reservation(realm, PHONES, &old_phone, &account.phone)
            .await?;

        if !diff.is_empty() {
            self.accounts
                .update(realm, id, diff, ALLOWED_UPDATE_KEYS)
                .await?;
        }

        tracing::info!(account_id = id, realm = %realm, "account updated");
        self.accounts
            .get_by_id(realm, id)
            .await?
            .ok_or_else(|| AccountError::not_found(id))
    }

    /// Deletes an account everywhere.
    ///
    /// The identity provider is asked first; if it refuses, local
    /// records stay untouched ([`AccountError::DeleteRejected`]). Local
    /// cleanup afterwards is best-effort: ledger releases stop at the
    /// first failure and account record removal tolerates errors, so a
    /// partially cleaned realm can be retried.
    pub async fn delete(&self, realm: &Realm, id: &str) -> AccountResult<()> {
        let Some(secrets) = self.secrets.find(realm, id).await? else {
            return Err(AccountError::not_found(id));
        };

        self.provider
            .delete_user(realm, &secrets.provider_user_id)
            .await
            .map_err(|source| AccountError::DeleteRejected {
                id: id.to_string(),
                source,
            })?;

        let account = match self.accounts.get_by_id(realm, id).await {
            Ok(found) => found,
            Err(err) => {
                tracing::debug!(account_id = id, error = %err, "account lookup failed during delete");
                None
            }
        };

        let mut cleanup = self.ledger.unregister(realm, ACCOUNT_IDS, id).await;
        if cleanup.is_ok() {
            if let Some(email) = account.as_ref().and_then(|a| non_blank(&a.email)) {
                cleanup = self.ledger.unregister(realm, EMAILS, email).await;
            }
        }
        if cleanup.is_ok() {
            if let Some(phone) = account.as_ref().and_then(|a| non_blank(&a.phone)) {
                cleanup = self.ledger.unregister(realm, PHONES, phone).await;
            }
        }
        if let Err(err) = cleanup {
            tracing::warn!(account_id = id, error = %err, "ledger cleanup incomplete");
        }

        if let Err(err) = self.accounts.delete(realm, id).await {
            tracing::debug!(account_id = id, error = %err, "account record removal failed");
        }

        if !self.secrets.delete(realm, id).await? {
            tracing::warn!(account_id = id, "no provider linkage to remove");
        }

        tracing::info!(account_id = id, realm = %realm, "account deleted");
        Ok(())
    }

    /// Moves a ledger reservation when its value changed: the old value
    /// is released and the new one claimed, blanks skipped on both
    /// sides.
    async fn reconcile_reservation(
        &self,
        realm: &Realm,
        kind: LedgerKind,
        old: &Option<String>,
        new: &Option<String>,
    ) -> AccountResult<()> {
        if old == new {
            return Ok(());
        }
        if let Some(old) = non_blank(old) {
            self.ledger.unregister(realm, kind, old).await?;
        }
        if let Some(new) = non_blank(new) {
            self.ledger.register(realm, kind, new).await?;
        }
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// `null` clears; anything else is stringified.
fn text_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn trimmed_value(value: &JsonValue) -> Option<String> {
    text_value(value).map(|s| s.trim().to_string())
}

/// Truthiness for update payloads: booleans pass through, the string
/// `"true"` (any case) is true, everything else is false.
fn coerce_bool(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn string_items(items: &[JsonValue]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

fn bson_text(value: &Option<String>) -> bson::Bson {
    match value {
        Some(text) => bson::Bson::String(text.clone()),
        None => bson::Bson::Null,
    }
}
