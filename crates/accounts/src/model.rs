//! Account data model.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ProviderUser;

/// Top-level fields a partial account update may touch. Everything
/// else in an update payload is dropped before it reaches the store.
pub const ALLOWED_UPDATE_KEYS: &[&str] = &[
    "username",
    "email",
    "phone",
    "firstName",
    "lastName",
    "enabled",
    "emailVerified",
    "groupIds",
];

/// One account as stored in the realm's `accounts` collection.
///
/// The serialized form is the stored document, so the id maps to
/// `_id` and field names are camelCase on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Platform-wide account id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Login name, unique within the identity provider realm.
    pub username: String,
    /// Contact email, unique within the realm when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone, unique within the realm when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Whether the account may sign in.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Whether the contact email has been verified.
    #[serde(default)]
    pub email_verified: bool,
    /// Ids of the groups the account belongs to.
    #[serde(default)]
    pub group_ids: Vec<String>,
    /// Creation instant; search results default to newest-first on
    /// this field.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl AccountRecord {
    /// Creates an enabled account with the given id and username,
    /// stamped with the current instant.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        AccountRecord {
            id: id.into(),
            username: username.into(),
            email: None,
            phone: None,
            first_name: None,
            last_name: None,
            enabled: true,
            email_verified: false,
            group_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the contact email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the contact phone.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets given and family name.
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// Sets group membership.
    pub fn with_group_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.group_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// The outgoing representation for identity provider calls.
    pub fn to_provider_user(&self) -> ProviderUser {
        ProviderUser {
            id: None,
            username: Some(self.username.clone()),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            enabled: Some(self.enabled),
            email_verified: Some(self.email_verified),
        }
    }
}

/// Provider linkage for one account, stored separately from the
/// account record in the `account_secrets` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretsRecord {
    /// The account id; shared with the account record.
    #[serde(rename = "_id")]
    pub account_id: String,
    /// The identity provider's id for this user.
    pub provider_user_id: String,
}

impl SecretsRecord {
    /// Creates the linkage record.
    pub fn new(account_id: impl Into<String>, provider_user_id: impl Into<String>) -> Self {
        SecretsRecord {
            account_id: account_id.into(),
            provider_user_id: provider_user_id.into(),
        }
    }
}

/// An account and its provider linkage, loaded together.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedArtifacts {
    /// The account record.
    pub account: AccountRecord,
    /// The provider linkage record.
    pub secrets: SecretsRecord,
}

/// The identifiers an account wants to claim, checked before anything
/// is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifierClaims {
    /// Requested account id; `None` or blank means generate one.
    pub id: Option<String>,
    /// Email to reserve, if any.
    pub email: Option<String>,
    /// Phone to reserve, if any.
    pub phone: Option<String>,
    /// Groups the account will join; each must exist in the realm.
    pub group_ids: Vec<String>,
    /// Run the group existence check even when `group_ids` is empty.
    pub groups_required: bool,
}

impl From<&AccountRecord> for IdentifierClaims {
    fn from(account: &AccountRecord) -> Self {
        IdentifierClaims {
            id: Some(account.id.clone()),
            email: account.email.clone(),
            phone: account.phone.clone(),
            group_ids: account.group_ids.clone(),
            groups_required: false,
        }
    }
}
