//! Identity provider integration.
//!
//! The orchestrator talks to whatever implements [`IdentityProvider`];
//! the shipped implementation is [`KeycloakProvider`] over the Keycloak
//! admin REST API. Tests substitute scripted doubles.

mod keycloak;

pub use keycloak::{KeycloakConfig, KeycloakProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tessera_store::Realm;

use crate::error::ProviderError;

/// A user as the identity provider sees it.
///
/// All fields are optional: outgoing updates carry only what changed,
/// and different providers populate different subsets on reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderUser {
    /// The provider's own id for the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Login name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Whether the user may sign in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Whether the email is verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

/// Admin operations against an identity provider, scoped to a realm.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates a user and returns the provider's id for it.
    async fn create_user(&self, realm: &Realm, user: &ProviderUser)
    -> Result<String, ProviderError>;

    /// Fetches a user by provider id.
    async fn get_user(
        &self,
        realm: &Realm,
        provider_user_id: &str,
    ) -> Result<ProviderUser, ProviderError>;

    /// Pushes profile changes to an existing user. Fields absent from
    /// `user` keep their current values; the username never changes.
    async fn update_user(
        &self,
        realm: &Realm,
        provider_user_id: &str,
        user: &ProviderUser,
    ) -> Result<(), ProviderError>;

    /// Removes a user by provider id.
    async fn delete_user(&self, realm: &Realm, provider_user_id: &str)
    -> Result<(), ProviderError>;

    /// Searches users by a free-text query with offset/limit paging.
    /// The provider matches the query against login and profile fields.
    async fn search_users(
        &self,
        realm: &Realm,
        query: &str,
        first: u32,
        max: u32,
    ) -> Result<Vec<ProviderUser>, ProviderError>;
}
