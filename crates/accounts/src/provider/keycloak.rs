//! Keycloak admin API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use tessera_store::Realm;

use super::{IdentityProvider, ProviderUser};
use crate::error::ProviderError;

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Connection settings for the Keycloak admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeycloakConfig {
    /// Server base URL, e.g. `http://localhost:8080`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token presented to the admin API.
    #[serde(default)]
    pub admin_token: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        KeycloakConfig {
            base_url: default_base_url(),
            admin_token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl KeycloakConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the admin bearer token.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = token.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Loads configuration from `TESSERA_KEYCLOAK_*` environment
    /// variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        KeycloakConfig {
            base_url: std::env::var("TESSERA_KEYCLOAK_BASE_URL").unwrap_or(defaults.base_url),
            admin_token: std::env::var("TESSERA_KEYCLOAK_ADMIN_TOKEN")
                .unwrap_or(defaults.admin_token),
            timeout_secs: std::env::var("TESSERA_KEYCLOAK_TIMEOUT_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// Validates the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.base_url.trim().is_empty() {
            errors.push("base_url must not be empty".to_string());
        } else if Url::parse(&self.base_url).is_err() {
            errors.push(format!("base_url '{}' is not a valid URL", self.base_url));
        }
        if self.admin_token.trim().is_empty() {
            errors.push("admin_token must be set".to_string());
        }
        if self.timeout_secs == 0 {
            errors.push("timeout_secs must be greater than zero".to_string());
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// [`IdentityProvider`] implementation over the Keycloak admin REST
/// API.
#[derive(Debug)]
pub struct KeycloakProvider {
    http: reqwest::Client,
    base_url: Url,
    admin_token: String,
}

impl KeycloakProvider {
    /// Builds a client from the configuration.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Misconfigured`] when the base URL does not
    /// parse or the HTTP client cannot be constructed.
    pub fn new(config: &KeycloakConfig) -> Result<Self, ProviderError> {
        let mut base_url =
            Url::parse(&config.base_url).map_err(|err| ProviderError::Misconfigured {
                detail: format!("invalid base URL '{}': {err}", config.base_url),
            })?;
        // joins below are relative to the base path
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ProviderError::Misconfigured {
                detail: format!("http client construction failed: {err}"),
            })?;

        Ok(KeycloakProvider {
            http,
            base_url,
            admin_token: config.admin_token.clone(),
        })
    }

    fn users_url(&self, realm: &Realm) -> Result<Url, ProviderError> {
        self.base_url
            .join(&format!("admin/realms/{}/users", realm.as_str()))
            .map_err(|err| ProviderError::Misconfigured {
                detail: err.to_string(),
            })
    }

    fn user_url(&self, realm: &Realm, provider_user_id: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(&format!(
                "admin/realms/{}/users/{provider_user_id}",
                realm.as_str()
            ))
            .map_err(|err| ProviderError::Misconfigured {
                detail: err.to_string(),
            })
    }

    /// Exact-username lookup, used when user creation returns no
    /// `Location` header.
    async fn find_by_username_exact(
        &self,
        realm: &Realm,
        username: &str,
    ) -> Result<Vec<ProviderUser>, ProviderError> {
        let response = self
            .http
            .get(self.users_url(realm)?)
            .bearer_auth(&self.admin_token)
            .query(&[("username", username), ("exact", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        response
            .json::<Vec<ProviderUser>>()
            .await
            .map_err(|err| ProviderError::Decode {
                message: err.to_string(),
            })
    }
}

#[async_trait]
impl IdentityProvider for KeycloakProvider {
    async fn create_user(
        &self,
        realm: &Realm,
        user: &ProviderUser,
    ) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.users_url(realm)?)
            .bearer_auth(&self.admin_token)
            .json(user)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED && status != StatusCode::NO_CONTENT {
            return Err(status_error(response).await);
        }

        if let Some(id) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(id_from_location)
        {
            return Ok(id);
        }

        // some versions omit the Location header; fall back to an
        // exact-username search
        if let Some(username) = user.username.as_deref() {
            tracing::debug!(username, "create returned no Location header, searching");
            let matches = self.find_by_username_exact(realm, username).await?;
            if let Some(id) = matches.into_iter().find_map(|user| user.id) {
                return Ok(id);
            }
        }
        Err(ProviderError::MissingUserId)
    }

    async fn get_user(
        &self,
        realm: &Realm,
        provider_user_id: &str,
    ) -> Result<ProviderUser, ProviderError> {
        let response = self
            .http
            .get(self.user_url(realm, provider_user_id)?)
            .bearer_auth(&self.admin_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::UserNotFound {
                provider_user_id: provider_user_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }
        response
            .json::<ProviderUser>()
            .await
            .map_err(|err| ProviderError::Decode {
                message: err.to_string(),
            })
    }

    async fn update_user(
        &self,
        realm: &Realm,
        provider_user_id: &str,
        user: &ProviderUser,
    ) -> Result<(), ProviderError> {
        // the admin API replaces the whole representation, so fetch and
        // overlay before the PUT
        let existing = self.get_user(realm, provider_user_id).await?;
        let merged = merge_user(existing, user);

        let response = self
            .http
            .put(self.user_url(realm, provider_user_id)?)
            .bearer_auth(&self.admin_token)
            .json(&merged)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::UserNotFound {
                provider_user_id: provider_user_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn delete_user(
        &self,
        realm: &Realm,
        provider_user_id: &str,
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .delete(self.user_url(realm, provider_user_id)?)
            .bearer_auth(&self.admin_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::UserNotFound {
                provider_user_id: provider_user_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn search_users(
        &self,
        realm: &Realm,
        query: &str,
        first: u32,
        max: u32,
    ) -> Result<Vec<ProviderUser>, ProviderError> {
        let response = self
            .http
            .get(self.users_url(realm)?)
            .bearer_auth(&self.admin_token)
            .query(&[
                ("search", query.to_string()),
                ("first", first.to_string()),
                ("max", max.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        response
            .json::<Vec<ProviderUser>>()
            .await
            .map_err(|err| ProviderError::Decode {
                message: err.to_string(),
            })
    }
}

/// Last non-empty path segment of a `Location` header value.
fn id_from_location(location: &str) -> Option<String> {
    location
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Overlay of outgoing changes onto the current representation. The
/// username is immutable once created.
fn merge_user(existing: ProviderUser, outgoing: &ProviderUser) -> ProviderUser {
    ProviderUser {
        id: existing.id,
        username: existing.username,
        email: outgoing.email.clone().or(existing.email),
        first_name: outgoing.first_name.clone().or(existing.first_name),
        last_name: outgoing.last_name.clone().or(existing.last_name),
        enabled: outgoing.enabled.or(existing.enabled),
        email_verified: outgoing.email_verified.or(existing.email_verified),
    }
}

async fn status_error(response: Response) -> ProviderError {
    let status = response.status();
    let detail = error_detail(response).await;
    match status.as_u16() {
        409 => ProviderError::Conflict { detail },
        400 => ProviderError::BadRequest { detail },
        401 | 403 => ProviderError::Unauthorized {
            status: status.as_u16(),
        },
        other => ProviderError::Upstream {
            status: other,
            detail,
        },
    }
}

/// Pulls the most specific message out of an error response body.
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => json
            .get("errorMessage")
            .or_else(|| json.get("error"))
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .unwrap_or(body),
        Err(_) => body,
    }
}
