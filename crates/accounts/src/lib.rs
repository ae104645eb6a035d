//! Account provisioning and identity-provider orchestration for the
//! Tessera platform.
//!
//! This crate owns the account lifecycle inside a realm. The
//! [`AccountService`] coordinates four parties so callers see single
//! operations:
//!
//! - an [`IdentityProvider`] (Keycloak in production) holding the
//!   authenticating user
//! - the account repository in the realm's database
//! - a [`SecretsService`] linking each account to its provider user
//! - the uniqueness ledger reserving ids, emails, and phone numbers
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tessera_accounts::{
//!     AccountIdGenerator, AccountRecord, AccountService, KeycloakConfig, KeycloakProvider,
//! };
//! use tessera_store::{MongoConfig, MongoStore, Realm};
//!
//! let store = Arc::new(MongoStore::connect(&MongoConfig::from_env()).await?);
//! let provider = Arc::new(KeycloakProvider::new(&KeycloakConfig::from_env())?);
//! let service = AccountService::new(store, provider, Arc::new(AccountIdGenerator::new(0, 0)));
//!
//! let realm = Realm::new("acme");
//! let account = AccountRecord::new("", "ada").with_email("ada@example.com");
//! let created = service.provision(&realm, account).await?;
//! ```

#![warn(missing_docs)]

pub mod collections;
pub mod error;
pub mod idgen;
pub mod model;
pub mod provider;
pub mod secrets;
pub mod service;

pub use error::{AccountError, AccountResult, ProviderError};
pub use idgen::AccountIdGenerator;
pub use model::{
    ALLOWED_UPDATE_KEYS, AccountRecord, IdentifierClaims, LoadedArtifacts, SecretsRecord,
};
pub use provider::{IdentityProvider, KeycloakConfig, KeycloakProvider, ProviderUser};
pub use secrets::SecretsService;
pub use service::AccountService;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
