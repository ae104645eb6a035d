//! Multi-tenant document persistence for the Tessera platform.
//!
//! Every tenant (a [`Realm`]) owns a physically separate database;
//! nothing above this crate ever sees another tenant's data. On top of
//! that isolation the crate provides:
//!
//! - [`DocumentStore`] / [`DocumentDatabase`]: the backend traits;
//!   implementations exist for MongoDB (`mongodb` feature, on by
//!   default) and process memory
//! - [`Repository`]: typed CRUD over one collection, with allow-listed
//!   partial updates, guarded bulk writes, and paginated search
//! - [`QueryDescriptor`]: structured search requests, built fluently
//!   or parsed from the legacy JSON map format and compiled to native
//!   filters
//! - [`UniquenessLedger`]: realm-scoped unique value reservations
//!   enforced by the store's primary-key constraint
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tessera_store::{MongoConfig, MongoStore, QueryDescriptor, Realm, Repository};
//!
//! let store = Arc::new(
//!     MongoStore::connect(&MongoConfig::from_env())
//!         .await?
//!         .with_database_prefix("tess_"),
//! );
//! let repo: Repository<Account> = Repository::new(store, "accounts");
//!
//! let realm = Realm::new("acme");
//! let page = repo.search(&realm, &QueryDescriptor::new(), 0, 20).await?;
//! ```

#![warn(missing_docs)]

pub mod backends;
pub mod config;
pub mod error;
pub mod ledger;
pub mod page;
pub mod query;
pub mod repository;
pub mod store;
pub mod tenant;

pub use backends::MemoryStore;
#[cfg(feature = "mongodb")]
pub use backends::MongoStore;
pub use config::{MongoConfig, StoreConfig};
pub use error::{BackendError, QueryError, StoreError, StoreResult};
pub use ledger::{LedgerKind, UniquenessLedger};
pub use page::Page;
pub use query::{
    CompiledQuery, DateFilter, DateFilterMode, FieldCondition, FilterTree, QueryDescriptor,
    SortDirection, TextSearch, compile,
};
pub use repository::{CREATED_AT_FIELD, Repository};
pub use store::{DocumentDatabase, DocumentStore, FindSpec};
pub use tenant::Realm;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
