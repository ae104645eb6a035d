//! Tenant identity for the store layer.
//!
//! Every store operation runs against exactly one realm, and every realm
//! maps to its own database. Isolation is structural: there is no shared
//! collection and no tenant column, so a query can never leak across
//! realms.
//!
//! # Examples
//!
//! ```
//! use tessera_store::tenant::Realm;
//!
//! let realm = Realm::new("acme-fitness");
//! assert_eq!(realm.as_str(), "acme-fitness");
//! assert!(!realm.is_blank());
//! ```

mod realm;

pub use realm::Realm;
