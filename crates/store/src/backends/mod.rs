//! Storage backends.
//!
//! Every backend exposes the same two traits ([`DocumentStore`] for
//! realm-to-database resolution and database administration,
//! [`DocumentDatabase`] for collection operations), so everything above
//! this module is backend-agnostic. The in-memory backend is always
//! available; the native client backend is compiled in through the
//! `mongodb` feature (on by default).
//!
//! [`DocumentStore`]: crate::store::DocumentStore
//! [`DocumentDatabase`]: crate::store::DocumentDatabase

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::MemoryStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
