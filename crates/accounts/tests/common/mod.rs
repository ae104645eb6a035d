//! Test infrastructure for the account orchestration suites.
//!
//! Provides a scripted identity provider double and the wiring that
//! assembles an [`tessera_accounts::AccountService`] over the in-memory
//! store.


// Re-export commonly used items
#[allow(unused_imports)]
pub use harness::*;
#[allow(unused_imports)]
pub use mock_provider::*;
