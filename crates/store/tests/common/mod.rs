//! Test infrastructure for the document store.
//!
//! This module provides the shared test entity and fixture builders used
//! by the integration suites.

pub mod fixtures;

// Re-export commonly used items
#[allow(unused_imports)]
pub use fixtures::*;
