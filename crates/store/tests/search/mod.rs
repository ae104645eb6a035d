//! Search tests for the document store.
//!
//! This module covers the JSON descriptor format end to end, plus
//! pagination and sorting behavior.
