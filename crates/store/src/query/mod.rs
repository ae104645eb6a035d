//! Structured queries and their compilation to native filters.
//!
//! Callers describe a search with a [`QueryDescriptor`] (id lists,
//! text search, field conditions, a date window, and sort order) and
//! [`compile`] lowers it to a [`CompiledQuery`] holding the filter and
//! sort documents every backend consumes. Descriptors are built
//! fluently or parsed from the legacy JSON map format, and all
//! validation happens at that boundary; compilation never fails.

mod compiler;
mod descriptor;

pub use compiler::{CompiledQuery, compile};
pub use descriptor::{
    DEFAULT_DATE_FIELD, DateFilter, DateFilterMode, FieldCondition, FilterTree, QueryDescriptor,
    SortDirection, TextSearch,
};
