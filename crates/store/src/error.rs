//! Error types for the store layer.
//!
//! This module defines the fixed error taxonomy every store operation maps
//! into: record-level outcomes callers branch on, payload and query shape
//! rejections, and backend faults. Query parsing has its own sub-taxonomy
//! ([`QueryError`]) nested transparently into [`StoreError`].

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document with the given id exists in the collection.
    #[error("record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },

    /// The value is already held by another record.
    #[error("value already registered in {collection}: {value}")]
    Conflict { collection: String, value: String },

    /// The caller-supplied update payload is unusable.
    #[error("invalid update payload: {reason}")]
    InvalidUpdatePayload { reason: String },

    /// The caller-supplied query shape is unusable.
    #[error("invalid query parameters: {reason}")]
    InvalidQueryParameters { reason: String },

    /// An insert could not be completed.
    #[error("creation failed in {collection}")]
    CreationFailed {
        collection: String,
        #[source]
        source: BackendError,
    },

    /// An update passed its precondition checks but did not land.
    #[error("update failed for {collection}/{id}: {reason}")]
    UpdateFailed {
        collection: String,
        id: String,
        reason: String,
    },

    /// A delete could not be completed.
    #[error("delete failed in {collection}")]
    DeleteFailed {
        collection: String,
        #[source]
        source: BackendError,
    },

    /// Query descriptor parse or compile errors.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Backend-specific errors.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StoreError {
    /// Creates a [`StoreError::RecordNotFound`].
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::RecordNotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates a [`StoreError::InvalidUpdatePayload`].
    pub fn invalid_update(reason: impl Into<String>) -> Self {
        StoreError::InvalidUpdatePayload {
            reason: reason.into(),
        }
    }

    /// Creates a [`StoreError::InvalidQueryParameters`].
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        StoreError::InvalidQueryParameters {
            reason: reason.into(),
        }
    }
}

/// Errors raised while parsing or validating a query descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The wire form of a descriptor must be a JSON object.
    #[error("query descriptor must be a JSON object")]
    NotAnObject,

    /// A wire element that must be a JSON object was something else.
    #[error("'{key}' must be a JSON object")]
    ExpectedObject { key: &'static str },

    /// An operator name outside the supported set.
    #[error("unsupported filter operator: {op}")]
    UnsupportedOperator { op: String },

    /// An operator was given an operand of the wrong shape.
    #[error("operator '{op}' on field '{field}': {reason}")]
    MalformedOperand {
        op: String,
        field: String,
        reason: String,
    },

    /// A date bound that does not parse as RFC 3339.
    #[error("invalid timestamp '{value}': expected ISO 8601 (e.g. 2024-08-10T00:00:00Z)")]
    InvalidTimestamp { value: String },

    /// A date filter type outside the supported set.
    #[error("invalid date filter type '{mode}': allowed are on, >=, <=, today, between")]
    UnknownDateMode { mode: String },

    /// A date filter type missing one of its required bounds.
    #[error("missing '{bound}' for '{mode}' date filter type")]
    MissingDateBound { mode: String, bound: &'static str },

    /// A sort direction other than 1 or -1.
    #[error("invalid sort direction for field '{field}': use 1 (ascending) or -1 (descending)")]
    InvalidSortDirection { field: String },
}

/// Errors originating from a storage backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// A write violated a primary-key constraint.
    #[error("duplicate key: {message}")]
    DuplicateKey { message: String },

    /// The backend is unreachable or refusing connections.
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    /// A filter could not be executed.
    #[error("query execution failed: {message}")]
    QueryExecution { message: String },

    /// Document encoding or decoding failed.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
    },
}

impl BackendError {
    /// Returns `true` for primary-key uniqueness violations.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, BackendError::DuplicateKey { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// Implement conversions from common error types

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Backend(BackendError::Serialization {
            message: err.to_string(),
        })
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(err: bson::de::Error) -> Self {
        StoreError::Backend(BackendError::Serialization {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for BackendError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000 => {
                BackendError::DuplicateKey {
                    message: write_error.message.clone(),
                }
            }
            _ => BackendError::Internal {
                backend_name: "mongodb".to_string(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(BackendError::from(err))
    }
}
