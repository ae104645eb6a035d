//! Error types for account provisioning.
//!
//! [`AccountError`] is the orchestration-level taxonomy: identifier
//! conflicts surfaced before anything is written, lifecycle failures,
//! and transparent nesting of provider and store faults.
//! [`ProviderError`] covers the identity provider's admin API.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use tessera_store::StoreError;

/// The primary error type for account operations.
#[derive(Error, Debug)]
pub enum AccountError {
    /// Every account operation is realm-scoped.
    #[error("a realm must be provided")]
    RealmRequired,

    /// The requested account id is already claimed.
    #[error("account id already in use: {id}")]
    IdTaken { id: String },

    /// The email address is already claimed.
    #[error("email already in use: {email}")]
    EmailTaken { email: String },

    /// The phone number is already claimed.
    #[error("phone number already in use: {phone}")]
    PhoneTaken { phone: String },

    /// One or more referenced groups do not exist in the realm.
    #[error("one or more groups do not exist: {ids:?}")]
    GroupNotFound { ids: Vec<String> },

    /// No account (or its secrets record) with the given id.
    #[error("account not found: {id}")]
    AccountNotFound { id: String },

    /// The caller-supplied update payload is unusable.
    #[error("invalid update payload: {reason}")]
    InvalidUpdatePayload { reason: String },

    /// The identity provider refused the update; nothing was written
    /// locally.
    #[error("identity provider rejected update for account {id}")]
    UpdateRejected {
        id: String,
        #[source]
        source: ProviderError,
    },

    /// The identity provider refused the delete; local records were
    /// left in place.
    #[error("identity provider rejected delete for account {id}")]
    DeleteRejected {
        id: String,
        #[source]
        source: ProviderError,
    },

    /// Identity provider errors outside update/delete flows.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Persistence errors.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccountError {
    /// Creates an [`AccountError::AccountNotFound`].
    pub fn not_found(id: impl Into<String>) -> Self {
        AccountError::AccountNotFound { id: id.into() }
    }

    /// Creates an [`AccountError::InvalidUpdatePayload`].
    pub fn invalid_update(reason: impl Into<String>) -> Self {
        AccountError::InvalidUpdatePayload {
            reason: reason.into(),
        }
    }
}

/// Errors from the identity provider's admin API.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider already holds a user with a conflicting attribute.
    #[error("identity provider conflict: {detail}")]
    Conflict { detail: String },

    /// The provider rejected the request shape.
    #[error("identity provider rejected request: {detail}")]
    BadRequest { detail: String },

    /// Admin credentials missing or insufficient.
    #[error("identity provider authorization failed (status {status})")]
    Unauthorized { status: u16 },

    /// No provider user with the given id.
    #[error("identity provider user not found: {provider_user_id}")]
    UserNotFound { provider_user_id: String },

    /// Any other non-success status.
    #[error("identity provider returned status {status}: {detail}")]
    Upstream { status: u16, detail: String },

    /// A created user came back without a usable id.
    #[error("identity provider did not return a user id")]
    MissingUserId,

    /// The client could not be built from its configuration.
    #[error("identity provider misconfigured: {detail}")]
    Misconfigured { detail: String },

    /// The provider's response body could not be decoded.
    #[error("failed to decode identity provider response: {message}")]
    Decode { message: String },

    /// Network-level failure talking to the provider.
    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result type alias for account operations.
pub type AccountResult<T> = Result<T, AccountError>;
