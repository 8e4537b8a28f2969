//! # Settlement Error Types
//!
//! Typed error handling for the order and payment settlement workflow.
//! Initiation returns `Result<T, PaymentError>`; callback ingestion never
//! returns an error at all (see [`crate::callback::CallbackAck`]).

use crate::account::AccountStatus;
use thiserror::Error;

/// Errors raised by the Account/Order store collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("Record not found: {id}")]
    NotFound { id: String },

    /// Insert collided with an existing id
    #[error("Duplicate record id: {id}")]
    Duplicate { id: String },

    /// Requested status change breaks the record's lifecycle
    #[error("Illegal transition {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    /// Backend failure (connection, serialization, ...)
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Core error type for payment initiation
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Gateway credentials missing or client misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Account referenced by the checkout does not exist
    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: String },

    /// Account exists but is not for sale right now
    #[error("Account {account_id} is not available (status: {status})")]
    AccountUnavailable {
        account_id: String,
        status: AccountStatus,
    },

    /// Payment method switched off in settings
    #[error("Payment method disabled: {method}")]
    PaymentMethodDisabled { method: String },

    /// Transport failure talking to the gateway
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Gateway answered with a non-success HTTP status
    #[error("Gateway rejected the request with status {code}")]
    GatewayRejected { code: u16 },

    /// Gateway answered 2xx but no payment URL could be extracted
    #[error("Malformed gateway response: {raw}")]
    MalformedResponse { raw: String },

    /// Store collaborator failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Returns true if the buyer may retry by initiating again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_) | PaymentError::Store(StoreError::Backend(_))
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::AccountNotFound { .. } => 404,
            PaymentError::AccountUnavailable { .. } => 409,
            PaymentError::PaymentMethodDisabled { .. } => 400,
            PaymentError::NetworkError(_) => 503,
            PaymentError::GatewayRejected { .. } => 402,
            PaymentError::MalformedResponse { .. } => 502,
            PaymentError::Store(StoreError::NotFound { .. }) => 404,
            PaymentError::Store(_) => 500,
            PaymentError::Internal(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
