//! Ledger error types for validation, state and storage errors.
//!
//! Every engine operation returns `LedgerError`. Storage adapters translate
//! their own failures into `Storage` or `ConcurrentModification` so callers
//! never see driver-specific errors.

use saldo_shared::AppError;
use saldo_shared::types::{AccountId, MovementId, PaginationError};
use thiserror::Error;

use super::movement::MovementStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Movement not found.
    #[error("Movement not found: {0}")]
    MovementNotFound(MovementId),

    // ========== Validation Errors ==========
    /// Invalid input (amounts, filters, pagination).
    #[error("Validation error: {0}")]
    Validation(String),

    // ========== State Errors ==========
    /// The requested status change is not allowed.
    #[error("Cannot change movement status from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: MovementStatus,
        /// Requested status.
        to: MovementStatus,
    },

    /// Cancelled movements cannot be edited.
    #[error("Movement {0} is cancelled and cannot be modified")]
    MovementCancelled(MovementId),

    // ========== Concurrency Errors ==========
    /// A stored running balance changed between read and write.
    #[error("Concurrent modification of account {account_id} (movement {movement_id}), please retry")]
    ConcurrentModification {
        /// Account being recalculated.
        account_id: AccountId,
        /// Movement whose guarded update matched no row.
        movement_id: MovementId,
    },

    // ========== Infrastructure Errors ==========
    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Per-account recalculation did not finish in time.
    #[error("Recalculation of account {account_id} timed out after {secs}s")]
    Timeout {
        /// Account being recalculated.
        account_id: AccountId,
        /// Configured timeout in seconds.
        secs: u64,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::MovementNotFound(_) => "MOVEMENT_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::MovementCancelled(_) => "MOVEMENT_CANCELLED",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::Validation(_) => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::MovementNotFound(_) => 404,

            // 409 Conflict - concurrency errors
            Self::ConcurrentModification { .. } => 409,

            // 422 Unprocessable - state rules
            Self::InvalidStatusTransition { .. } | Self::MovementCancelled(_) => 422,

            // 500 Internal Server Error
            Self::Storage(_) => 500,

            // 504 Gateway Timeout
            Self::Timeout { .. } => 504,
        }
    }

    /// Returns the message shown to API clients.
    ///
    /// Storage failures carry driver text and are reported generically.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "An error occurred".to_string(),
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl From<PaginationError> for LedgerError {
    fn from(err: PaginationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::AccountNotFound(_) | LedgerError::MovementNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::Validation(msg) => Self::Validation(msg),
            LedgerError::InvalidStatusTransition { .. } | LedgerError::MovementCancelled(_) => {
                Self::BusinessRule(message)
            }
            LedgerError::ConcurrentModification { .. } => Self::Conflict(message),
            LedgerError::Storage(msg) => Self::Database(msg),
            LedgerError::Timeout { .. } => Self::Timeout(message),
        }
    }
}
