//! # Error Types
//!
//! Domain-specific error types for mesa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mesa-core errors (this file)                                          │
//! │  ├── CoreError        - Lifecycle, payment and lookup failures          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  mesa-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  mesa-server errors                                                    │
//! │  └── ApiError         - What clients see ({code, message})             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries enough context (amounts, field names, current
//! status) for the caller to correct the request and resubmit. Nothing is
//! retried automatically.

use thiserror::Error;

use crate::money::Money;
use crate::types::{AccountStatus, ItemStatus};

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse error class used by the API layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// Operation not legal in the current lifecycle phase.
    InvalidState,
    /// Unknown account, item, sub-ledger or share.
    NotFound,
    /// Declared payment amounts do not reconcile.
    PaymentMismatch,
    /// Actor lacks rights over the tenant or operation.
    Forbidden,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The account is not in a state that allows the operation.
    ///
    /// ## When This Occurs
    /// - Adding items after the bill was requested
    /// - Any mutation of a `paid` or `cancelled` account
    /// - Paying the whole account after a sub-ledger was settled
    #[error("Account {account_id} is {status}, cannot {operation}")]
    InvalidState {
        account_id: String,
        status: AccountStatus,
        operation: String,
    },

    /// The item is not in a status that allows the operation.
    ///
    /// ## When This Occurs
    /// - Editing or cancelling an item already sent to the kitchen
    /// - Marking ready an item that is not `preparing`
    #[error("Item {item_id} is {status}, cannot {operation}")]
    InvalidItemStatus {
        item_id: String,
        status: ItemStatus,
        operation: String,
    },

    /// A partition (sub-ledger or the unassigned bucket) is already paid
    /// and its contents can no longer change.
    #[error("Partition '{partition}' is already paid")]
    PartitionSettled { partition: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Declared payment amounts do not reconcile with the amount due.
    ///
    /// ## User Workflow
    /// ```text
    /// Amount due + tip: $310.50
    ///      │
    ///      ▼
    /// Declared: cash $200 + card $100 = $300.00
    ///      │
    ///      ▼
    /// PaymentMismatch { expected: $310.50, declared: $300.00, difference: -$10.50 }
    ///      │
    ///      ▼
    /// Cashier re-enters the amounts
    /// ```
    #[error("Payment mismatch: expected {expected}, declared {declared} (difference {difference})")]
    PaymentMismatch {
        expected: Money,
        declared: Money,
        difference: Money,
    },

    /// The actor may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a PaymentMismatch error from the two amounts.
    pub fn mismatch(expected: Money, declared: Money) -> Self {
        CoreError::PaymentMismatch {
            expected,
            declared,
            difference: declared - expected,
        }
    }

    /// Returns the error class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidState { .. }
            | CoreError::InvalidItemStatus { .. }
            | CoreError::PartitionSettled { .. } => ErrorKind::InvalidState,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::PaymentMismatch { .. } => ErrorKind::PaymentMismatch,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate sub-ledger name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidState {
            account_id: "acc-1".to_string(),
            status: AccountStatus::Paid,
            operation: "add order".to_string(),
        };
        assert_eq!(err.to_string(), "Account acc-1 is paid, cannot add order");

        let err = CoreError::mismatch(Money::from_cents(31050), Money::from_cents(30000));
        assert_eq!(
            err.to_string(),
            "Payment mismatch: expected $310.50, declared $300.00 (difference -$10.50)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "reason".to_string(),
        };
        assert_eq!(err.to_string(), "reason is required");

        let err = ValidationError::Duplicate {
            field: "subcuenta".to_string(),
            value: "Ana".to_string(),
        };
        assert_eq!(err.to_string(), "subcuenta 'Ana' already exists");
    }

    #[test]
    fn test_error_kinds() {
        let validation: CoreError = ValidationError::Required {
            field: "name".to_string(),
        }
        .into();
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(CoreError::not_found("Item", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::PartitionSettled {
                partition: "Ana".to_string()
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            CoreError::mismatch(Money::zero(), Money::from_cents(1)).kind(),
            ErrorKind::PaymentMismatch
        );
    }
}
