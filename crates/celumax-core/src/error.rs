//! # Error Types
//!
//! Domain errors for the shop manager.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  CoreError (business rule violations)                                  │
//! │  ├── InsufficientStock       invoice asks for more than is available   │
//! │  ├── InvalidStateTransition  repair ticket moved backwards/skipped     │
//! │  ├── EmptyInvoice            invoice without lines                     │
//! │  ├── NothingToReceive        order receipt with no lines selected      │
//! │  └── Validation              wraps ValidationError                     │
//! │                                                                         │
//! │  ValidationError (bad input)                                           │
//! │  ├── Required, TooLong, OutOfRange, MustBePositive, InvalidFormat      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock to fulfil an invoice line.
    ///
    /// `available` already includes any quantity the invoice being edited
    /// was holding before the edit.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A repair ticket was asked to move to a state it cannot reach.
    #[error("Receipt cannot move from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Invoice has no lines.
    #[error("Invoice must contain at least one line")]
    EmptyInvoice,

    /// Order receipt requested with no purchase lines.
    #[error("No purchase lines selected to receive")]
    NothingToReceive,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
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

    /// Invalid format (e.g., invalid UUID, unknown enum value).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Pantalla A10".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Pantalla A10: available 3, requested 5"
        );

        let err = CoreError::InvalidStateTransition {
            from: "ENTREGADO".to_string(),
            to: "ARREGLADO".to_string(),
        };
        assert_eq!(err.to_string(), "Receipt cannot move from ENTREGADO to ARREGLADO");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "client_name".to_string(),
        };
        assert_eq!(err.to_string(), "client_name is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        };
        assert_eq!(err.to_string(), "name must be at most 200 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
