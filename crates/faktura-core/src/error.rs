//! # Error Types
//!
//! Domain-specific error types for faktura-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  faktura-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  faktura-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  faktura-engine errors (separate crate)                                │
//! │  └── EngineError      - What callers of the engine see                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, value, status)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations detected by the pure
/// layer. The engine translates them into its own taxonomy, attaching the
/// offending invoice/item identifiers which the pure layer does not know.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A mutation was attempted on an invoice that is no longer a draft.
    ///
    /// ## When This Occurs
    /// - Adding or removing a line on a finalized invoice
    /// - Finalizing an invoice a second time
    ///
    /// Finalized invoices are a durable audit record; the operation is
    /// rejected, never silently ignored.
    #[error("invoice is {status}, expected draft")]
    NotDraft { status: &'static str },

    /// Finalize was requested on an invoice with zero lines.
    #[error("invoice has no line items")]
    EmptyInvoice,

    /// The tax rate on a catalog item is not one of the permitted values.
    #[error("tax rate {rate}% is not permitted (allowed: {allowed:?})")]
    UnsupportedTaxRate { rate: u32, allowed: &'static [u32] },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller-supplied input doesn't meet requirements.
/// Used for early validation before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Numeric value is out of range.
    #[error("{field} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        reason: String,
    },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: &'static str },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: String,
    },
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
    fn error_messages() {
        let err = CoreError::NotDraft {
            status: "finalized",
        };
        assert_eq!(err.to_string(), "invoice is finalized, expected draft");

        let err = ValidationError::MustBePositive { field: "quantity" };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "document_number",
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
