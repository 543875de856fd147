//! # Engine Error Types
//!
//! The error taxonomy callers of the engine see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (faktura-core)      DbError (faktura-db)                     │
//! │       │                             │                                   │
//! │       └──────────┬──────────────────┘                                   │
//! │                  ▼                                                      │
//! │            EngineError ← One flat taxonomy, no raw storage errors       │
//! │                  │        leak through for domain conditions            │
//! │                  ▼                                                      │
//! │       Caller matches on variants (is_retryable() for retry policy)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use faktura_core::{CoreError, ValidationError};
use faktura_db::DbError;

/// Errors surfaced by [`InvoiceService`](crate::InvoiceService).
///
/// Domain conditions get their own variants; only genuinely unexpected
/// storage failures pass through as [`EngineError::Storage`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// A caller-supplied input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Referenced catalog item does not exist.
    #[error("item not found: {id}")]
    ItemNotFound { id: String },

    /// Referenced supplier does not exist.
    #[error("supplier not found: {id}")]
    SupplierNotFound { id: String },

    /// Referenced invoice does not exist.
    #[error("invoice not found: {id}")]
    InvoiceNotFound { id: String },

    /// The invoice has no line for this item.
    #[error("invoice {invoice_id} has no line for item {item_id}")]
    LineNotFound { invoice_id: String, item_id: String },

    /// The invoice already has a line for this item.
    #[error("item {item_id} is already on invoice {invoice_id}")]
    AlreadyAdded { invoice_id: String, item_id: String },

    /// A mutation was attempted on an invoice that is not a draft.
    #[error("invoice is not a draft (status: {status})")]
    InvoiceNotDraft { status: &'static str },

    /// Finalize was attempted on an invoice with no lines.
    #[error("cannot finalize an invoice with no lines")]
    EmptyInvoice,

    /// The invoice is at its line-count cap.
    #[error("invoice already has the maximum of {max} lines")]
    TooManyLines { max: usize },

    /// The per-invoice lock could not be acquired in time. Retryable.
    #[error("invoice {invoice_id} is busy, try again")]
    ConcurrencyConflict { invoice_id: String },

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

impl EngineError {
    /// Whether retrying the same call later can reasonably succeed.
    ///
    /// Lock contention and pool exhaustion are transient; every other
    /// variant reports a state the retry would hit again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::ConcurrencyConflict { .. } | EngineError::Storage(DbError::PoolExhausted)
        )
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => EngineError::InvalidInput(v),
            CoreError::UnsupportedTaxRate { rate, allowed } => {
                EngineError::InvalidInput(ValidationError::OutOfRange {
                    field: "tax_rate",
                    reason: format!("rate {rate}% is not in the permitted set {allowed:?}"),
                })
            }
            CoreError::NotDraft { status } => EngineError::InvoiceNotDraft { status },
            CoreError::EmptyInvoice => EngineError::EmptyInvoice,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let busy = EngineError::ConcurrencyConflict {
            invoice_id: "inv-1".to_string(),
        };
        assert!(busy.is_retryable());
        assert!(EngineError::Storage(DbError::PoolExhausted).is_retryable());

        let dup = EngineError::AlreadyAdded {
            invoice_id: "inv-1".to_string(),
            item_id: "item-1".to_string(),
        };
        assert!(!dup.is_retryable());
        assert!(!EngineError::EmptyInvoice.is_retryable());
    }

    #[test]
    fn core_errors_map_to_taxonomy() {
        let err: EngineError = CoreError::EmptyInvoice.into();
        assert!(matches!(err, EngineError::EmptyInvoice));

        let err: EngineError = CoreError::NotDraft {
            status: "finalized",
        }
        .into();
        assert!(matches!(
            err,
            EngineError::InvoiceNotDraft {
                status: "finalized"
            }
        ));
    }
}
