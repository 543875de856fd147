//! # Validation Module
//!
//! Input validation for the invoicing engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP/UI collaborator)                                │
//! │  ├── Basic format checks, immediate user feedback                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any write begins)                        │
//! │  ├── Business rule validation                                          │
//! │  └── A failure here means nothing was persisted                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / FOREIGN KEY constraints                       │
//! │  └── Backstop for races the upper layers cannot see                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::types::LineInput;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a document number.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 64 characters
///
/// ## Example
/// ```rust
/// use faktura_core::validation::validate_document_number;
///
/// assert!(validate_document_number("FK-2026-0042").is_ok());
/// assert!(validate_document_number("").is_err());
/// ```
pub fn validate_document_number(document_number: &str) -> ValidationResult<()> {
    let document_number = document_number.trim();

    if document_number.is_empty() {
        return Err(ValidationError::Required {
            field: "document_number",
        });
    }

    if document_number.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "document_number",
            max: 64,
        });
    }

    Ok(())
}

/// Validates a display name (item, supplier).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required { field: "name" });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name",
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be strictly positive (the cost-plus unit price divides by it)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
///
/// Quantities may be fractional (e.g. 2.5 kg).
pub fn validate_quantity(quantity: Decimal) -> ValidationResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive { field: "quantity" });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            reason: format!("must be at most {MAX_LINE_QUANTITY}"),
        });
    }

    Ok(())
}

/// Validates a non-negative monetary input (base price, dependent costs).
///
/// Zero is allowed (free items, no dependent costs).
pub fn validate_non_negative(field: &'static str, amount: Decimal) -> ValidationResult<()> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::MustNotBeNegative { field });
    }

    Ok(())
}

/// Validates the full raw input of one line before it is priced.
///
/// `discount_percent` and `price_difference_percent` are deliberately NOT
/// range-checked: negative values are a legal way to encode a price increase.
pub fn validate_line_input(input: &LineInput) -> ValidationResult<()> {
    validate_quantity(input.quantity)?;
    validate_non_negative("base_price", input.base_price)?;
    validate_non_negative("dependent_costs", input.dependent_costs)?;
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use faktura_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required { field: "id" });
    }

    uuid::Uuid::parse_str(id).map_err(|e| ValidationError::InvalidFormat {
        field: "id",
        reason: e.to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn document_number_rules() {
        assert!(validate_document_number("FK-2026-0042").is_ok());
        assert!(validate_document_number("").is_err());
        assert!(validate_document_number("   ").is_err());
        assert!(validate_document_number(&"9".repeat(100)).is_err());
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("Mineral water 1.5l").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn quantity_must_be_strictly_positive() {
        assert!(validate_quantity(dec!(1)).is_ok());
        assert!(validate_quantity(dec!(2.5)).is_ok());

        assert!(validate_quantity(dec!(0)).is_err());
        assert!(validate_quantity(dec!(-1)).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + dec!(1)).is_err());
    }

    #[test]
    fn non_negative_amounts() {
        assert!(validate_non_negative("base_price", dec!(0)).is_ok());
        assert!(validate_non_negative("base_price", dec!(10.99)).is_ok());
        assert!(validate_non_negative("base_price", dec!(-0.01)).is_err());
    }

    #[test]
    fn line_input_allows_negative_discount() {
        let mut input = LineInput::exclusive(dec!(3), dec!(100));
        input.discount_percent = dec!(-10); // price increase, legal
        assert!(validate_line_input(&input).is_ok());

        input.dependent_costs = dec!(-5);
        assert!(validate_line_input(&input).is_err());
    }

    #[test]
    fn uuid_format() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
