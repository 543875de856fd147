//! # Line Item Pricing Calculator
//!
//! Pure derivation of a line's monetary fields from its raw inputs, and
//! aggregation of lines into invoice totals.
//!
//! ## The Two Pricing Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EXCLUSIVE-COST ("I am entering a net cost")                            │
//! │                                                                         │
//! │  value_before_discount = base_price × quantity                         │
//! │  line_subtotal = value_before_discount × (1 − discount% / 100)         │
//! │  tax_amount    = line_subtotal × tax_rate% / 100                       │
//! │  line_total    = line_subtotal + tax_amount                            │
//! │  unit_price    = (base_price + dependent_costs / quantity)             │
//! │                  × (1 + price_difference% / 100)      [informational]  │
//! │                                                                         │
//! │  INCLUSIVE-PRICE ("I am entering a gross selling price")               │
//! │                                                                         │
//! │  line_total  = base_price × quantity                                   │
//! │  tax_amount  = line_total × (100 × rate) / (100 + rate) / 100          │
//! │  line_subtotal = line_total − tax_amount                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Catalog items are priced tax-inclusive for point-of-sale display, but
//! invoice accounting reports the tax-exclusive subtotal and the tax amount
//! separately; the two modes cover both entry directions. The mode is an
//! explicit input on every line, never inferred.
//!
//! ## Rounding Discipline
//! The whole chain for one line is computed on unrounded decimals; each
//! stored field (`line_subtotal`, `tax_amount`, `line_total`, `unit_price`)
//! is rounded independently at the moment it becomes storable. This prevents
//! compounding rounding error within a line while keeping stored values
//! canonical at 2 decimal places.

use crate::error::CoreResult;
use crate::money::{apply_percent, vat_extraction_factor, Money};
use crate::types::{InvoiceTotals, ItemSnapshot, LineInput, LineItem, PricingMode};
use crate::validation::validate_line_input;

// =============================================================================
// Line Figures
// =============================================================================

/// The derived monetary fields of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFigures {
    pub line_subtotal: Money,
    pub tax_amount: Money,
    pub line_total: Money,
    /// Cost-plus unit price; `Some` only in exclusive-cost mode.
    pub unit_price: Option<Money>,
}

// =============================================================================
// Pricing
// =============================================================================

/// Derives the monetary fields of one line from its raw inputs and the item
/// snapshot.
///
/// Validates the input first; a validation failure means nothing further
/// happens. The tax rate comes verbatim from the snapshot.
pub fn price_line(snapshot: &ItemSnapshot, input: &LineInput) -> CoreResult<LineFigures> {
    validate_line_input(input)?;

    let rate = snapshot.tax_rate;

    let figures = match input.mode {
        PricingMode::ExclusiveCost => {
            let value_before_discount = input.base_price * input.quantity;
            let raw_subtotal = value_before_discount
                - apply_percent(value_before_discount, input.discount_percent);
            let raw_tax = apply_percent(raw_subtotal, rate.as_decimal());
            let raw_total = raw_subtotal + raw_tax;

            // quantity > 0 was just validated, the division is safe
            let raw_unit = input.base_price + input.dependent_costs / input.quantity;
            let raw_unit_price = raw_unit + apply_percent(raw_unit, input.price_difference_percent);

            LineFigures {
                line_subtotal: Money::new(raw_subtotal),
                tax_amount: Money::new(raw_tax),
                line_total: Money::new(raw_total),
                unit_price: Some(Money::new(raw_unit_price)),
            }
        }
        PricingMode::InclusivePrice => {
            let raw_total = input.base_price * input.quantity;
            let raw_tax = raw_total * vat_extraction_factor(rate.percent());
            let raw_subtotal = raw_total - raw_tax;

            LineFigures {
                line_subtotal: Money::new(raw_subtotal),
                tax_amount: Money::new(raw_tax),
                line_total: Money::new(raw_total),
                unit_price: None,
            }
        }
    };

    Ok(figures)
}

// =============================================================================
// Aggregation
// =============================================================================

/// Re-derives the invoice aggregates from a committed line set.
///
/// `subtotal = Σ line_subtotal`, `tax_amount = Σ tax_amount`,
/// `total = subtotal + tax_amount`. Line fields are already at 2 decimal
/// places, so the sums are exact and the function is idempotent.
///
/// This is the only summation logic in the workspace; the engine calls it
/// inside every add/remove transaction and readers never recompute.
pub fn aggregate_totals(lines: &[LineItem]) -> InvoiceTotals {
    let subtotal: Money = lines.iter().map(|line| line.line_subtotal).sum();
    let tax_amount: Money = lines.iter().map(|line| line.tax_amount).sum();

    InvoiceTotals {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use crate::types::TaxRate;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn snapshot(rate: u32) -> ItemSnapshot {
        ItemSnapshot {
            item_id: "item-1".to_string(),
            name: "Test item".to_string(),
            unit: "piece".to_string(),
            tax_rate: TaxRate::new(rate).unwrap(),
        }
    }

    fn line_from_figures(figures: LineFigures) -> LineItem {
        LineItem {
            id: "line".to_string(),
            invoice_id: "inv".to_string(),
            item_id: "item".to_string(),
            name: "Test item".to_string(),
            unit: "piece".to_string(),
            tax_rate: TaxRate::new(20).unwrap(),
            mode: PricingMode::ExclusiveCost,
            quantity: dec!(1),
            base_price: dec!(0),
            discount_percent: dec!(0),
            dependent_costs: dec!(0),
            price_difference_percent: dec!(0),
            line_subtotal: figures.line_subtotal,
            tax_amount: figures.tax_amount,
            line_total: figures.line_total,
            unit_price: figures.unit_price,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn exclusive_mode_reference_example() {
        // base 100, qty 3, discount 10%, tax 20%
        let mut input = LineInput::exclusive(dec!(3), dec!(100));
        input.discount_percent = dec!(10);

        let figures = price_line(&snapshot(20), &input).unwrap();
        assert_eq!(figures.line_subtotal.amount(), dec!(270.00));
        assert_eq!(figures.tax_amount.amount(), dec!(54.00));
        assert_eq!(figures.line_total.amount(), dec!(324.00));
        assert_eq!(figures.unit_price.unwrap().amount(), dec!(100.00));
    }

    #[test]
    fn inclusive_mode_reference_example() {
        // gross 120, qty 2, tax 20% → 240.00 / 40.00 / 200.00
        let input = LineInput::inclusive(dec!(2), dec!(120));

        let figures = price_line(&snapshot(20), &input).unwrap();
        assert_eq!(figures.line_total.amount(), dec!(240.00));
        assert_eq!(figures.tax_amount.amount(), dec!(40.00));
        assert_eq!(figures.line_subtotal.amount(), dec!(200.00));
        assert_eq!(figures.unit_price, None);
    }

    #[test]
    fn inclusive_mode_zero_rate_extracts_nothing() {
        let input = LineInput::inclusive(dec!(4), dec!(25));

        let figures = price_line(&snapshot(0), &input).unwrap();
        assert_eq!(figures.line_total.amount(), dec!(100.00));
        assert_eq!(figures.tax_amount.amount(), dec!(0.00));
        assert_eq!(figures.line_subtotal.amount(), dec!(100.00));
    }

    #[test]
    fn cost_plus_unit_price_with_dependent_costs() {
        // (100 + 20/4) × 1.10 = 115.50
        let mut input = LineInput::exclusive(dec!(4), dec!(100));
        input.dependent_costs = dec!(20);
        input.price_difference_percent = dec!(10);

        let figures = price_line(&snapshot(10), &input).unwrap();
        assert_eq!(figures.unit_price.unwrap().amount(), dec!(115.50));
        // unit price does not feed the totals
        assert_eq!(figures.line_subtotal.amount(), dec!(400.00));
        assert_eq!(figures.tax_amount.amount(), dec!(40.00));
        assert_eq!(figures.line_total.amount(), dec!(440.00));
    }

    #[test]
    fn negative_discount_is_a_price_increase() {
        let mut input = LineInput::exclusive(dec!(1), dec!(100));
        input.discount_percent = dec!(-10);

        let figures = price_line(&snapshot(0), &input).unwrap();
        assert_eq!(figures.line_subtotal.amount(), dec!(110.00));
    }

    #[test]
    fn fields_round_independently_from_unrounded_chain() {
        // gross 0.99 × 1 at 20%: raw tax = 0.165, raw net = 0.825
        // tax → 0.17 (half-up), net → 0.83, total stays 0.99
        let input = LineInput::inclusive(dec!(1), dec!(0.99));

        let figures = price_line(&snapshot(20), &input).unwrap();
        assert_eq!(figures.line_total.amount(), dec!(0.99));
        assert_eq!(figures.tax_amount.amount(), dec!(0.17));
        assert_eq!(figures.line_subtotal.amount(), dec!(0.83));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let input = LineInput::exclusive(dec!(0), dec!(100));
        assert!(matches!(
            price_line(&snapshot(20), &input),
            Err(CoreError::Validation(ValidationError::MustBePositive {
                field: "quantity"
            }))
        ));
    }

    #[test]
    fn negative_base_price_is_rejected() {
        let input = LineInput::exclusive(dec!(1), dec!(-5));
        assert!(price_line(&snapshot(20), &input).is_err());
    }

    #[test]
    fn aggregates_sum_the_line_fields() {
        let a = line_from_figures(
            price_line(&snapshot(20), &LineInput::exclusive(dec!(3), dec!(100))).unwrap(),
        );
        let b = line_from_figures(
            price_line(&snapshot(20), &LineInput::inclusive(dec!(2), dec!(120))).unwrap(),
        );

        let totals = aggregate_totals(&[a.clone(), b.clone()]);
        assert_eq!(
            totals.subtotal,
            a.line_subtotal + b.line_subtotal
        );
        assert_eq!(totals.tax_amount, a.tax_amount + b.tax_amount);
        assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let lines = vec![
            line_from_figures(
                price_line(&snapshot(10), &LineInput::exclusive(dec!(7), dec!(3.33))).unwrap(),
            ),
            line_from_figures(
                price_line(&snapshot(20), &LineInput::inclusive(dec!(1), dec!(0.99))).unwrap(),
            ),
        ];

        let first = aggregate_totals(&lines);
        let second = aggregate_totals(&lines);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_line_set_has_zero_totals() {
        assert_eq!(aggregate_totals(&[]), InvoiceTotals::ZERO);
    }
}
