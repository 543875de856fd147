//! # Money Module
//!
//! Fixed-point monetary arithmetic for the invoicing engine.
//!
//! ## Why Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In f64 arithmetic:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Summed across hundreds of invoice lines, the error becomes visible    │
//! │  on the printed document: subtotal + tax != total.                     │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal everywhere, one rounding point             │
//! │    • intermediates stay unrounded while a line is being priced         │
//! │    • every STORED monetary field is rounded to 2 decimal places        │
//! │      with half-up rounding, exactly once                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use faktura_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! // Construction rounds to 2 decimal places (half-up)
//! let m = Money::new(Decimal::new(104995, 4)); // 10.4995
//! assert_eq!(m.to_string(), "10.50");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Decimal places every stored monetary field is rounded to.
pub const MONEY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount, always normalized to 2 decimal places.
///
/// ## Design Decisions
/// - **Decimal (signed)**: negative amounts are legal (price corrections
///   encoded as negative discounts can push figures below zero)
/// - **Rounds on construction**: a `Money` value IS a stored/displayable
///   figure; raw `Decimal`s carry the unrounded intermediates
/// - **Transparent serde**: serializes as a plain decimal string
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Creates a `Money` value from a raw decimal, rounding it to
    /// [`MONEY_SCALE`] places with half-up rounding.
    ///
    /// This is the single rounding point of the engine: derived fields are
    /// rounded here at the moment they become storable, never before.
    ///
    /// ## Example
    /// ```rust
    /// use faktura_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::new(Decimal::new(2705, 3)).to_string(), "2.71"); // 2.705 → 2.71
    /// assert_eq!(Money::new(Decimal::new(-2705, 3)).to_string(), "-2.71");
    /// ```
    pub fn new(raw: Decimal) -> Self {
        Money(round_money(raw))
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the amount is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the amount is negative.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

/// Rounds a raw decimal to [`MONEY_SCALE`] places, half-up.
///
/// Half-up ("commercial rounding") is the fixed policy of the engine;
/// there is deliberately no way to configure it.
pub fn round_money(raw: Decimal) -> Decimal {
    raw.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Percentage Helpers
// =============================================================================

/// Applies a percentage to an amount: `amount * pct / 100`.
///
/// Operates on raw decimals so intermediate results within one line stay
/// unrounded.
///
/// ## Example
/// ```rust
/// use faktura_core::money::apply_percent;
/// use rust_decimal::Decimal;
///
/// let tax = apply_percent(Decimal::from(270), Decimal::from(20));
/// assert_eq!(tax, Decimal::from(54));
/// ```
#[inline]
pub fn apply_percent(amount: Decimal, pct: Decimal) -> Decimal {
    amount * pct / Decimal::ONE_HUNDRED
}

/// The factor that extracts the tax portion from a tax-inclusive amount:
/// `(100 * rate) / (100 + rate) / 100`.
///
/// For a 20% rate this is `2000 / 120 / 100 = 0.1666...`; multiplied with a
/// gross amount of 240.00 it yields a tax of 40.00.
pub fn vat_extraction_factor(rate_percent: u32) -> Decimal {
    Decimal::from(100 * rate_percent) / Decimal::from(100 + rate_percent) / Decimal::ONE_HUNDRED
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the canonical 2-decimal form, e.g. `270.00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Addition of two Money values. Both operands are already at 2 decimal
/// places, so the sum is exact.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Summation over line fields; used by aggregate recomputation.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn construction_rounds_half_up() {
        assert_eq!(Money::new(dec!(10.004)).amount(), dec!(10.00));
        assert_eq!(Money::new(dec!(10.005)).amount(), dec!(10.01));
        assert_eq!(Money::new(dec!(-10.005)).amount(), dec!(-10.01));
        assert_eq!(Money::new(dec!(10)).amount(), dec!(10));
    }

    #[test]
    fn display_is_two_decimals() {
        assert_eq!(Money::new(dec!(270)).to_string(), "270.00");
        assert_eq!(Money::new(dec!(54.1)).to_string(), "54.10");
        assert_eq!(Money::new(dec!(-5.5)).to_string(), "-5.50");
    }

    #[test]
    fn arithmetic_is_exact() {
        let a = Money::new(dec!(270.00));
        let b = Money::new(dec!(54.00));
        assert_eq!((a + b).amount(), dec!(324.00));
        assert_eq!((a - b).amount(), dec!(216.00));

        let mut acc = Money::ZERO;
        acc += a;
        acc += b;
        assert_eq!(acc.amount(), dec!(324.00));
    }

    #[test]
    fn sum_of_many_small_amounts_has_no_drift() {
        // 0.10 summed 1000 times is exactly 100.00, the f64 failure case
        let total: Money = std::iter::repeat(Money::new(dec!(0.10)))
            .take(1000)
            .sum();
        assert_eq!(total.amount(), dec!(100.00));
    }

    #[test]
    fn apply_percent_basic() {
        assert_eq!(apply_percent(dec!(300), dec!(10)), dec!(30));
        // negative percentages are legal (price increase via negative discount)
        assert_eq!(apply_percent(dec!(300), dec!(-10)), dec!(-30));
    }

    #[test]
    fn extraction_factor_recovers_tax_from_gross() {
        // 240.00 gross at 20% inclusive → 40.00 tax, 200.00 net
        let factor = vat_extraction_factor(20);
        let tax = Money::new(dec!(240) * factor);
        assert_eq!(tax.amount(), dec!(40.00));
    }

    #[test]
    fn extraction_factor_zero_rate_is_zero() {
        assert_eq!(vat_extraction_factor(0), Decimal::ZERO);
    }

    #[test]
    fn negative_detection() {
        assert!(Money::new(dec!(-0.01)).is_negative());
        assert!(!Money::ZERO.is_negative());
        assert!(!Money::new(dec!(0.01)).is_negative());
        assert!(Money::ZERO.is_zero());
    }
}
