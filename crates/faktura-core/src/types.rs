//! # Domain Types
//!
//! Core domain types for the invoicing engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │     Invoice     │   │    LineItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  invoice_id     │       │
//! │  │  name, unit     │   │  document_no    │   │  item_id        │       │
//! │  │  price          │   │  status         │   │  snapshot + raw │       │
//! │  │  tax_rate       │   │  subtotal/tax/  │   │  inputs         │       │
//! │  └─────────────────┘   │  total          │   │  derived fields │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     TaxRate     │   │  InvoiceStatus  │   │   PricingMode   │       │
//! │  │  0 / 10 / 20 %  │   │  Draft          │   │  ExclusiveCost  │       │
//! │  └─────────────────┘   │  Finalized      │   │  InclusivePrice │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `LineItem` carries a frozen copy of the catalog item's name, unit and
//! tax rate, captured at the moment the line is added. Later catalog edits
//! never rewrite invoice history.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::PERMITTED_TAX_RATES;

// =============================================================================
// Tax Rate
// =============================================================================

/// A tax rate as an integer percentage, restricted to the catalog's
/// permitted set ([`PERMITTED_TAX_RATES`]).
///
/// The rate is copied verbatim from the item snapshot onto each line and
/// never recomputed from any other code or classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TaxRate(u32);

impl TaxRate {
    /// Zero tax rate.
    pub const ZERO: TaxRate = TaxRate(0);

    /// Creates a tax rate, rejecting values outside the permitted set.
    pub fn new(percent: u32) -> CoreResult<Self> {
        if PERMITTED_TAX_RATES.contains(&percent) {
            Ok(TaxRate(percent))
        } else {
            Err(CoreError::UnsupportedTaxRate {
                rate: percent,
                allowed: PERMITTED_TAX_RATES,
            })
        }
    }

    /// Returns the rate as an integer percentage.
    #[inline]
    pub const fn percent(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a decimal percentage (for pricing math).
    #[inline]
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::ZERO
    }
}

impl TryFrom<u32> for TaxRate {
    type Error = CoreError;

    fn try_from(percent: u32) -> Result<Self, Self::Error> {
        TaxRate::new(percent)
    }
}

impl From<TaxRate> for u32 {
    fn from(rate: TaxRate) -> u32 {
        rate.0
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A catalog item. Owned by the catalog collaborator; the engine reads it
/// only to take snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit label (piece, kg, l, ...).
    pub unit: String,

    /// Base price. Meaning depends on the pricing mode chosen when the item
    /// is put on a line: a net cost in exclusive-cost mode, a tax-inclusive
    /// selling price in inclusive-price mode.
    pub price: Decimal,

    /// Tax rate from the permitted set.
    pub tax_rate: TaxRate,

    /// When the item was created.
    pub created_at: DateTime<Utc>,

    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Takes an immutable snapshot of this item for a line item.
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            item_id: self.id.clone(),
            name: self.name.clone(),
            unit: self.unit.clone(),
            tax_rate: self.tax_rate,
        }
    }
}

/// A point-in-time copy of a catalog item, frozen onto a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub item_id: String,
    pub name: String,
    pub unit: String,
    pub tax_rate: TaxRate,
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier. Referenced by invoices for display only; irrelevant to any
/// computation in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub code: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The lifecycle status of an invoice.
///
/// The only legal transition is `Draft → Finalized`. There is no reverse
/// transition and no other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Lines may be added and removed.
    #[default]
    Draft,
    /// Line set and aggregates are frozen (terminal).
    Finalized,
}

impl InvoiceStatus {
    /// Returns the canonical string form used in storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Finalized => "finalized",
        }
    }

    /// Parses the canonical string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "finalized" => Some(InvoiceStatus::Finalized),
            _ => None,
        }
    }

    /// Checks that line mutations are legal in this status.
    pub fn ensure_mutable(&self) -> CoreResult<()> {
        match self {
            InvoiceStatus::Draft => Ok(()),
            InvoiceStatus::Finalized => Err(CoreError::NotDraft {
                status: self.as_str(),
            }),
        }
    }

    /// The one-way `Draft → Finalized` transition.
    ///
    /// Finalizing an already finalized invoice is an error, not a no-op.
    pub fn finalize(&self) -> CoreResult<InvoiceStatus> {
        match self {
            InvoiceStatus::Draft => Ok(InvoiceStatus::Finalized),
            InvoiceStatus::Finalized => Err(CoreError::NotDraft {
                status: self.as_str(),
            }),
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An invoice with its aggregate fields.
///
/// ## Invariant
/// `subtotal`, `tax_amount` and `total` are a pure function of the current
/// line set: `subtotal = Σ line_subtotal`, `tax_amount = Σ tax_amount`,
/// `total = subtotal + tax_amount`. They are recomputed inside the same
/// transaction as every line mutation and are never stale after a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub supplier_id: String,
    /// Document number assigned by the caller (non-empty).
    pub document_number: String,
    pub date: NaiveDate,
    pub status: InvoiceStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The three aggregate fields, as recomputed from a line set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total: Money,
}

impl InvoiceTotals {
    /// Totals of an empty line set.
    pub const ZERO: InvoiceTotals = InvoiceTotals {
        subtotal: Money::ZERO,
        tax_amount: Money::ZERO,
        total: Money::ZERO,
    };
}

// =============================================================================
// Pricing Mode
// =============================================================================

/// How the caller supplies `base_price`, selected per line at add-time.
///
/// The mode is a required, explicit input. The engine never infers it and
/// never mixes modes within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// `base_price` is a net cost; tax is added on top of the discounted
    /// buying price ("I am entering a net cost").
    ExclusiveCost,
    /// `base_price` is a tax-inclusive selling price; tax is extracted,
    /// not added ("I am entering a gross selling price").
    InclusivePrice,
}

impl PricingMode {
    /// Returns the canonical string form used in storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PricingMode::ExclusiveCost => "exclusive_cost",
            PricingMode::InclusivePrice => "inclusive_price",
        }
    }

    /// Parses the canonical string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exclusive_cost" => Some(PricingMode::ExclusiveCost),
            "inclusive_price" => Some(PricingMode::InclusivePrice),
            _ => None,
        }
    }
}

// =============================================================================
// Line Input
// =============================================================================

/// The raw caller-supplied inputs for one line.
///
/// `discount_percent` and `price_difference_percent` may be negative (a
/// caller may encode a price increase as a negative discount); `quantity`
/// must be strictly positive and `base_price`/`dependent_costs` must not be
/// negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub mode: PricingMode,
    pub quantity: Decimal,
    pub base_price: Decimal,
    pub discount_percent: Decimal,
    pub dependent_costs: Decimal,
    pub price_difference_percent: Decimal,
}

impl LineInput {
    /// A line in exclusive-cost mode with all optional inputs at their
    /// defaults (no discount, no dependent costs, no markup).
    pub fn exclusive(quantity: Decimal, base_price: Decimal) -> Self {
        LineInput {
            mode: PricingMode::ExclusiveCost,
            quantity,
            base_price,
            discount_percent: Decimal::ZERO,
            dependent_costs: Decimal::ZERO,
            price_difference_percent: Decimal::ZERO,
        }
    }

    /// A line in inclusive-price mode.
    pub fn inclusive(quantity: Decimal, base_price: Decimal) -> Self {
        LineInput {
            mode: PricingMode::InclusivePrice,
            quantity,
            base_price,
            discount_percent: Decimal::ZERO,
            dependent_costs: Decimal::ZERO,
            price_difference_percent: Decimal::ZERO,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One priced catalog item entry on one invoice.
///
/// At most one line per `(invoice_id, item_id)` pair exists on an invoice.
/// The derived fields are never set by callers; they are always produced by
/// the pricing calculator from the raw inputs and the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub invoice_id: String,
    pub item_id: String,

    /// Item name at the time the line was added (frozen).
    pub name: String,
    /// Unit label at the time the line was added (frozen).
    pub unit: String,
    /// Tax rate at the time the line was added (frozen).
    pub tax_rate: TaxRate,

    /// Raw inputs, kept so the line can be re-derived and audited.
    pub mode: PricingMode,
    pub quantity: Decimal,
    pub base_price: Decimal,
    pub discount_percent: Decimal,
    pub dependent_costs: Decimal,
    pub price_difference_percent: Decimal,

    /// Net amount for the line.
    pub line_subtotal: Money,
    /// Tax amount for the line.
    pub tax_amount: Money,
    /// Gross amount for the line.
    pub line_total: Money,
    /// Informational cost-plus unit price; `Some` only in exclusive-cost
    /// mode, not used in totals.
    pub unit_price: Option<Money>,

    pub created_at: DateTime<Utc>,
}

/// An invoice together with its lines, as returned by reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceWithLines {
    pub invoice: Invoice,
    /// Lines in insertion order.
    pub lines: Vec<LineItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rate_permitted_set() {
        assert!(TaxRate::new(0).is_ok());
        assert!(TaxRate::new(10).is_ok());
        assert!(TaxRate::new(20).is_ok());
        assert!(matches!(
            TaxRate::new(17),
            Err(CoreError::UnsupportedTaxRate { rate: 17, .. })
        ));
    }

    #[test]
    fn status_roundtrip() {
        for status in [InvoiceStatus::Draft, InvoiceStatus::Finalized] {
            assert_eq!(InvoiceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvoiceStatus::parse("voided"), None);
    }

    #[test]
    fn draft_is_mutable_finalized_is_not() {
        assert!(InvoiceStatus::Draft.ensure_mutable().is_ok());
        assert!(matches!(
            InvoiceStatus::Finalized.ensure_mutable(),
            Err(CoreError::NotDraft {
                status: "finalized"
            })
        ));
    }

    #[test]
    fn finalize_is_one_way() {
        assert_eq!(
            InvoiceStatus::Draft.finalize().unwrap(),
            InvoiceStatus::Finalized
        );
        // not idempotent: finalizing again is an error
        assert!(InvoiceStatus::Finalized.finalize().is_err());
    }

    #[test]
    fn pricing_mode_roundtrip() {
        for mode in [PricingMode::ExclusiveCost, PricingMode::InclusivePrice] {
            assert_eq!(PricingMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(PricingMode::parse("bogus"), None);
    }

    #[test]
    fn snapshot_copies_item_fields() {
        let item = Item {
            id: "item-1".to_string(),
            name: "Mineral water 1.5l".to_string(),
            unit: "piece".to_string(),
            price: Decimal::from(120),
            tax_rate: TaxRate::new(20).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let snapshot = item.snapshot();
        assert_eq!(snapshot.item_id, "item-1");
        assert_eq!(snapshot.name, "Mineral water 1.5l");
        assert_eq!(snapshot.unit, "piece");
        assert_eq!(snapshot.tax_rate.percent(), 20);
    }
}
