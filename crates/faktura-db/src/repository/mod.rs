//! # Repository Layer
//!
//! Data access for each entity family.
//!
//! ## Two Shapes of Repository
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ItemRepository / SupplierRepository                                    │
//! │    Hold the pool, each call is self-contained                           │
//! │                                                                         │
//! │  repository::invoice (free functions)                                   │
//! │    Every operation takes &mut SqliteConnection, so the engine can       │
//! │    compose line mutation + aggregate update into ONE transaction        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decimal Columns
//! Money and quantity columns are TEXT holding canonical decimal strings.
//! They are written with `Decimal::to_string()` and parsed back on read;
//! a row that fails to parse surfaces as [`DbError::Decode`].

pub mod invoice;
pub mod item;
pub mod supplier;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use faktura_core::{Money, TaxRate};

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parses a TEXT decimal column.
pub(crate) fn parse_decimal(column: &'static str, raw: &str) -> DbResult<Decimal> {
    raw.parse::<Decimal>()
        .map_err(|e| DbError::decode(column, e.to_string()))
}

/// Parses a TEXT decimal column into a rounded monetary amount.
pub(crate) fn parse_money(column: &'static str, raw: &str) -> DbResult<Money> {
    Ok(Money::new(parse_decimal(column, raw)?))
}

/// Validates a stored tax rate against the permitted set.
///
/// A rate outside the set means the row was written by something other
/// than this crate, so it is a decode failure rather than a domain error.
pub(crate) fn stored_tax_rate(percent: u32) -> DbResult<TaxRate> {
    TaxRate::new(percent).map_err(|e| DbError::decode("tax_rate_percent", e.to_string()))
}
