//! # faktura-core: Pure Business Logic for the Faktura Invoicing Engine
//!
//! This crate is the **heart** of the engine. It contains all pricing and
//! lifecycle rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Faktura Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Caller (HTTP/UI collaborator)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    faktura-engine                               │   │
//! │  │    InvoiceService: per-invoice locking, atomic transactions     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ faktura-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Invoice  │  │   Money   │  │ price_line│  │   rules   │  │   │
//! │  │   │  LineItem │  │  rounding │  │ aggregate │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    faktura-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Invoice, LineItem, statuses, modes)
//! - [`money`] - Fixed-point monetary arithmetic and the rounding policy
//! - [`pricing`] - The line pricing calculator and aggregate summation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Decimal Money**: All monetary values are `rust_decimal` decimals, never floats
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use faktura_core::Money` instead of
// `use faktura_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{aggregate_totals, price_line, LineFigures};
pub use types::*;

use rust_decimal::Decimal;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tax rates the catalog may carry, as integer percentages.
///
/// Rates are copied verbatim from the item snapshot onto every line; a value
/// outside this set is rejected when the catalog item is created.
pub const PERMITTED_TAX_RATES: &[u32] = &[0, 10, 20];

/// Maximum number of lines on a single invoice.
///
/// Prevents runaway documents and keeps recomputation bounded.
pub const MAX_INVOICE_LINES: usize = 200;

/// Maximum quantity on a single line.
///
/// Prevents accidental over-ordering (e.g. typing 100000 instead of 10).
pub const MAX_LINE_QUANTITY: Decimal = Decimal::from_parts(999_999, 0, 0, false, 0);
