//! # faktura-engine: Invoice Engine for Faktura
//!
//! The produced interface of the workspace: every invoice mutation goes
//! through [`InvoiceService`], and nothing else writes invoices or lines.
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
//! │  │               ★ faktura-engine (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐       │   │
//! │  │   │   service    │   │     lock     │   │    error     │       │   │
//! │  │   │InvoiceService│   │ InvoiceLocks │   │ EngineError  │       │   │
//! │  │   │ one tx per   │   │ per-invoice  │   │ is_retryable │       │   │
//! │  │   │  mutation    │   │ serialization│   │              │       │   │
//! │  │   └──────────────┘   └──────────────┘   └──────────────┘       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │          faktura-core (pricing) + faktura-db (storage)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Atomicity**: a line mutation and the aggregate update commit together
//!   or not at all
//! - **Consistency**: committed aggregates always equal the sums over the
//!   committed line set
//! - **Isolation**: mutations of one invoice are serialized; different
//!   invoices proceed in parallel
//! - **Lifecycle**: `draft → finalized` is the only transition, and a
//!   finalized invoice is immutable
//!
//! ## Usage
//!
//! ```rust,ignore
//! use faktura_db::{Database, DbConfig};
//! use faktura_engine::{InvoiceService, NewInvoice};
//!
//! let db = Database::new(DbConfig::new("faktura.db")).await?;
//! let service = InvoiceService::new(db);
//!
//! let invoice = service.create_invoice(new_invoice).await?;
//! service.add_line(&invoice.id, &item_id, input).await?;
//! let finalized = service.finalize(&invoice.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lock;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{EngineError, EngineResult};
pub use lock::{InvoiceLocks, DEFAULT_LOCK_TIMEOUT};
pub use service::{InvoiceService, NewInvoice};
