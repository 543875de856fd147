//! # faktura-db: Database Layer for Faktura
//!
//! This crate provides database access for the invoicing engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Faktura Data Flow                                │
//! │                                                                         │
//! │  InvoiceService (faktura-engine)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     faktura-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ItemRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SupplierRepo  │    │ 001_init.sql │  │   │
//! │  │   │ Transactions  │    │ invoice ops   │    │ ...          │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   invoices / line_items / items / suppliers                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Item/supplier repositories and composable invoice
//!   row operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use faktura_db::{Database, DbConfig};
//!
//! let config = DbConfig::new("path/to/faktura.db");
//! let db = Database::new(config).await?;
//!
//! // Self-contained repositories
//! let items = db.items().list().await?;
//!
//! // Composable invoice operations
//! let mut tx = db.begin().await?;
//! let invoice = faktura_db::repository::invoice::fetch_invoice(&mut tx, "id").await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::generate_id;
pub use repository::item::ItemRepository;
pub use repository::supplier::SupplierRepository;
