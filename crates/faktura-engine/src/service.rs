//! # Invoice Service
//!
//! The only mutation path for invoices.
//!
//! ## Mutation Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Every Mutation, Same Shape                           │
//! │                                                                         │
//! │  1. Acquire the invoice's lock (bounded wait)                           │
//! │  2. Begin one transaction                                               │
//! │  3. Fetch invoice, check status                                         │
//! │  4. Apply the change (insert/delete line, flip status, ...)             │
//! │  5. Recompute aggregates from the line set, persist conditionally       │
//! │  6. Commit - or drop the transaction, rolling everything back           │
//! │                                                                         │
//! │  Result: aggregates NEVER drift from the line set across a commit,      │
//! │  and a failed call leaves the invoice exactly as it was.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Defense in Depth
//! The lock serializes writers per invoice; the `WHERE status = 'draft'`
//! conditional writes and the `UNIQUE(invoice_id, item_id)` index catch
//! anything that slips past it (a second process on the same database, for
//! example).

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use faktura_core::validation::validate_document_number;
use faktura_core::{
    aggregate_totals, price_line, Invoice, InvoiceStatus, InvoiceTotals, InvoiceWithLines,
    LineInput, LineItem, Money, MAX_INVOICE_LINES,
};
use faktura_db::repository::{invoice, item, supplier};
use faktura_db::{generate_id, Database, DbError};

use crate::error::{EngineError, EngineResult};
use crate::lock::{InvoiceLocks, DEFAULT_LOCK_TIMEOUT};

// =============================================================================
// Inputs
// =============================================================================

/// Caller-supplied fields for a new invoice.
///
/// The document number is assigned by the caller; the engine only requires
/// it to be non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub supplier_id: String,
    pub document_number: String,
    pub date: NaiveDate,
}

// =============================================================================
// Service
// =============================================================================

/// Invoice lifecycle and line mutation service.
///
/// Cheap to clone; clones share the database pool and the lock registry.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("faktura.db")).await?;
/// let service = InvoiceService::new(db);
///
/// let invoice = service.create_invoice(new_invoice).await?;
/// let line = service.add_line(&invoice.id, &item_id, input).await?;
/// let finalized = service.finalize(&invoice.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceService {
    db: Database,
    locks: Arc<InvoiceLocks>,
}

impl InvoiceService {
    /// Creates a service with the default lock timeout.
    pub fn new(db: Database) -> Self {
        Self::with_lock_timeout(db, DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates a service with a custom lock acquisition timeout.
    pub fn with_lock_timeout(db: Database, timeout: Duration) -> Self {
        InvoiceService {
            db,
            locks: Arc::new(InvoiceLocks::new(timeout)),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Creates a new draft invoice with no lines and zero aggregates.
    pub async fn create_invoice(&self, new: NewInvoice) -> EngineResult<Invoice> {
        validate_document_number(&new.document_number)?;

        let now = Utc::now();
        let draft = Invoice {
            id: generate_id(),
            supplier_id: new.supplier_id.clone(),
            document_number: new.document_number,
            date: new.date,
            status: InvoiceStatus::Draft,
            subtotal: Money::ZERO,
            tax_amount: Money::ZERO,
            total: Money::ZERO,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;

        if !supplier::supplier_exists(&mut tx, &new.supplier_id).await? {
            return Err(EngineError::SupplierNotFound {
                id: new.supplier_id,
            });
        }

        invoice::insert_invoice(&mut tx, &draft).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            invoice_id = %draft.id,
            document_number = %draft.document_number,
            "Created draft invoice"
        );
        Ok(draft)
    }

    /// Finalizes a draft invoice, freezing its line set and aggregates.
    ///
    /// ## Errors
    /// * [`EngineError::EmptyInvoice`] - Draft has no lines
    /// * [`EngineError::InvoiceNotDraft`] - Already finalized (not a no-op)
    pub async fn finalize(&self, invoice_id: &str) -> EngineResult<Invoice> {
        let _guard = self.lock(invoice_id).await?;

        let mut tx = self.db.begin().await?;

        let current = invoice::fetch_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| EngineError::InvoiceNotFound {
                id: invoice_id.to_string(),
            })?;
        current.status.ensure_mutable()?;

        if invoice::count_lines(&mut tx, invoice_id).await? == 0 {
            return Err(EngineError::EmptyInvoice);
        }

        // Conditional write backstops the status check against a second
        // writer on the same database file
        if invoice::finalize(&mut tx, invoice_id).await? == 0 {
            return Err(EngineError::InvoiceNotDraft {
                status: InvoiceStatus::Finalized.as_str(),
            });
        }

        let finalized = invoice::fetch_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| EngineError::InvoiceNotFound {
                id: invoice_id.to_string(),
            })?;

        tx.commit().await.map_err(DbError::from)?;

        info!(invoice_id = %invoice_id, total = %finalized.total, "Finalized invoice");
        Ok(finalized)
    }

    /// Deletes an invoice and all of its lines, in any status.
    pub async fn delete_invoice(&self, invoice_id: &str) -> EngineResult<()> {
        let _guard = self.lock(invoice_id).await?;

        let mut tx = self.db.begin().await?;

        if invoice::delete_invoice(&mut tx, invoice_id).await? == 0 {
            return Err(EngineError::InvoiceNotFound {
                id: invoice_id.to_string(),
            });
        }

        tx.commit().await.map_err(DbError::from)?;
        self.locks.remove(invoice_id);

        info!(invoice_id = %invoice_id, "Deleted invoice with lines");
        Ok(())
    }

    // =========================================================================
    // Line Mutations
    // =========================================================================

    /// Adds a priced line for a catalog item to a draft invoice.
    ///
    /// Snapshot, pricing, line insert and aggregate update land in one
    /// transaction; any failure leaves the invoice untouched.
    pub async fn add_line(
        &self,
        invoice_id: &str,
        item_id: &str,
        input: LineInput,
    ) -> EngineResult<LineItem> {
        let _guard = self.lock(invoice_id).await?;

        let mut tx = self.db.begin().await?;

        let current = invoice::fetch_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| EngineError::InvoiceNotFound {
                id: invoice_id.to_string(),
            })?;
        current.status.ensure_mutable()?;

        let item = item::fetch_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| EngineError::ItemNotFound {
                id: item_id.to_string(),
            })?;

        if invoice::line_exists(&mut tx, invoice_id, item_id).await? {
            return Err(EngineError::AlreadyAdded {
                invoice_id: invoice_id.to_string(),
                item_id: item_id.to_string(),
            });
        }

        if invoice::count_lines(&mut tx, invoice_id).await? as usize >= MAX_INVOICE_LINES {
            return Err(EngineError::TooManyLines {
                max: MAX_INVOICE_LINES,
            });
        }

        let snapshot = item.snapshot();
        let figures = price_line(&snapshot, &input)?;

        let line = LineItem {
            id: generate_id(),
            invoice_id: invoice_id.to_string(),
            item_id: item_id.to_string(),
            name: snapshot.name,
            unit: snapshot.unit,
            tax_rate: snapshot.tax_rate,
            mode: input.mode,
            quantity: input.quantity,
            base_price: input.base_price,
            discount_percent: input.discount_percent,
            dependent_costs: input.dependent_costs,
            price_difference_percent: input.price_difference_percent,
            line_subtotal: figures.line_subtotal,
            tax_amount: figures.tax_amount,
            line_total: figures.line_total,
            unit_price: figures.unit_price,
            created_at: Utc::now(),
        };

        // The UNIQUE index catches a duplicate the pre-check missed
        match invoice::insert_line(&mut tx, &line).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(EngineError::AlreadyAdded {
                    invoice_id: invoice_id.to_string(),
                    item_id: item_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let totals = self.persist_aggregates(&mut tx, invoice_id).await?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            invoice_id = %invoice_id,
            item_id = %item_id,
            line_total = %line.line_total,
            invoice_total = %totals.total,
            "Added line item"
        );
        Ok(line)
    }

    /// Removes the line for one item from a draft invoice.
    ///
    /// Returns the invoice with its recomputed aggregates.
    pub async fn remove_line(&self, invoice_id: &str, item_id: &str) -> EngineResult<Invoice> {
        let _guard = self.lock(invoice_id).await?;

        let mut tx = self.db.begin().await?;

        let current = invoice::fetch_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| EngineError::InvoiceNotFound {
                id: invoice_id.to_string(),
            })?;
        current.status.ensure_mutable()?;

        if invoice::delete_line(&mut tx, invoice_id, item_id).await? == 0 {
            return Err(EngineError::LineNotFound {
                invoice_id: invoice_id.to_string(),
                item_id: item_id.to_string(),
            });
        }

        let totals = self.persist_aggregates(&mut tx, invoice_id).await?;

        let updated = invoice::fetch_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| EngineError::InvoiceNotFound {
                id: invoice_id.to_string(),
            })?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            invoice_id = %invoice_id,
            item_id = %item_id,
            invoice_total = %totals.total,
            "Removed line item"
        );
        Ok(updated)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads an invoice with its lines as one atomic snapshot.
    ///
    /// Lines come back in insertion order, and the aggregates always match
    /// the returned line set.
    pub async fn get_invoice(&self, invoice_id: &str) -> EngineResult<InvoiceWithLines> {
        let mut tx = self.db.begin().await?;

        let invoice = invoice::fetch_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| EngineError::InvoiceNotFound {
                id: invoice_id.to_string(),
            })?;
        let lines = invoice::fetch_lines(&mut tx, invoice_id).await?;

        tx.commit().await.map_err(DbError::from)?;

        Ok(InvoiceWithLines { invoice, lines })
    }

    /// Lists all invoices, newest first, without their lines.
    pub async fn list_invoices(&self) -> EngineResult<Vec<Invoice>> {
        let mut tx = self.db.begin().await?;
        let invoices = invoice::list_invoices(&mut tx).await?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(invoices)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Acquires the invoice's mutation lock, bounded by the timeout.
    async fn lock(&self, invoice_id: &str) -> EngineResult<OwnedMutexGuard<()>> {
        self.locks.acquire(invoice_id).await.ok_or_else(|| {
            EngineError::ConcurrencyConflict {
                invoice_id: invoice_id.to_string(),
            }
        })
    }

    /// Recomputes the aggregates from the transaction's view of the line
    /// set and persists them.
    ///
    /// Only the add/remove paths call this; reads never recompute.
    async fn persist_aggregates(
        &self,
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> EngineResult<InvoiceTotals> {
        let lines = invoice::fetch_lines(&mut *conn, invoice_id).await?;
        let totals = aggregate_totals(&lines);

        if invoice::update_totals(conn, invoice_id, &totals).await? == 0 {
            // Unreachable while the lock and status check hold; kept for a
            // second writer on the same database file
            return Err(EngineError::InvoiceNotDraft {
                status: InvoiceStatus::Finalized.as_str(),
            });
        }

        Ok(totals)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use faktura_db::DbConfig;
    use faktura_core::{Item, Supplier, TaxRate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn service() -> InvoiceService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        InvoiceService::new(db)
    }

    async fn seed_supplier(svc: &InvoiceService) -> Supplier {
        let supplier = Supplier {
            id: generate_id(),
            name: "Acme Beverages".to_string(),
            code: "ACME".to_string(),
            address: "1 Warehouse Way".to_string(),
            created_at: Utc::now(),
        };
        svc.db.suppliers().insert(&supplier).await.unwrap();
        supplier
    }

    async fn seed_item(svc: &InvoiceService, name: &str, price: Decimal, rate: u32) -> Item {
        let now = Utc::now();
        let item = Item {
            id: generate_id(),
            name: name.to_string(),
            unit: "piece".to_string(),
            price,
            tax_rate: TaxRate::new(rate).unwrap(),
            created_at: now,
            updated_at: now,
        };
        svc.db.items().insert(&item).await.unwrap();
        item
    }

    async fn draft_invoice(svc: &InvoiceService) -> Invoice {
        let supplier = seed_supplier(svc).await;
        svc.create_invoice(NewInvoice {
            supplier_id: supplier.id,
            document_number: "INV-2024-001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_invoice_starts_as_empty_draft() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;

        assert_eq!(inv.status, InvoiceStatus::Draft);
        assert_eq!(inv.subtotal, Money::ZERO);
        assert_eq!(inv.tax_amount, Money::ZERO);
        assert_eq!(inv.total, Money::ZERO);

        let read = svc.get_invoice(&inv.id).await.unwrap();
        assert!(read.lines.is_empty());
    }

    #[tokio::test]
    async fn create_invoice_requires_known_supplier() {
        let svc = service().await;
        let err = svc
            .create_invoice(NewInvoice {
                supplier_id: "no-such-supplier".to_string(),
                document_number: "INV-1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::SupplierNotFound { .. }));
    }

    #[tokio::test]
    async fn create_invoice_rejects_empty_document_number() {
        let svc = service().await;
        let supplier = seed_supplier(&svc).await;

        let err = svc
            .create_invoice(NewInvoice {
                supplier_id: supplier.id,
                document_number: "  ".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn exclusive_line_updates_aggregates() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;
        let item = seed_item(&svc, "Widget", dec!(100.00), 20).await;

        // 100 x 3, 10% discount, 20% tax
        let mut input = LineInput::exclusive(dec!(3), dec!(100.00));
        input.discount_percent = dec!(10);

        let line = svc.add_line(&inv.id, &item.id, input).await.unwrap();
        assert_eq!(line.line_subtotal, Money::new(dec!(270.00)));
        assert_eq!(line.tax_amount, Money::new(dec!(54.00)));
        assert_eq!(line.line_total, Money::new(dec!(324.00)));

        let read = svc.get_invoice(&inv.id).await.unwrap();
        assert_eq!(read.invoice.subtotal, Money::new(dec!(270.00)));
        assert_eq!(read.invoice.tax_amount, Money::new(dec!(54.00)));
        assert_eq!(read.invoice.total, Money::new(dec!(324.00)));
        assert_eq!(read.lines.len(), 1);
    }

    #[tokio::test]
    async fn inclusive_line_extracts_tax() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;
        let item = seed_item(&svc, "Soda 1.5l", dec!(120.00), 20).await;

        // 120 x 2 gross at 20%: total 240.00, tax 40.00, net 200.00
        let line = svc
            .add_line(&inv.id, &item.id, LineInput::inclusive(dec!(2), dec!(120.00)))
            .await
            .unwrap();

        assert_eq!(line.line_total, Money::new(dec!(240.00)));
        assert_eq!(line.tax_amount, Money::new(dec!(40.00)));
        assert_eq!(line.line_subtotal, Money::new(dec!(200.00)));
        assert_eq!(line.unit_price, None);

        let read = svc.get_invoice(&inv.id).await.unwrap();
        assert_eq!(read.invoice.total, Money::new(dec!(240.00)));
    }

    #[tokio::test]
    async fn duplicate_add_fails_and_leaves_state_unchanged() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;
        let item = seed_item(&svc, "Widget", dec!(50.00), 10).await;

        svc.add_line(&inv.id, &item.id, LineInput::exclusive(dec!(1), dec!(50.00)))
            .await
            .unwrap();
        let before = svc.get_invoice(&inv.id).await.unwrap();

        let err = svc
            .add_line(&inv.id, &item.id, LineInput::exclusive(dec!(2), dec!(50.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyAdded { .. }));

        let after = svc.get_invoice(&inv.id).await.unwrap();
        assert_eq!(after.lines.len(), 1);
        assert_eq!(after.invoice.total, before.invoice.total);
    }

    #[tokio::test]
    async fn add_line_rejects_unknown_item() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;

        let err = svc
            .add_line(&inv.id, "no-such-item", LineInput::exclusive(dec!(1), dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ItemNotFound { .. }));
    }

    #[tokio::test]
    async fn add_line_rejects_invalid_quantity() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;
        let item = seed_item(&svc, "Widget", dec!(10.00), 0).await;

        let err = svc
            .add_line(&inv.id, &item.id, LineInput::exclusive(dec!(0), dec!(10.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        // Nothing was committed
        let read = svc.get_invoice(&inv.id).await.unwrap();
        assert!(read.lines.is_empty());
    }

    #[tokio::test]
    async fn remove_line_restores_aggregates() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;
        let a = seed_item(&svc, "Alpha", dec!(10.00), 20).await;
        let b = seed_item(&svc, "Beta", dec!(20.00), 20).await;

        svc.add_line(&inv.id, &a.id, LineInput::exclusive(dec!(1), dec!(10.00)))
            .await
            .unwrap();
        svc.add_line(&inv.id, &b.id, LineInput::exclusive(dec!(1), dec!(20.00)))
            .await
            .unwrap();

        let updated = svc.remove_line(&inv.id, &b.id).await.unwrap();
        assert_eq!(updated.subtotal, Money::new(dec!(10.00)));
        assert_eq!(updated.tax_amount, Money::new(dec!(2.00)));
        assert_eq!(updated.total, Money::new(dec!(12.00)));

        // Removing the last line zeroes everything
        let updated = svc.remove_line(&inv.id, &a.id).await.unwrap();
        assert_eq!(updated.subtotal, Money::ZERO);
        assert_eq!(updated.total, Money::ZERO);
    }

    #[tokio::test]
    async fn line_count_cap_is_enforced() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;

        for n in 0..MAX_INVOICE_LINES {
            let item = seed_item(&svc, &format!("Item {n}"), dec!(1.00), 0).await;
            svc.add_line(&inv.id, &item.id, LineInput::exclusive(dec!(1), dec!(1.00)))
                .await
                .unwrap();
        }

        let overflow = seed_item(&svc, "Overflow", dec!(1.00), 0).await;
        let err = svc
            .add_line(
                &inv.id,
                &overflow.id,
                LineInput::exclusive(dec!(1), dec!(1.00)),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::TooManyLines {
                max: MAX_INVOICE_LINES
            }
        ));

        // The rejected add changed nothing
        let read = svc.get_invoice(&inv.id).await.unwrap();
        assert_eq!(read.lines.len(), MAX_INVOICE_LINES);
        assert_eq!(
            read.invoice.subtotal,
            Money::new(Decimal::from(MAX_INVOICE_LINES as u32))
        );
    }

    #[tokio::test]
    async fn remove_missing_line_fails() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;

        let err = svc.remove_line(&inv.id, "no-such-item").await.unwrap_err();
        assert!(matches!(err, EngineError::LineNotFound { .. }));
    }

    #[tokio::test]
    async fn finalize_requires_at_least_one_line() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;

        let err = svc.finalize(&inv.id).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyInvoice));
    }

    #[tokio::test]
    async fn finalize_freezes_the_invoice() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;
        let item = seed_item(&svc, "Widget", dec!(10.00), 10).await;
        let other = seed_item(&svc, "Gadget", dec!(5.00), 10).await;

        svc.add_line(&inv.id, &item.id, LineInput::exclusive(dec!(1), dec!(10.00)))
            .await
            .unwrap();

        let finalized = svc.finalize(&inv.id).await.unwrap();
        assert_eq!(finalized.status, InvoiceStatus::Finalized);
        assert_eq!(finalized.total, Money::new(dec!(11.00)));

        // All mutations now fail, and finalize is not idempotent
        let err = svc
            .add_line(&inv.id, &other.id, LineInput::exclusive(dec!(1), dec!(5.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvoiceNotDraft { .. }));

        let err = svc.remove_line(&inv.id, &item.id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvoiceNotDraft { .. }));

        let err = svc.finalize(&inv.id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvoiceNotDraft { .. }));

        // Aggregates survived untouched
        let read = svc.get_invoice(&inv.id).await.unwrap();
        assert_eq!(read.invoice.total, Money::new(dec!(11.00)));
        assert_eq!(read.lines.len(), 1);
    }

    #[tokio::test]
    async fn delete_invoice_cascades_to_lines() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;
        let a = seed_item(&svc, "Alpha", dec!(10.00), 0).await;
        let b = seed_item(&svc, "Beta", dec!(20.00), 0).await;

        svc.add_line(&inv.id, &a.id, LineInput::exclusive(dec!(1), dec!(10.00)))
            .await
            .unwrap();
        svc.add_line(&inv.id, &b.id, LineInput::exclusive(dec!(1), dec!(20.00)))
            .await
            .unwrap();

        svc.delete_invoice(&inv.id).await.unwrap();

        let err = svc.get_invoice(&inv.id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvoiceNotFound { .. }));

        // No orphan lines left behind
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM line_items")
            .fetch_one(svc.db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn delete_missing_invoice_fails() {
        let svc = service().await;
        let err = svc.delete_invoice("no-such-invoice").await.unwrap_err();
        assert!(matches!(err, EngineError::InvoiceNotFound { .. }));
    }

    #[tokio::test]
    async fn list_invoices_returns_all() {
        let svc = service().await;
        let supplier = seed_supplier(&svc).await;

        for n in 1..=3 {
            svc.create_invoice(NewInvoice {
                supplier_id: supplier.id.clone(),
                document_number: format!("INV-{n}"),
                date: NaiveDate::from_ymd_opt(2024, 1, n).unwrap(),
            })
            .await
            .unwrap();
        }

        let invoices = svc.list_invoices().await.unwrap();
        assert_eq!(invoices.len(), 3);
    }

    #[tokio::test]
    async fn held_lock_surfaces_concurrency_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let svc = InvoiceService::with_lock_timeout(db, Duration::from_millis(50));
        let inv = draft_invoice(&svc).await;
        let item = seed_item(&svc, "Widget", dec!(10.00), 0).await;

        let _held = svc.locks.acquire(&inv.id).await.unwrap();

        let err = svc
            .add_line(&inv.id, &item.id, LineInput::exclusive(dec!(1), dec!(10.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ConcurrencyConflict { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_adds_of_distinct_items_all_land() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;

        let mut item_ids = Vec::new();
        for n in 0..6 {
            let item = seed_item(&svc, &format!("Item {n}"), dec!(10.00), 20).await;
            item_ids.push(item.id);
        }

        let mut handles = Vec::new();
        for item_id in item_ids {
            let svc = svc.clone();
            let invoice_id = inv.id.clone();
            handles.push(tokio::spawn(async move {
                svc.add_line(
                    &invoice_id,
                    &item_id,
                    LineInput::exclusive(dec!(1), dec!(10.00)),
                )
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 6 x (10.00 + 2.00) - same as adding them one by one
        let read = svc.get_invoice(&inv.id).await.unwrap();
        assert_eq!(read.lines.len(), 6);
        assert_eq!(read.invoice.subtotal, Money::new(dec!(60.00)));
        assert_eq!(read.invoice.tax_amount, Money::new(dec!(12.00)));
        assert_eq!(read.invoice.total, Money::new(dec!(72.00)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_adds_of_same_item_land_exactly_once() {
        let svc = service().await;
        let inv = draft_invoice(&svc).await;
        let item = seed_item(&svc, "Widget", dec!(10.00), 20).await;

        let mut handles = Vec::new();
        for _ in 0..6 {
            let svc = svc.clone();
            let invoice_id = inv.id.clone();
            let item_id = item.id.clone();
            handles.push(tokio::spawn(async move {
                svc.add_line(
                    &invoice_id,
                    &item_id,
                    LineInput::exclusive(dec!(1), dec!(10.00)),
                )
                .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(EngineError::AlreadyAdded { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);

        let read = svc.get_invoice(&inv.id).await.unwrap();
        assert_eq!(read.lines.len(), 1);
        assert_eq!(read.invoice.total, Money::new(dec!(12.00)));
    }
}
