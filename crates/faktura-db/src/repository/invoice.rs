//! # Invoice Row Operations
//!
//! Invoice and line item database operations.
//!
//! ## Why Free Functions on `&mut SqliteConnection`
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               One Mutation = One Transaction                            │
//! │                                                                         │
//! │  engine.add_line(...)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  let mut tx = db.begin().await?;                                        │
//! │       │                                                                 │
//! │       ├── invoice::fetch_invoice(&mut tx, id)                           │
//! │       ├── invoice::insert_line(&mut tx, &line)                          │
//! │       ├── invoice::fetch_lines(&mut tx, id)                             │
//! │       └── invoice::update_totals(&mut tx, id, &totals)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit().await?   ← line + aggregates land together, or not at all  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation takes an explicit connection so the engine decides the
//! transaction boundary. A `Transaction` and a `PoolConnection` both deref
//! to `&mut SqliteConnection`, so reads outside a transaction use the same
//! functions.
//!
//! ## Conditional Writes
//! `update_totals` and `finalize` carry `WHERE status = 'draft'` so a
//! finalized invoice can never be rewritten, even by a racing writer that
//! read the row while it was still a draft.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{parse_decimal, parse_money, stored_tax_rate};
use faktura_core::{Invoice, InvoiceStatus, InvoiceTotals, LineItem, PricingMode};

// =============================================================================
// Invoice Rows
// =============================================================================

/// Inserts a new invoice row.
pub async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, document_number = %invoice.document_number, "Inserting invoice");

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, supplier_id, document_number, invoice_date, status,
            subtotal, tax_amount, total, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.supplier_id)
    .bind(&invoice.document_number)
    .bind(invoice.date)
    .bind(invoice.status.as_str())
    .bind(invoice.subtotal.amount().to_string())
    .bind(invoice.tax_amount.amount().to_string())
    .bind(invoice.total.amount().to_string())
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches an invoice by ID.
pub async fn fetch_invoice(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let row = sqlx::query(
        r#"
        SELECT id, supplier_id, document_number, invoice_date, status,
               subtotal, tax_amount, total, created_at, updated_at
        FROM invoices
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.map(invoice_from_row).transpose()
}

/// Lists all invoices, newest first.
pub async fn list_invoices(conn: &mut SqliteConnection) -> DbResult<Vec<Invoice>> {
    let rows = sqlx::query(
        r#"
        SELECT id, supplier_id, document_number, invoice_date, status,
               subtotal, tax_amount, total, created_at, updated_at
        FROM invoices
        ORDER BY created_at DESC, id
        "#,
    )
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(invoice_from_row).collect()
}

/// Writes recomputed aggregates onto a draft invoice.
///
/// ## Returns
/// Number of rows updated: `0` means the invoice is missing or no longer
/// a draft, and the caller must roll back.
pub async fn update_totals(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    totals: &InvoiceTotals,
) -> DbResult<u64> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            subtotal = ?2,
            tax_amount = ?3,
            total = ?4,
            updated_at = ?5
        WHERE id = ?1 AND status = 'draft'
        "#,
    )
    .bind(invoice_id)
    .bind(totals.subtotal.amount().to_string())
    .bind(totals.tax_amount.amount().to_string())
    .bind(totals.total.amount().to_string())
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Marks a draft invoice as finalized.
///
/// ## Returns
/// Number of rows updated: `0` means the invoice is missing or was already
/// finalized.
pub async fn finalize(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<u64> {
    debug!(id = %invoice_id, "Finalizing invoice");

    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            status = 'finalized',
            updated_at = ?2
        WHERE id = ?1 AND status = 'draft'
        "#,
    )
    .bind(invoice_id)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Deletes an invoice and all of its lines.
///
/// Both deletes run on the caller's connection, so inside a transaction
/// the invoice and its lines disappear together.
///
/// ## Returns
/// Number of invoice rows deleted (`0` when the invoice did not exist).
pub async fn delete_invoice(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<u64> {
    debug!(id = %invoice_id, "Deleting invoice with lines");

    sqlx::query("DELETE FROM line_items WHERE invoice_id = ?1")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
        .bind(invoice_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Line Item Rows
// =============================================================================

/// Inserts a line item row.
///
/// ## Returns
/// * `Err(DbError::UniqueViolation)` - The invoice already has a line for
///   this item (the UNIQUE index backstops the engine's check)
pub async fn insert_line(conn: &mut SqliteConnection, line: &LineItem) -> DbResult<()> {
    debug!(invoice_id = %line.invoice_id, item_id = %line.item_id, "Inserting line item");

    sqlx::query(
        r#"
        INSERT INTO line_items (
            id, invoice_id, item_id,
            name_snapshot, unit_snapshot, tax_rate_percent,
            pricing_mode, quantity, base_price,
            discount_percent, dependent_costs, price_difference_percent,
            line_subtotal, tax_amount, line_total, unit_price,
            created_at
        ) VALUES (
            ?1, ?2, ?3,
            ?4, ?5, ?6,
            ?7, ?8, ?9,
            ?10, ?11, ?12,
            ?13, ?14, ?15, ?16,
            ?17
        )
        "#,
    )
    .bind(&line.id)
    .bind(&line.invoice_id)
    .bind(&line.item_id)
    .bind(&line.name)
    .bind(&line.unit)
    .bind(line.tax_rate.percent())
    .bind(line.mode.as_str())
    .bind(line.quantity.to_string())
    .bind(line.base_price.to_string())
    .bind(line.discount_percent.to_string())
    .bind(line.dependent_costs.to_string())
    .bind(line.price_difference_percent.to_string())
    .bind(line.line_subtotal.amount().to_string())
    .bind(line.tax_amount.amount().to_string())
    .bind(line.line_total.amount().to_string())
    .bind(line.unit_price.map(|p| p.amount().to_string()))
    .bind(line.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches all lines of an invoice, in insertion order.
pub async fn fetch_lines(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<LineItem>> {
    let rows = sqlx::query(
        r#"
        SELECT id, invoice_id, item_id,
               name_snapshot, unit_snapshot, tax_rate_percent,
               pricing_mode, quantity, base_price,
               discount_percent, dependent_costs, price_difference_percent,
               line_subtotal, tax_amount, line_total, unit_price,
               created_at
        FROM line_items
        WHERE invoice_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(invoice_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(line_from_row).collect()
}

/// Checks whether an invoice already carries a line for an item.
pub async fn line_exists(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    item_id: &str,
) -> DbResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM line_items WHERE invoice_id = ?1 AND item_id = ?2")
            .bind(invoice_id)
            .bind(item_id)
            .fetch_one(conn)
            .await?;

    Ok(count > 0)
}

/// Counts the lines on an invoice.
pub async fn count_lines(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM line_items WHERE invoice_id = ?1")
        .bind(invoice_id)
        .fetch_one(conn)
        .await?;

    Ok(count)
}

/// Deletes the line for one item from an invoice.
///
/// ## Returns
/// Number of rows deleted (`0` when no such line exists).
pub async fn delete_line(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    item_id: &str,
) -> DbResult<u64> {
    debug!(invoice_id = %invoice_id, item_id = %item_id, "Deleting line item");

    let result = sqlx::query("DELETE FROM line_items WHERE invoice_id = ?1 AND item_id = ?2")
        .bind(invoice_id)
        .bind(item_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Maps an invoices row to the domain type.
fn invoice_from_row(row: SqliteRow) -> DbResult<Invoice> {
    let status_raw: String = row.try_get("status")?;
    let status = InvoiceStatus::parse(&status_raw)
        .ok_or_else(|| DbError::decode("status", format!("unknown status '{status_raw}'")))?;

    let subtotal: String = row.try_get("subtotal")?;
    let tax_amount: String = row.try_get("tax_amount")?;
    let total: String = row.try_get("total")?;
    let date: NaiveDate = row.try_get("invoice_date")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Invoice {
        id: row.try_get("id")?,
        supplier_id: row.try_get("supplier_id")?,
        document_number: row.try_get("document_number")?,
        date,
        status,
        subtotal: parse_money("subtotal", &subtotal)?,
        tax_amount: parse_money("tax_amount", &tax_amount)?,
        total: parse_money("total", &total)?,
        created_at,
        updated_at,
    })
}

/// Maps a line_items row to the domain type.
fn line_from_row(row: SqliteRow) -> DbResult<LineItem> {
    let mode_raw: String = row.try_get("pricing_mode")?;
    let mode = PricingMode::parse(&mode_raw)
        .ok_or_else(|| DbError::decode("pricing_mode", format!("unknown mode '{mode_raw}'")))?;

    let tax_rate_percent: u32 = row.try_get("tax_rate_percent")?;
    let quantity: String = row.try_get("quantity")?;
    let base_price: String = row.try_get("base_price")?;
    let discount_percent: String = row.try_get("discount_percent")?;
    let dependent_costs: String = row.try_get("dependent_costs")?;
    let price_difference_percent: String = row.try_get("price_difference_percent")?;
    let line_subtotal: String = row.try_get("line_subtotal")?;
    let tax_amount: String = row.try_get("tax_amount")?;
    let line_total: String = row.try_get("line_total")?;
    let unit_price: Option<String> = row.try_get("unit_price")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(LineItem {
        id: row.try_get("id")?,
        invoice_id: row.try_get("invoice_id")?,
        item_id: row.try_get("item_id")?,
        name: row.try_get("name_snapshot")?,
        unit: row.try_get("unit_snapshot")?,
        tax_rate: stored_tax_rate(tax_rate_percent)?,
        mode,
        quantity: parse_decimal("quantity", &quantity)?,
        base_price: parse_decimal("base_price", &base_price)?,
        discount_percent: parse_decimal("discount_percent", &discount_percent)?,
        dependent_costs: parse_decimal("dependent_costs", &dependent_costs)?,
        price_difference_percent: parse_decimal(
            "price_difference_percent",
            &price_difference_percent,
        )?,
        line_subtotal: parse_money("line_subtotal", &line_subtotal)?,
        tax_amount: parse_money("tax_amount", &tax_amount)?,
        line_total: parse_money("line_total", &line_total)?,
        unit_price: unit_price
            .as_deref()
            .map(|p| parse_money("unit_price", p))
            .transpose()?,
        created_at,
    })
}
