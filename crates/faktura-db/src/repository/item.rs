//! # Item Repository
//!
//! Database operations for catalog items.
//!
//! The engine reads items only through [`ItemRepository::get`]; the CRUD
//! surface exists for the catalog collaborator that maintains them.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{parse_decimal, stored_tax_rate};
use faktura_core::validation::{validate_name, validate_uuid};
use faktura_core::Item;

/// Repository for catalog item operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.items();
/// let item = repo.get("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Inserts a new item.
    ///
    /// ## Errors
    /// * [`DbError::Validation`] - Blank name or malformed ID
    pub async fn insert(&self, item: &Item) -> DbResult<()> {
        validate_uuid(&item.id)?;
        validate_name(&item.name)?;

        debug!(id = %item.id, name = %item.name, "Inserting item");

        let price = item.price.to_string();
        let tax_rate = item.tax_rate.percent();

        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, unit, price, tax_rate_percent, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.unit)
        .bind(price)
        .bind(tax_rate)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an item by ID.
    ///
    /// ## Returns
    /// * `Ok(Item)` - Item found
    /// * `Err(DbError::NotFound)` - No such item
    pub async fn get(&self, id: &str) -> DbResult<Item> {
        self.get_optional(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))
    }

    /// Gets an item by ID, returning `None` when absent.
    pub async fn get_optional(&self, id: &str) -> DbResult<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        fetch_item(&mut conn, id).await
    }

    /// Lists all items, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, unit, price, tax_rate_percent, created_at, updated_at
            FROM items
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(item_from_row).collect()
    }

    /// Updates an existing item.
    ///
    /// Lines already on invoices keep their snapshots; this only affects
    /// lines added afterwards.
    pub async fn update(&self, item: &Item) -> DbResult<()> {
        validate_name(&item.name)?;

        debug!(id = %item.id, "Updating item");

        let price = item.price.to_string();
        let tax_rate = item.tax_rate.percent();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items SET
                name = ?2,
                unit = ?3,
                price = ?4,
                tax_rate_percent = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.unit)
        .bind(price)
        .bind(tax_rate)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", &item.id));
        }

        Ok(())
    }

    /// Deletes an item.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Item is referenced by a line
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting item");

        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Counts items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Fetches an item on an explicit connection.
///
/// The engine calls this inside its invoice transaction, so the snapshot
/// it takes comes from the same consistent view as the line insert.
pub async fn fetch_item(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Item>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, unit, price, tax_rate_percent, created_at, updated_at
        FROM items
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.map(item_from_row).transpose()
}

/// Maps an items row to the domain type.
fn item_from_row(row: SqliteRow) -> DbResult<Item> {
    let price: String = row.try_get("price")?;
    let tax_rate_percent: u32 = row.try_get("tax_rate_percent")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Item {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        unit: row.try_get("unit")?,
        price: parse_decimal("price", &price)?,
        tax_rate: stored_tax_rate(tax_rate_percent)?,
        created_at,
        updated_at,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
