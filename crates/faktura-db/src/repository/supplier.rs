//! # Supplier Repository
//!
//! Database operations for suppliers. Suppliers are display-only metadata
//! on invoices; nothing here feeds any computation.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use faktura_core::validation::{validate_name, validate_uuid};
use faktura_core::Supplier;

/// Repository for supplier operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Inserts a new supplier.
    ///
    /// ## Errors
    /// * [`DbError::Validation`] - Blank name or malformed ID
    pub async fn insert(&self, supplier: &Supplier) -> DbResult<()> {
        validate_uuid(&supplier.id)?;
        validate_name(&supplier.name)?;

        debug!(id = %supplier.id, name = %supplier.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, code, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.code)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a supplier by ID.
    pub async fn get(&self, id: &str) -> DbResult<Supplier> {
        let row = sqlx::query(
            r#"
            SELECT id, name, code, address, created_at
            FROM suppliers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => supplier_from_row(row),
            None => Err(DbError::not_found("Supplier", id)),
        }
    }

    /// Checks whether a supplier exists.
    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        supplier_exists(&mut conn, id).await
    }

    /// Lists all suppliers, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, code, address, created_at
            FROM suppliers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(supplier_from_row).collect()
    }

    /// Deletes a supplier.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Supplier has invoices
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting supplier");

        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        Ok(())
    }
}

/// Checks supplier existence on an explicit connection.
///
/// Used by the engine inside the invoice-creation transaction.
pub async fn supplier_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers WHERE id = ?1")
        .bind(id)
        .fetch_one(conn)
        .await?;

    Ok(count > 0)
}

/// Maps a suppliers row to the domain type.
fn supplier_from_row(row: SqliteRow) -> DbResult<Supplier> {
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Supplier {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        address: row.try_get("address")?,
        created_at,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::generate_id;

    async fn repo() -> SupplierRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.suppliers()
    }

    fn fixture(name: &str) -> Supplier {
        Supplier {
            id: generate_id(),
            name: name.to_string(),
            code: "ACME".to_string(),
            address: "1 Warehouse Way".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let repo = repo().await;
        let supplier = fixture("Acme Beverages");

        repo.insert(&supplier).await.unwrap();

        let loaded = repo.get(&supplier.id).await.unwrap();
        assert_eq!(loaded.name, "Acme Beverages");
        assert!(repo.exists(&supplier.id).await.unwrap());
    }

    #[tokio::test]
    async fn insert_rejects_blank_name() {
        let repo = repo().await;
        let mut supplier = fixture("Acme Beverages");
        supplier.name = "  ".to_string();

        let err = repo.insert(&supplier).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_rejects_malformed_id() {
        let repo = repo().await;
        let mut supplier = fixture("Acme Beverages");
        supplier.id = "not-a-uuid".to_string();

        let err = repo.insert(&supplier).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
