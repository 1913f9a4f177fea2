//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Name search with paging, autocomplete suggestions
//! - CRUD operations
//! - Inventory metrics
//!
//! ## Stock Is Not Edited Here
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  update(product)        name, description, prices, location            │
//! │  movements().record()   stock (always with an audit row)               │
//! │  insert(new)            opening stock as ENTRADA "Stock inicial"       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use celumax_core::validation::{
    validate_new_product, validate_price_cents, validate_product_name, validate_search_query,
};
use celumax_core::{InventoryMetrics, MovementKind, NewProduct, Product, SUGGESTION_LIMIT};

use super::movement::apply_in_tx;
use super::{contains_pattern, new_id};
use crate::changes::{ChangeFeed, DataChange};
use crate::error::{DbError, DbResult};

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, description, purchase_price_cents, \
     sale_price_cents, stock, location, created_at";

/// Reason recorded for the opening stock of a new product.
pub const INITIAL_STOCK_REASON: &str = "Stock inicial";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ProductRepository { pool, changes }
    }

    /// Searches products by name substring, ordered by name.
    ///
    /// An empty query lists everything, page by page.
    pub async fn search(&self, query: &str, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit, offset, "Searching products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE name LIKE ?1 ESCAPE '\\' \
             ORDER BY name COLLATE NOCASE \
             LIMIT ?2 OFFSET ?3"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(contains_pattern(&query))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// All products, ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name COLLATE NOCASE");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Autocomplete for the invoice and purchase forms.
    ///
    /// Returns nothing for a blank query.
    pub async fn suggestions(&self, query: &str) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.search(&query, SUGGESTION_LIMIT, 0).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Exact name match, ignoring ASCII case and surrounding spaces.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_by_name_in_tx(&mut conn, name).await
    }

    /// Inserts a new product.
    ///
    /// Opening stock is written through [`apply_in_tx`] so it shows up in
    /// the movement history.
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let product = Product {
            id: new_id(),
            name: new.name.trim().to_string(),
            description: new.description.trim().to_string(),
            purchase_price_cents: new.purchase_price_cents,
            sale_price_cents: new.sale_price_cents,
            stock: 0,
            location: new.location.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        let mut tx = self.pool.begin().await?;
        insert_in_tx(&mut tx, &product).await?;
        if new.stock > 0 {
            apply_in_tx(
                &mut tx,
                &product.id,
                MovementKind::Entrada,
                new.stock,
                INITIAL_STOCK_REASON,
            )
            .await?;
        }
        tx.commit().await?;

        info!(id = %product.id, stock = new.stock, "Product created");
        self.changes
            .publish(&[DataChange::Products, DataChange::Movements]);

        Ok(Product {
            stock: new.stock,
            ..product
        })
    }

    /// Updates descriptive fields and prices. Stock is left untouched.
    ///
    /// Existing invoice lines keep the price they were sold at.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product_name(&product.name)?;
        validate_price_cents(product.purchase_price_cents)?;
        validate_price_cents(product.sale_price_cents)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                purchase_price_cents = ?4,
                sale_price_cents = ?5,
                location = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(product.name.trim())
        .bind(product.description.trim())
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.location.trim())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        self.changes.publish(&[DataChange::Products]);
        Ok(())
    }

    /// Deletes a product and its movement history.
    ///
    /// Fails with `ForeignKeyViolation` while an invoice still lists it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deleted");
        self.changes.publish(&[
            DataChange::Products,
            DataChange::Movements,
            DataChange::PurchaseLines,
        ]);
        Ok(())
    }

    /// Total units on hand and their value at purchase price.
    pub async fn metrics(&self) -> DbResult<InventoryMetrics> {
        let (total_stock, inventory_value_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(stock), 0),
                COALESCE(SUM(stock * purchase_price_cents), 0)
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(InventoryMetrics {
            total_stock,
            inventory_value_cents,
        })
    }

    /// Products with nothing left on the shelf, ordered by name.
    pub async fn out_of_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock = 0 ORDER BY name COLLATE NOCASE"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Counts products (for diagnostics and paging).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

pub(crate) async fn fetch_in_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

pub(crate) async fn find_by_name_in_tx(
    conn: &mut SqliteConnection,
    name: &str,
) -> DbResult<Option<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE name = ?1 COLLATE NOCASE \
         ORDER BY created_at LIMIT 1"
    );
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(name.trim())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

pub(crate) async fn insert_in_tx(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, description, purchase_price_cents,
            sale_price_cents, stock, location, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.purchase_price_cents)
    .bind(product.sale_price_cents)
    .bind(product.stock)
    .bind(&product.location)
    .bind(product.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
