//! # Order Repository
//!
//! Purchase checklist, orders, and receiving goods into stock.
//!
//! ## Goods Receipt
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  receive(line_ids, supplier)                       one transaction     │
//! │                                                                         │
//! │  for each selected checklist line:                                     │
//! │     product = line.product_id   (still exists?)                        │
//! │            ?? product named exactly like the line                      │
//! │            ?? new product (line price as purchase + sale, stock 0)     │
//! │     ENTRADA "Recepción de pedido" × quantity_ordered                   │
//! │     DELETE line                                                        │
//! │                                                                         │
//! │  INSERT order REQUERIMIENTO / STOCK_CONFIRMADO, total Σ qty × price    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use celumax_core::validation::{
    validate_price_cents, validate_product_name, validate_quantity, validate_supplier,
    validate_total_cents,
};
use celumax_core::{
    CoreError, Money, MovementKind, NewOrder, NewPurchaseOrderLine, Order, OrderKind, OrderState,
    Product, PurchaseOrderLine, ValidationError,
};

use super::movement::apply_in_tx;
use super::new_id;
use super::product::{fetch_in_tx, find_by_name_in_tx, insert_in_tx};
use crate::changes::{ChangeFeed, DataChange};
use crate::error::{DbError, DbResult};

const LINE_COLUMNS: &str =
    "id, name, quantity_ordered, unit_price_cents, checked, product_id, created_at";
const ORDER_COLUMNS: &str = "id, kind, supplier, total_cents, state, created_at";

/// Reason recorded on movements created by [`OrderRepository::receive`].
pub const RECEIPT_REASON: &str = "Recepción de pedido";

/// Repository for purchase checklist lines and orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        OrderRepository { pool, changes }
    }

    // =========================================================================
    // Purchase checklist
    // =========================================================================

    pub async fn add_line(&self, new: &NewPurchaseOrderLine) -> DbResult<PurchaseOrderLine> {
        validate_line(&new.name, new.quantity_ordered, new.unit_price_cents)?;

        let line = PurchaseOrderLine {
            id: new_id(),
            name: new.name.trim().to_string(),
            quantity_ordered: new.quantity_ordered,
            unit_price_cents: new.unit_price_cents,
            checked: false,
            product_id: new.product_id.clone(),
            created_at: Utc::now(),
        };

        debug!(id = %line.id, name = %line.name, "Adding purchase line");

        sqlx::query(
            r#"
            INSERT INTO purchase_order_lines (
                id, name, quantity_ordered, unit_price_cents, checked, product_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.name)
        .bind(line.quantity_ordered)
        .bind(line.unit_price_cents)
        .bind(line.checked)
        .bind(&line.product_id)
        .bind(line.created_at)
        .execute(&self.pool)
        .await?;

        self.changes.publish(&[DataChange::PurchaseLines]);
        Ok(line)
    }

    /// Checklist in the order items were added.
    pub async fn list_lines(&self) -> DbResult<Vec<PurchaseOrderLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM purchase_order_lines ORDER BY created_at, rowid"
        );
        let lines = sqlx::query_as::<_, PurchaseOrderLine>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(lines)
    }

    pub async fn get_line(&self, id: &str) -> DbResult<Option<PurchaseOrderLine>> {
        let mut conn = self.pool.acquire().await?;
        fetch_line(&mut conn, id).await
    }

    /// Ticks or unticks a checklist line.
    pub async fn set_checked(&self, id: &str, checked: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE purchase_order_lines SET checked = ?2 WHERE id = ?1")
            .bind(id)
            .bind(checked)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PurchaseOrderLine", id));
        }

        self.changes.publish(&[DataChange::PurchaseLines]);
        Ok(())
    }

    pub async fn update_line(&self, line: &PurchaseOrderLine) -> DbResult<()> {
        validate_line(&line.name, line.quantity_ordered, line.unit_price_cents)?;

        let result = sqlx::query(
            r#"
            UPDATE purchase_order_lines SET
                name = ?2,
                quantity_ordered = ?3,
                unit_price_cents = ?4,
                checked = ?5,
                product_id = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&line.id)
        .bind(line.name.trim())
        .bind(line.quantity_ordered)
        .bind(line.unit_price_cents)
        .bind(line.checked)
        .bind(&line.product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PurchaseOrderLine", &line.id));
        }

        self.changes.publish(&[DataChange::PurchaseLines]);
        Ok(())
    }

    pub async fn remove_line(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM purchase_order_lines WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PurchaseOrderLine", id));
        }

        self.changes.publish(&[DataChange::PurchaseLines]);
        Ok(())
    }

    /// Empties the checklist. Returns how many lines were removed.
    pub async fn clear_lines(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM purchase_order_lines")
            .execute(&self.pool)
            .await?;

        info!(removed = result.rows_affected(), "Purchase checklist cleared");
        self.changes.publish(&[DataChange::PurchaseLines]);
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn insert(&self, new: &NewOrder) -> DbResult<Order> {
        validate_supplier(&new.supplier)?;
        validate_total_cents(new.total_cents)?;

        let order = Order {
            id: new_id(),
            kind: new.kind,
            supplier: new.supplier.trim().to_string(),
            total_cents: new.total_cents,
            state: new.state,
            created_at: Utc::now(),
        };

        let mut conn = self.pool.acquire().await?;
        insert_order(&mut conn, &order).await?;

        info!(id = %order.id, kind = %order.kind, "Order created");
        self.changes.publish(&[DataChange::Orders]);
        Ok(order)
    }

    pub async fn update(&self, order: &Order) -> DbResult<()> {
        validate_supplier(&order.supplier)?;
        validate_total_cents(order.total_cents)?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET kind = ?2, supplier = ?3, total_cents = ?4, state = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&order.id)
        .bind(order.kind)
        .bind(order.supplier.trim())
        .bind(order.total_cents)
        .bind(order.state)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", &order.id));
        }

        self.changes.publish(&[DataChange::Orders]);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        self.changes.publish(&[DataChange::Orders]);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Orders of one kind, optionally in one state, newest first.
    pub async fn list(&self, kind: OrderKind, state: Option<OrderState>) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE kind = ?1 AND (?2 IS NULL OR state = ?2) \
             ORDER BY created_at DESC, rowid DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(kind)
            .bind(state)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    /// The `limit` most recent orders of any kind.
    pub async fn latest(&self, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    // =========================================================================
    // Goods receipt
    // =========================================================================

    /// Receives the selected checklist lines into stock.
    ///
    /// Returns the confirmed order. Fails with `NothingToReceive` when no
    /// line is selected and `NotFound` when a selected line is gone; in both
    /// cases nothing is written.
    pub async fn receive(&self, line_ids: &[String], supplier: &str) -> DbResult<Order> {
        validate_supplier(supplier)?;

        let mut ids: Vec<&str> = Vec::with_capacity(line_ids.len());
        for id in line_ids {
            if !ids.contains(&id.as_str()) {
                ids.push(id.as_str());
            }
        }
        if ids.is_empty() {
            return Err(CoreError::NothingToReceive.into());
        }

        debug!(lines = ids.len(), supplier = %supplier, "Receiving purchase lines");

        let mut tx = self.pool.begin().await?;
        let mut total = Money::zero();

        for id in &ids {
            let line = fetch_line(&mut tx, id)
                .await?
                .ok_or_else(|| DbError::not_found("PurchaseOrderLine", *id))?;

            let product = resolve_product(&mut tx, &line).await?;
            apply_in_tx(
                &mut tx,
                &product.id,
                MovementKind::Entrada,
                line.quantity_ordered,
                RECEIPT_REASON,
            )
            .await?;

            total = Money::from_cents(line.unit_price_cents)
                .checked_multiply_quantity(line.quantity_ordered)
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "order total".to_string(),
                    min: 0,
                    max: i64::MAX,
                })?;

            sqlx::query("DELETE FROM purchase_order_lines WHERE id = ?1")
                .bind(&line.id)
                .execute(&mut *tx)
                .await?;
        }

        let order = Order {
            id: new_id(),
            kind: OrderKind::Requerimiento,
            supplier: supplier.trim().to_string(),
            total_cents: total.cents(),
            state: OrderState::StockConfirmado,
            created_at: Utc::now(),
        };
        insert_order(&mut tx, &order).await?;

        tx.commit().await?;

        info!(id = %order.id, lines = ids.len(), total_cents = order.total_cents, "Purchase received");
        self.changes.publish(&[
            DataChange::Products,
            DataChange::Movements,
            DataChange::PurchaseLines,
            DataChange::Orders,
        ]);

        Ok(order)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_line(name: &str, quantity: i64, unit_price_cents: i64) -> DbResult<()> {
    validate_product_name(name)?;
    validate_quantity(quantity)?;
    validate_price_cents(unit_price_cents)?;
    Ok(())
}

async fn fetch_line(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PurchaseOrderLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM purchase_order_lines WHERE id = ?1");
    let line = sqlx::query_as::<_, PurchaseOrderLine>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(line)
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, kind, supplier, total_cents, state, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&order.id)
    .bind(order.kind)
    .bind(&order.supplier)
    .bind(order.total_cents)
    .bind(order.state)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Finds the product a checklist line refers to, creating it when unknown.
async fn resolve_product(conn: &mut SqliteConnection, line: &PurchaseOrderLine) -> DbResult<Product> {
    if let Some(product_id) = &line.product_id {
        if let Some(product) = fetch_in_tx(conn, product_id).await? {
            return Ok(product);
        }
    }

    if let Some(product) = find_by_name_in_tx(conn, &line.name).await? {
        return Ok(product);
    }

    let product = Product {
        id: new_id(),
        name: line.name.clone(),
        description: String::new(),
        purchase_price_cents: line.unit_price_cents,
        sale_price_cents: line.unit_price_cents,
        stock: 0,
        location: String::new(),
        created_at: Utc::now(),
    };
    insert_in_tx(conn, &product).await?;

    info!(id = %product.id, name = %product.name, "Product created from purchase line");
    Ok(product)
}

// =============================================================================
// Unit Tests
// =============================================================================
