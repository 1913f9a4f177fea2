//! # Invoice Repository
//!
//! Invoices and their effect on stock.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                                 │
//! │                                                                         │
//! │  1. CREATE  (one transaction)                                          │
//! │     ├── merge duplicate products, check availability                   │
//! │     ├── INSERT invoice + lines (sale price snapshotted)                │
//! │     └── SALIDA "Venta factura #..." per line                           │
//! │                                                                         │
//! │  2. EDIT    (one transaction)                                          │
//! │     ├── ENTRADA "Edición factura #..." per old line   (reverse)        │
//! │     ├── DELETE old lines                                               │
//! │     ├── INSERT new lines (old products keep their price)               │
//! │     └── SALIDA "Edición factura #..." per new line    (reapply)        │
//! │                                                                         │
//! │  3. DELETE  (one transaction)                                          │
//! │     ├── ENTRADA "Anulación factura #..." per line                      │
//! │     └── DELETE invoice (lines cascade)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Availability is checked before any write, against the stock plus what
//! the invoice already holds. A line can never be clamped, so deleting an
//! invoice restores exactly what creating it consumed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use celumax_core::stock;
use celumax_core::validation::{validate_invoice_draft, validate_invoice_line_count};
use celumax_core::{
    CoreError, Invoice, InvoiceDraft, InvoiceFilter, InvoiceLine, InvoiceLineDetail,
    InvoiceLineDraft, InvoiceWithLines, Money, MovementKind, Product,
};

use super::movement::apply_in_tx;
use super::product::fetch_in_tx;
use super::{contains_pattern, new_id, short_id};
use crate::changes::{ChangeFeed, DataChange};
use crate::error::{DbError, DbResult};

const INVOICE_COLUMNS: &str = "id, client_name, client_id, total_cents, created_at";

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

/// A draft line resolved against the product table.
struct PricedLine {
    product: Product,
    quantity: i64,
    unit_price_cents: i64,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        InvoiceRepository { pool, changes }
    }

    /// Creates an invoice and takes its lines out of stock.
    pub async fn create(&self, draft: &InvoiceDraft) -> DbResult<InvoiceWithLines> {
        let lines = prepare_lines(draft)?;

        let id = new_id();
        let now = Utc::now();
        let reason = format!("Venta factura #{}", short_id(&id));

        debug!(id = %id, lines = lines.len(), "Creating invoice");

        let mut tx = self.pool.begin().await?;

        let held = HashMap::new();
        let prices = HashMap::new();
        let priced = price_lines(&mut tx, &lines, &held, &prices).await?;
        let total_cents = priced_total(&priced);

        sqlx::query(
            r#"
            INSERT INTO invoices (id, client_name, client_id, total_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(draft.client_name.trim())
        .bind(draft.client_id.trim())
        .bind(total_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        write_lines(&mut tx, &id, &priced, &reason).await?;

        tx.commit().await?;

        info!(id = %id, total_cents, "Invoice created");
        self.publish();

        Ok(InvoiceWithLines {
            invoice: Invoice {
                id,
                client_name: draft.client_name.trim().to_string(),
                client_id: draft.client_id.trim().to_string(),
                total_cents,
                created_at: now,
            },
            lines: details(&priced),
        })
    }

    /// Replaces client fields and lines of an existing invoice.
    ///
    /// Old stock effect is reversed before the new lines are applied.
    /// Products already on the invoice keep their original unit price;
    /// newly added products take the current sale price.
    pub async fn update(&self, id: &str, draft: &InvoiceDraft) -> DbResult<InvoiceWithLines> {
        let lines = prepare_lines(draft)?;
        let reason = format!("Edición factura #{}", short_id(id));

        debug!(id = %id, lines = lines.len(), "Updating invoice");

        let mut tx = self.pool.begin().await?;

        let invoice = fetch_invoice(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;
        let old_lines = fetch_lines(&mut tx, id).await?;

        let held: HashMap<String, i64> = old_lines
            .iter()
            .map(|l| (l.product_id.clone(), l.quantity))
            .collect();
        let prices: HashMap<String, i64> = old_lines
            .iter()
            .map(|l| (l.product_id.clone(), l.unit_price_cents))
            .collect();

        // Validate everything before the first write
        let priced = price_lines(&mut tx, &lines, &held, &prices).await?;
        let total_cents = priced_total(&priced);

        for old in &old_lines {
            apply_in_tx(&mut tx, &old.product_id, MovementKind::Entrada, old.quantity, &reason)
                .await?;
        }

        sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        write_lines(&mut tx, id, &priced, &reason).await?;

        sqlx::query(
            r#"
            UPDATE invoices SET client_name = ?2, client_id = ?3, total_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(draft.client_name.trim())
        .bind(draft.client_id.trim())
        .bind(total_cents)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, total_cents, "Invoice updated");
        self.publish();

        Ok(InvoiceWithLines {
            invoice: Invoice {
                client_name: draft.client_name.trim().to_string(),
                client_id: draft.client_id.trim().to_string(),
                total_cents,
                ..invoice
            },
            lines: details(&priced),
        })
    }

    /// Deletes an invoice and puts its lines back in stock.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let reason = format!("Anulación factura #{}", short_id(id));

        debug!(id = %id, "Deleting invoice");

        let mut tx = self.pool.begin().await?;

        if fetch_invoice(&mut tx, id).await?.is_none() {
            return Err(DbError::not_found("Invoice", id));
        }

        for line in fetch_lines(&mut tx, id).await? {
            apply_in_tx(&mut tx, &line.product_id, MovementKind::Entrada, line.quantity, &reason)
                .await?;
        }

        sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Invoice deleted");
        self.publish();
        Ok(())
    }

    /// Invoice with its lines, in the order they were entered.
    pub async fn get(&self, id: &str) -> DbResult<Option<InvoiceWithLines>> {
        let mut conn = self.pool.acquire().await?;

        let Some(invoice) = fetch_invoice(&mut conn, id).await? else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, InvoiceLineDetail>(
            r#"
            SELECT
                l.product_id,
                p.name AS product_name,
                l.quantity,
                l.unit_price_cents
            FROM invoice_lines l
            INNER JOIN products p ON p.id = l.product_id
            WHERE l.invoice_id = ?1
            ORDER BY l.rowid
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(InvoiceWithLines { invoice, lines }))
    }

    /// Invoices matching a client-name substring and optional date range,
    /// newest first.
    pub async fn list(&self, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE client_name LIKE ?1 ESCAPE '\\' \
               AND (?2 IS NULL OR julianday(created_at) >= julianday(?2)) \
               AND (?3 IS NULL OR julianday(created_at) <= julianday(?3)) \
             ORDER BY created_at DESC, rowid DESC"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(contains_pattern(&filter.client_query))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await?;
        Ok(invoices)
    }

    /// Invoices created at or after `since`, newest first.
    pub async fn since(&self, since: DateTime<Utc>) -> DbResult<Vec<Invoice>> {
        self.list(&InvoiceFilter {
            from: Some(since),
            ..Default::default()
        })
        .await
    }

    /// Sum of invoice totals at or after `since`.
    pub async fn revenue_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_cents), 0) FROM invoices
            WHERE julianday(created_at) >= julianday(?1)
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    fn publish(&self) {
        self.changes.publish(&[
            DataChange::Invoices,
            DataChange::Products,
            DataChange::Movements,
        ]);
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Validates the draft and merges duplicate products.
fn prepare_lines(draft: &InvoiceDraft) -> DbResult<Vec<InvoiceLineDraft>> {
    validate_invoice_draft(draft)?;
    let lines = stock::merge_lines(&draft.lines);
    if lines.is_empty() {
        return Err(CoreError::EmptyInvoice.into());
    }
    validate_invoice_line_count(lines.len())?;
    Ok(lines)
}

/// Resolves each line's product, checks availability and fixes its price.
async fn price_lines(
    conn: &mut SqliteConnection,
    lines: &[InvoiceLineDraft],
    held: &HashMap<String, i64>,
    prices: &HashMap<String, i64>,
) -> DbResult<Vec<PricedLine>> {
    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        let product = fetch_in_tx(conn, &line.product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &line.product_id))?;

        let already_held = held.get(&line.product_id).copied().unwrap_or(0);
        stock::ensure_available(&product, line.quantity, already_held)?;

        let unit_price_cents = prices
            .get(&line.product_id)
            .copied()
            .unwrap_or(product.sale_price_cents);

        priced.push(PricedLine {
            product,
            quantity: line.quantity,
            unit_price_cents,
        });
    }
    Ok(priced)
}

/// Prices and quantities are bounded by validation, so the sum fits.
fn priced_total(lines: &[PricedLine]) -> i64 {
    lines
        .iter()
        .map(|l| Money::from_cents(l.unit_price_cents).multiply_quantity(l.quantity))
        .sum::<Money>()
        .cents()
}

fn details(lines: &[PricedLine]) -> Vec<InvoiceLineDetail> {
    lines
        .iter()
        .map(|l| InvoiceLineDetail {
            product_id: l.product.id.clone(),
            product_name: l.product.name.clone(),
            quantity: l.quantity,
            unit_price_cents: l.unit_price_cents,
        })
        .collect()
}

/// Inserts lines and takes each one out of stock.
async fn write_lines(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    lines: &[PricedLine],
    reason: &str,
) -> DbResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (invoice_id, product_id, quantity, unit_price_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(invoice_id)
        .bind(&line.product.id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .execute(&mut *conn)
        .await?;

        apply_in_tx(conn, &line.product.id, MovementKind::Salida, line.quantity, reason).await?;
    }
    Ok(())
}

async fn fetch_invoice(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(invoice)
}

async fn fetch_lines(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
    let lines = sqlx::query_as::<_, InvoiceLine>(
        r#"
        SELECT invoice_id, product_id, quantity, unit_price_cents
        FROM invoice_lines
        WHERE invoice_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

// =============================================================================
// Unit Tests
// =============================================================================
