//! # Movement Repository
//!
//! Stock movements and the shared stock-write helper.
//!
//! ## The Stock Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_in_tx(conn, product, kind, qty, reason)                          │
//! │                                                                         │
//! │  1. SELECT stock FROM products WHERE id = ?      (missing → NotFound)   │
//! │  2. new = stock::apply(stock, kind, qty)         (SALIDA clamps at 0)   │
//! │  3. UPDATE products SET stock = new                                     │
//! │  4. INSERT INTO stock_movements (... qty as requested ...)              │
//! │                                                                         │
//! │  Always runs on the caller's transaction connection. Invoices, order   │
//! │  receipt and product creation use it the same way record() does.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use celumax_core::stock;
use celumax_core::validation::{validate_quantity, validate_reason};
use celumax_core::{MovementFilter, MovementKind, StockMovement};

use super::new_id;
use crate::changes::{ChangeFeed, DataChange};
use crate::error::{DbError, DbResult};

const MOVEMENT_COLUMNS: &str = "id, product_id, kind, quantity, reason, created_at";

/// Repository for stock movements.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        MovementRepository { pool, changes }
    }

    /// Records a manual movement: purchase, loss, adjustment.
    ///
    /// Stock write and audit row commit together or not at all.
    pub async fn record(
        &self,
        product_id: &str,
        kind: MovementKind,
        quantity: i64,
        reason: &str,
    ) -> DbResult<StockMovement> {
        validate_quantity(quantity)?;
        validate_reason(reason)?;

        let mut tx = self.pool.begin().await?;
        let movement = apply_in_tx(&mut tx, product_id, kind, quantity, reason.trim()).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            kind = %kind,
            quantity,
            "Stock movement recorded"
        );
        self.changes
            .publish(&[DataChange::Products, DataChange::Movements]);

        Ok(movement)
    }

    /// Movement history of one product, newest first.
    ///
    /// Both ends of the date range are inclusive.
    pub async fn list(&self, filter: &MovementFilter) -> DbResult<Vec<StockMovement>> {
        debug!(product_id = %filter.product_id, kind = ?filter.kind, "Listing movements");

        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE product_id = ?1 \
               AND (?2 IS NULL OR kind = ?2) \
               AND julianday(created_at) BETWEEN julianday(?3) AND julianday(?4) \
             ORDER BY created_at DESC, rowid DESC"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(&filter.product_id)
            .bind(filter.kind)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockMovement>> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE id = ?1");
        let movement = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movement)
    }
}

/// Applies one movement inside an open transaction.
///
/// Returns the audit row that was written. The row keeps the requested
/// quantity even when a SALIDA was clamped.
pub(crate) async fn apply_in_tx(
    conn: &mut SqliteConnection,
    product_id: &str,
    kind: MovementKind,
    quantity: i64,
    reason: &str,
) -> DbResult<StockMovement> {
    let current: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
    let current = current.ok_or_else(|| DbError::not_found("Product", product_id))?;

    let updated = stock::apply(current, kind, quantity);

    debug!(
        product_id = %product_id,
        kind = %kind,
        quantity,
        before = current,
        after = updated,
        "Applying stock movement"
    );

    sqlx::query("UPDATE products SET stock = ?2 WHERE id = ?1")
        .bind(product_id)
        .bind(updated)
        .execute(&mut *conn)
        .await?;

    let movement = StockMovement {
        id: new_id(),
        product_id: product_id.to_string(),
        kind,
        quantity,
        reason: reason.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO stock_movements (id, product_id, kind, quantity, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.kind)
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(movement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, product, stock_of};
    use celumax_core::{CoreError, NewProduct, MAX_INITIAL_STOCK, MAX_ITEM_QUANTITY};
    use chrono::{Duration, Local};

    #[tokio::test]
    async fn test_record_entrada_and_salida() {
        let db = db().await;
        let p = product(&db, "Batería J7", 3_500_000, 2).await;
        let repo = db.movements();

        repo.record(&p.id, MovementKind::Entrada, 5, "Compra").await.unwrap();
        assert_eq!(stock_of(&db, &p.id).await, 7);

        repo.record(&p.id, MovementKind::Salida, 3, "Venta mostrador")
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &p.id).await, 4);
    }

    #[tokio::test]
    async fn test_salida_clamps_but_records_requested_quantity() {
        let db = db().await;
        let p = product(&db, "Pin de carga", 300_000, 2).await;

        let movement = db
            .movements()
            .record(&p.id, MovementKind::Salida, 10, "Ajuste por pérdida")
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &p.id).await, 0);
        assert_eq!(movement.quantity, 10);

        let stored = db.movements().get_by_id(&movement.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);
        assert_eq!(stored.kind, MovementKind::Salida);
    }

    #[tokio::test]
    async fn test_stock_never_negative_across_sequence() {
        let db = db().await;
        let p = product(&db, "Tapa trasera", 900_000, 1).await;
        let repo = db.movements();

        let moves = [
            (MovementKind::Salida, 4),
            (MovementKind::Entrada, 2),
            (MovementKind::Salida, 1),
            (MovementKind::Salida, 9),
            (MovementKind::Entrada, 1),
        ];
        for (kind, qty) in moves {
            repo.record(&p.id, kind, qty, "Ajuste").await.unwrap();
            assert!(stock_of(&db, &p.id).await >= 0);
        }
        assert_eq!(stock_of(&db, &p.id).await, 1);
    }

    #[tokio::test]
    async fn test_extreme_stock_is_bounded() {
        let db = db().await;
        let err = db
            .products()
            .insert(&NewProduct {
                name: "Forro genérico".to_string(),
                stock: i64::MAX,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let p = product(&db, "Forro A10", 2_000_000, MAX_INITIAL_STOCK).await;
        let repo = db.movements();
        repo.record(&p.id, MovementKind::Entrada, MAX_ITEM_QUANTITY, "Compra")
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &p.id).await, MAX_INITIAL_STOCK + MAX_ITEM_QUANTITY);

        let err = repo
            .record(&p.id, MovementKind::Entrada, MAX_ITEM_QUANTITY + 1, "Compra")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let metrics = db.products().metrics().await.unwrap();
        assert_eq!(metrics.total_stock, MAX_INITIAL_STOCK + MAX_ITEM_QUANTITY);
    }

    #[tokio::test]
    async fn test_record_missing_product_writes_nothing() {
        let db = db().await;
        let err = db
            .movements()
            .record("missing", MovementKind::Entrada, 1, "Compra")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_record_validates_input() {
        let db = db().await;
        let p = product(&db, "Lente cámara", 400_000, 1).await;
        let repo = db.movements();
        assert!(repo.record(&p.id, MovementKind::Entrada, 0, "Compra").await.is_err());
        assert!(repo.record(&p.id, MovementKind::Entrada, 1, " ").await.is_err());
        assert_eq!(stock_of(&db, &p.id).await, 1);
    }

    #[tokio::test]
    async fn test_list_filters_kind_and_dates() {
        let db = db().await;
        let p = product(&db, "Altavoz", 700_000, 3).await;
        let repo = db.movements();
        repo.record(&p.id, MovementKind::Salida, 1, "Venta").await.unwrap();
        repo.record(&p.id, MovementKind::Entrada, 2, "Compra").await.unwrap();

        let all = repo.list(&MovementFilter::for_product(&p.id)).await.unwrap();
        assert_eq!(all.len(), 3);
        // newest first
        assert_eq!(all[0].reason, "Compra");

        let outbound = repo
            .list(&MovementFilter::for_product(&p.id).kind(Some(MovementKind::Salida)))
            .await
            .unwrap();
        assert_eq!(outbound.len(), 1);

        let today = Local::now().date_naive();
        let today_only = repo
            .list(&MovementFilter::for_product(&p.id).days(today, today))
            .await
            .unwrap();
        assert_eq!(today_only.len(), 3);

        let last_week = today - Duration::days(7);
        let old = repo
            .list(&MovementFilter::for_product(&p.id).days(last_week, last_week))
            .await
            .unwrap();
        assert!(old.is_empty());
    }
}
