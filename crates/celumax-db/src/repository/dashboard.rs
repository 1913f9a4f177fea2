//! # Dashboard Repository
//!
//! Read-only home screen summary, assembled from the other repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  snapshot(since)                                                        │
//! │                                                                         │
//! │  receipts ── count SIN_ARREGLAR / ARREGLADO                              │
//! │           ── repaired / delivered since `since`                         │
//! │  invoices ── revenue since `since`                                      │
//! │  orders   ── latest 3                                                   │
//! │  products ── stock = 0                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use celumax_core::{start_of_today, DashboardSnapshot, ReceiptState};

use super::invoice::InvoiceRepository;
use super::order::OrderRepository;
use super::product::ProductRepository;
use super::receipt::ReceiptRepository;
use crate::changes::ChangeFeed;
use crate::error::DbResult;

/// Number of orders listed on the home screen.
pub const LATEST_ORDERS: u32 = 3;

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    products: ProductRepository,
    invoices: InvoiceRepository,
    orders: OrderRepository,
    receipts: ReceiptRepository,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        DashboardRepository {
            products: ProductRepository::new(pool.clone(), changes.clone()),
            invoices: InvoiceRepository::new(pool.clone(), changes.clone()),
            orders: OrderRepository::new(pool.clone(), changes.clone()),
            receipts: ReceiptRepository::new(pool, changes),
        }
    }

    /// Summary with "today" counters measured from `since`.
    pub async fn snapshot(&self, since: DateTime<Utc>) -> DbResult<DashboardSnapshot> {
        debug!(since = %since, "Building dashboard snapshot");

        let (pending_repairs, ready_repairs, repaired_today, delivered_today) = tokio::try_join!(
            self.receipts.count_by_state(ReceiptState::SinArreglar),
            self.receipts.count_by_state(ReceiptState::Arreglado),
            self.receipts.repaired_since(since),
            self.receipts.delivered_since(since),
        )?;
        let (revenue_today_cents, latest_orders, out_of_stock) = tokio::try_join!(
            self.invoices.revenue_since(since),
            self.orders.latest(LATEST_ORDERS),
            self.products.out_of_stock(),
        )?;

        Ok(DashboardSnapshot {
            pending_repairs,
            ready_repairs,
            revenue_today_cents,
            latest_orders,
            repaired_today,
            delivered_today,
            out_of_stock,
        })
    }

    /// Snapshot for the current local day.
    pub async fn today(&self) -> DbResult<DashboardSnapshot> {
        self.snapshot(start_of_today()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, product};
    use celumax_core::{
        InvoiceDraft, InvoiceLineDraft, NewOrder, OrderKind, OrderState, ReceiptDetails,
    };
    use chrono::Duration;

    #[tokio::test]
    async fn test_empty_snapshot() {
        let db = db().await;
        assert_eq!(db.dashboard().today().await.unwrap(), DashboardSnapshot::default());
    }

    #[tokio::test]
    async fn test_snapshot_counts() {
        let db = db().await;
        let display = product(&db, "Display Moto G20", 18_000_000, 1).await;
        product(&db, "Flex de carga", 2_000_000, 0).await;

        db.invoices()
            .create(&InvoiceDraft {
                client_name: "Mostrador".to_string(),
                client_id: String::new(),
                lines: vec![InvoiceLineDraft {
                    product_id: display.id.clone(),
                    quantity: 1,
                }],
            })
            .await
            .unwrap();

        let receipts = db.receipts();
        let ticket = ReceiptDetails {
            client_name: "Marta".to_string(),
            device_reference: "Xiaomi Redmi 9".to_string(),
            procedure: "Cambio de batería".to_string(),
            price_cents: 9_000_000,
            ..Default::default()
        };
        let first = receipts.insert(&ticket).await.unwrap();
        let second = receipts.insert(&ticket).await.unwrap();
        receipts.insert(&ticket).await.unwrap();
        receipts.advance(&first.id, ReceiptState::Arreglado).await.unwrap();
        receipts.advance(&second.id, ReceiptState::Arreglado).await.unwrap();
        receipts.advance(&second.id, ReceiptState::Entregado).await.unwrap();

        for supplier in ["A", "B", "C", "D"] {
            db.orders()
                .insert(&NewOrder {
                    kind: OrderKind::Requerimiento,
                    supplier: supplier.to_string(),
                    total_cents: 100,
                    state: OrderState::PendienteCompra,
                })
                .await
                .unwrap();
        }

        let snapshot = db.dashboard().snapshot(Utc::now() - Duration::hours(1)).await.unwrap();
        assert_eq!(snapshot.pending_repairs, 1);
        assert_eq!(snapshot.ready_repairs, 1);
        // `second` was delivered, so it is no longer counted as repaired
        assert_eq!(snapshot.repaired_today, 1);
        assert_eq!(snapshot.delivered_today, 1);
        assert_eq!(snapshot.revenue_today_cents, 18_000_000);
        assert_eq!(snapshot.latest_orders.len(), LATEST_ORDERS as usize);
        assert_eq!(snapshot.latest_orders[0].supplier, "D");
        // The sale emptied the display too
        assert_eq!(snapshot.out_of_stock.len(), 2);

        let later = db.dashboard().snapshot(Utc::now() + Duration::hours(1)).await.unwrap();
        assert_eq!(later.revenue_today_cents, 0);
        assert_eq!(later.repaired_today, 0);
        assert_eq!(later.pending_repairs, 1);
    }
}
