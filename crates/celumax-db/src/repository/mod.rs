//! # Repository Module
//!
//! Database repository implementations for the shop manager.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command                                                           │
//! │       │  db.invoices().create(&draft)                                   │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── validate input (celumax-core)                                     │
//! │  ├── BEGIN                                                             │
//! │  │     ├── read stock, check availability                              │
//! │  │     ├── write invoice + lines                                       │
//! │  │     └── movement::apply_in_tx() per line                            │
//! │  ├── COMMIT (drop = ROLLBACK on any error)                             │
//! │  └── publish DataChange                                                │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD, search, metrics
//! - [`MovementRepository`](movement::MovementRepository) - Stock movements and their audit trail
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices with stock effects
//! - [`OrderRepository`](order::OrderRepository) - Purchase checklist, orders, goods receipt
//! - [`ReceiptRepository`](receipt::ReceiptRepository) - Repair tickets
//! - [`DashboardRepository`](dashboard::DashboardRepository) - Home screen summary

pub mod dashboard;
pub mod invoice;
pub mod movement;
pub mod order;
pub mod product;
pub mod receipt;

use uuid::Uuid;

/// Generates a new entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// First eight characters of an id, used in movement reasons.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Builds a `LIKE ... ESCAPE '\'` pattern matching `query` anywhere.
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Shared fixtures for repository tests.
#[cfg(test)]
pub(crate) mod test_support {
    use celumax_core::{NewProduct, Product};

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn product(db: &Database, name: &str, sale_cents: i64, stock: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                name: name.to_string(),
                description: String::new(),
                purchase_price_cents: sale_cents / 2,
                sale_price_cents: sale_cents,
                stock,
                location: "Vitrina".to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("pantalla"), "%pantalla%");
        assert_eq!(contains_pattern(" 100% "), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern(""), "%%");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("550e8400-e29b-41d4"), "550e8400");
        assert_eq!(short_id("abc"), "abc");
    }
}
