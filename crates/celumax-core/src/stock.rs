//! # Stock Arithmetic
//!
//! The one rule every inventory workflow shares.
//!
//! ## Movement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  manual movement ─┐                                                     │
//! │  invoice create ──┤                                                     │
//! │  invoice edit ────┼──►  apply(current, kind, qty)  ──►  new stock ≥ 0   │
//! │  invoice delete ──┤         ENTRADA: current + qty                      │
//! │  order receipt ───┘         SALIDA:  max(current - qty, 0)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database layer reads the current stock, calls [`apply`] and writes the
//! result back inside the same transaction that appends the movement row.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::{InvoiceLineDraft, MovementKind, Product};

/// Returns the stock after moving `quantity` units in direction `kind`.
///
/// Outbound movements clamp at zero; the movement row still records the
/// quantity that was requested.
///
/// ```rust
/// use celumax_core::{stock, MovementKind};
///
/// assert_eq!(stock::apply(10, MovementKind::Salida, 4), 6);
/// assert_eq!(stock::apply(2, MovementKind::Salida, 4), 0);
/// ```
pub fn apply(current: i64, kind: MovementKind, quantity: i64) -> i64 {
    match kind {
        MovementKind::Entrada => current.saturating_add(quantity),
        MovementKind::Salida => current.saturating_sub(quantity).max(0),
    }
}

/// Merges draft lines that name the same product, summing quantities.
///
/// First-seen order is kept so invoice lines print in the order they were
/// entered.
pub fn merge_lines(lines: &[InvoiceLineDraft]) -> Vec<InvoiceLineDraft> {
    let mut merged: Vec<InvoiceLineDraft> = Vec::with_capacity(lines.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for line in lines {
        match index.get(line.product_id.as_str()) {
            Some(&pos) => merged[pos].quantity += line.quantity,
            None => {
                index.insert(line.product_id.as_str(), merged.len());
                merged.push(line.clone());
            }
        }
    }

    merged
}

/// Checks that `requested` units of `product` can be sold.
///
/// `already_held` is what the invoice being edited consumed before the
/// edit; those units go back on the shelf first, so they count as available.
pub fn ensure_available(product: &Product, requested: i64, already_held: i64) -> CoreResult<()> {
    let available = product.stock.saturating_add(already_held);
    if requested > available {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available,
            requested,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Pantalla A10".to_string(),
            description: String::new(),
            purchase_price_cents: 3_000,
            sale_price_cents: 5_000,
            stock,
            location: "Cajón 2".to_string(),
            created_at: Utc::now(),
        }
    }

    fn line(id: &str, qty: i64) -> InvoiceLineDraft {
        InvoiceLineDraft {
            product_id: id.to_string(),
            quantity: qty,
        }
    }

    #[test]
    fn test_apply_entrada_adds() {
        assert_eq!(apply(0, MovementKind::Entrada, 7), 7);
        assert_eq!(apply(5, MovementKind::Entrada, 1), 6);
    }

    #[test]
    fn test_apply_salida_clamps_at_zero() {
        assert_eq!(apply(5, MovementKind::Salida, 5), 0);
        assert_eq!(apply(5, MovementKind::Salida, 50), 0);
        assert_eq!(apply(0, MovementKind::Salida, 1), 0);
    }

    #[test]
    fn test_stock_never_negative_for_any_sequence() {
        let moves = [
            (MovementKind::Salida, 3),
            (MovementKind::Entrada, 2),
            (MovementKind::Salida, 10),
            (MovementKind::Salida, 1),
            (MovementKind::Entrada, 4),
            (MovementKind::Salida, 4),
            (MovementKind::Salida, 9_999),
        ];
        let mut stock = 1;
        for (kind, qty) in moves {
            stock = apply(stock, kind, qty);
            assert!(stock >= 0);
        }
        assert_eq!(stock, 0);
    }

    #[test]
    fn test_merge_lines_sums_duplicates_in_order() {
        let merged = merge_lines(&[line("b", 1), line("a", 2), line("b", 3)]);
        assert_eq!(merged, vec![line("b", 4), line("a", 2)]);
    }

    #[test]
    fn test_merge_lines_empty() {
        assert!(merge_lines(&[]).is_empty());
    }

    #[test]
    fn test_ensure_available() {
        let p = product(3);
        assert!(ensure_available(&p, 3, 0).is_ok());
        assert!(ensure_available(&p, 5, 2).is_ok());

        let err = ensure_available(&p, 4, 0).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extreme_stock_saturates() {
        assert_eq!(apply(i64::MAX, MovementKind::Entrada, 1), i64::MAX);
        assert_eq!(apply(0, MovementKind::Salida, i64::MAX), 0);
        assert!(ensure_available(&product(i64::MAX), i64::MAX, 5).is_ok());
    }
}
