//! # Domain Types
//!
//! Core domain types used throughout the shop manager.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │◄──│  StockMovement  │   │    Receipt      │       │
//! │  │  stock ≥ 0      │   │  ENTRADA/SALIDA │   │  repair ticket  │       │
//! │  └────────▲────────┘   └─────────────────┘   │  SIN_ARREGLAR → │       │
//! │           │                                   │  ARREGLADO →    │       │
//! │  ┌────────┴────────┐   ┌─────────────────┐   │  ENTREGADO      │       │
//! │  │  InvoiceLine    │──►│    Invoice      │   └─────────────────┘       │
//! │  │  price snapshot │   │  client, total  │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │PurchaseOrderLine│──►│     Order       │  (on receipt)                │
//! │  │  checklist row  │   │ VENTA/REQUERIM. │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Enum values are persisted as their SCREAMING_SNAKE_CASE names
//! (`ENTRADA`, `SIN_ARREGLAR`, ...) so existing shop data stays readable.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Enums
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Inbound: purchases, order receipts, invoice reversals.
    Entrada,
    /// Outbound: sales, losses. Clamped so stock never goes negative.
    Salida,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entrada => "ENTRADA",
            MovementKind::Salida => "SALIDA",
        }
    }
}

/// Kind of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// An order placed by a customer.
    Venta,
    /// A supply requirement placed with a supplier.
    Requerimiento,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Venta => "VENTA",
            OrderKind::Requerimiento => "REQUERIMIENTO",
        }
    }
}

/// State of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Waiting to be bought.
    #[default]
    PendienteCompra,
    /// Goods arrived and stock was updated.
    StockConfirmado,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::PendienteCompra => "PENDIENTE_COMPRA",
            OrderState::StockConfirmado => "STOCK_CONFIRMADO",
        }
    }
}

/// Lifecycle state of a repair ticket.
///
/// See [`crate::repair`] for the allowed transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptState {
    /// Device received, not repaired yet.
    #[default]
    SinArreglar,
    /// Repair finished, waiting for pickup.
    Arreglado,
    /// Device handed back to the client.
    Entregado,
}

impl ReceiptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptState::SinArreglar => "SIN_ARREGLAR",
            ReceiptState::Arreglado => "ARREGLADO",
            ReceiptState::Entregado => "ENTREGADO",
        }
    }
}

macro_rules! impl_text_enum {
    ($ty:ident, $field:literal, [$($variant:ident),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
                $(
                    if normalized == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )+
                Err(ValidationError::InvalidFormat {
                    field: $field.to_string(),
                    reason: format!("unknown value '{}'", s),
                })
            }
        }
    };
}

impl_text_enum!(MovementKind, "movement kind", [Entrada, Salida]);
impl_text_enum!(OrderKind, "order kind", [Venta, Requerimiento]);
impl_text_enum!(OrderState, "order state", [PendienteCompra, StockConfirmado]);
impl_text_enum!(ReceiptState, "receipt state", [SinArreglar, Arreglado, Entregado]);

// =============================================================================
// Product
// =============================================================================

/// A product kept in inventory (spare parts, accessories, phones).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub name: String,
    pub description: String,
    /// What the shop pays the supplier, in cents.
    pub purchase_price_cents: i64,
    /// What the client pays, in cents. Snapshotted into invoice lines.
    pub sale_price_cents: i64,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Shelf / drawer where the product is kept.
    pub location: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Stock valued at purchase price, saturating at the i64 range.
    pub fn stock_value(&self) -> Money {
        Money::from_cents(self.purchase_price_cents.saturating_mul(self.stock))
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    /// Opening stock, recorded as an ENTRADA movement "Stock inicial".
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub location: String,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Audit row appended for every stock change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Quantity moved as requested (always positive).
    pub quantity: i64,
    /// Free text: "Compra", "Venta factura ...", "Ajuste por pérdida", ...
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Filter for a product's movement history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: String,
    /// `None` returns both directions.
    pub kind: Option<MovementKind>,
    /// Inclusive lower bound.
    pub from: DateTime<Utc>,
    /// Inclusive upper bound.
    pub to: DateTime<Utc>,
}

impl MovementFilter {
    /// All movements of a product: from a century ago until tomorrow.
    pub fn for_product(product_id: impl Into<String>) -> Self {
        let now = Utc::now();
        MovementFilter {
            product_id: product_id.into(),
            kind: None,
            from: now - Duration::days(36_500),
            to: now + Duration::days(1),
        }
    }

    pub fn kind(mut self, kind: Option<MovementKind>) -> Self {
        self.kind = kind;
        self
    }

    /// Restricts to whole local days, `end` included up to 23:59:59.
    pub fn days(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        let (from, _) = day_bounds(start);
        let (_, to) = day_bounds(end);
        self.from = from;
        self.to = to;
        self
    }
}

// =============================================================================
// Purchase Orders
// =============================================================================

/// A row of the purchase checklist, before goods arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrderLine {
    pub id: String,
    pub name: String,
    pub quantity_ordered: i64,
    pub unit_price_cents: i64,
    /// Ticked on the checklist once the item is physically received.
    pub checked: bool,
    /// Set when the line was added from an existing product.
    pub product_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrderLine {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity_ordered)
    }
}

/// Input for adding a purchase checklist row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPurchaseOrderLine {
    pub name: String,
    pub quantity_ordered: i64,
    #[serde(default)]
    pub unit_price_cents: i64,
    #[serde(default)]
    pub product_id: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub kind: OrderKind,
    pub supplier: String,
    pub total_cents: i64,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Input for creating an order by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub kind: OrderKind,
    pub supplier: String,
    pub total_cents: i64,
    #[serde(default)]
    pub state: OrderState,
}

// =============================================================================
// Invoices
// =============================================================================

/// A sales invoice header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub client_name: String,
    /// National id number of the client (cédula).
    pub client_id: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// An invoice line as stored. Unit price is frozen at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceLine {
    pub invoice_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// An invoice line joined with the product name, for display and printing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceLineDetail {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl InvoiceLineDetail {
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// Invoice header with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceWithLines {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLineDetail>,
}

/// Requested line of an invoice being created or edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineDraft {
    pub product_id: String,
    pub quantity: i64,
}

/// Input for creating or replacing an invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub client_name: String,
    pub client_id: String,
    pub lines: Vec<InvoiceLineDraft>,
}

/// Filter for the invoice list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    /// Substring of the client name. Empty matches all.
    #[serde(default)]
    pub client_query: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// =============================================================================
// Receipts (repair tickets)
// =============================================================================

/// A repair ticket handed to the client when a device is left at the shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Receipt {
    pub id: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_id: String,
    /// Device make/model as written by the technician.
    pub device_reference: String,
    /// Work to be done.
    pub procedure: String,
    /// Unlock code/pattern left by the client, if any.
    pub device_password: Option<String>,
    pub price_cents: i64,
    /// Amount paid upfront.
    pub deposit_cents: i64,
    pub registered_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub state: ReceiptState,
    /// Set on the ARREGLADO transition.
    pub repaired_at: Option<DateTime<Utc>>,
    /// Set on the ENTREGADO transition only.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Receipt {
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    pub fn deposit(&self) -> Money {
        Money::from_cents(self.deposit_cents)
    }

    /// What the client still owes on pickup.
    pub fn balance(&self) -> Money {
        self.price() - self.deposit()
    }
}

/// Editable fields of a repair ticket. State and its timestamps are not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptDetails {
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub client_id: String,
    pub device_reference: String,
    pub procedure: String,
    #[serde(default)]
    pub device_password: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub deposit_cents: i64,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
}

/// A new ticket carries the same fields as an edit; state starts at
/// SIN_ARREGLAR and `registered_at` is stamped on insert.
pub type NewReceipt = ReceiptDetails;

/// Filter for the receipt list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptFilter {
    /// Substring of the client name. Empty matches all.
    #[serde(default)]
    pub client_query: String,
    /// Delivery-date range. Only applied when both bounds are set.
    pub delivered_from: Option<DateTime<Utc>>,
    pub delivered_to: Option<DateTime<Utc>>,
    pub state: Option<ReceiptState>,
}

// =============================================================================
// Aggregates
// =============================================================================

/// Inventory totals shown above the product list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMetrics {
    pub total_stock: i64,
    /// Σ stock × purchase price.
    pub inventory_value_cents: i64,
}

/// Home screen summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Receipts in SIN_ARREGLAR.
    pub pending_repairs: i64,
    /// Receipts in ARREGLADO.
    pub ready_repairs: i64,
    /// Invoice totals since the start of the day.
    pub revenue_today_cents: i64,
    pub latest_orders: Vec<Order>,
    /// Repaired today and still in ARREGLADO.
    pub repaired_today: i64,
    pub delivered_today: i64,
    pub out_of_stock: Vec<Product>,
}

// =============================================================================
// Time helpers
// =============================================================================

/// UTC bounds of a local calendar day: 00:00:00 to 23:59:59.999.
///
/// The end is taken from the next local midnight, so days with a DST change
/// are 23 or 25 hours long.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_to_utc(date.and_time(NaiveTime::MIN));
    let next_start = match date.succ_opt() {
        Some(next) => local_to_utc(next.and_time(NaiveTime::MIN)),
        None => start + Duration::days(1),
    };
    (start, next_start - Duration::milliseconds(1))
}

/// Start of the current local day, in UTC.
pub fn start_of_today() -> DateTime<Utc> {
    day_bounds(Local::now().date_naive()).0
}

fn local_to_utc(naive: chrono::NaiveDateTime) -> DateTime<Utc> {
    // Falls back to treating the time as UTC when it does not exist locally
    // (DST gap at midnight).
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_roundtrip() {
        assert_eq!("entrada".parse::<MovementKind>().unwrap(), MovementKind::Entrada);
        assert_eq!("SALIDA".parse::<MovementKind>().unwrap(), MovementKind::Salida);
        assert_eq!(
            "sin arreglar".parse::<ReceiptState>().unwrap(),
            ReceiptState::SinArreglar
        );
        assert_eq!(
            "stock-confirmado".parse::<OrderState>().unwrap(),
            OrderState::StockConfirmado
        );
        assert!("devuelto".parse::<ReceiptState>().is_err());
        assert_eq!(OrderKind::Requerimiento.to_string(), "REQUERIMIENTO");
    }

    #[test]
    fn test_enum_serde_names() {
        let json = serde_json::to_string(&ReceiptState::SinArreglar).unwrap();
        assert_eq!(json, "\"SIN_ARREGLAR\"");
        let kind: OrderKind = serde_json::from_str("\"VENTA\"").unwrap();
        assert_eq!(kind, OrderKind::Venta);
    }

    #[test]
    fn test_receipt_balance() {
        let receipt = Receipt {
            id: "r1".to_string(),
            client_name: "Ana".to_string(),
            client_phone: String::new(),
            client_id: String::new(),
            device_reference: "Moto G8".to_string(),
            procedure: "Cambio de pantalla".to_string(),
            device_password: None,
            price_cents: 12_000_000,
            deposit_cents: 5_000_000,
            registered_at: Utc::now(),
            estimated_delivery_at: Utc::now(),
            state: ReceiptState::SinArreglar,
            repaired_at: None,
            delivered_at: None,
        };
        assert_eq!(receipt.balance().cents(), 7_000_000);
    }

    #[test]
    fn test_day_bounds_cover_whole_day() {
        // Includes the usual DST switch dates of both hemispheres
        let dates = [
            (2024, 3, 15),
            (2024, 3, 10),
            (2024, 3, 31),
            (2024, 4, 7),
            (2024, 10, 6),
            (2024, 10, 27),
            (2024, 11, 3),
        ];
        for (y, m, d) in dates {
            let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
            let (start, end) = day_bounds(date);
            let (next_start, _) = day_bounds(date.succ_opt().unwrap());

            assert!(end > start);
            assert_eq!(end + Duration::milliseconds(1), next_start, "{date}");
            let hours = (next_start - start).num_hours();
            assert!((23..=25).contains(&hours), "{date}: {hours}h");
        }
    }

    #[test]
    fn test_movement_filter_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let filter = MovementFilter::for_product("p1")
            .kind(Some(MovementKind::Salida))
            .days(start, end);
        assert_eq!(filter.from, day_bounds(start).0);
        assert_eq!(filter.to, day_bounds(end).1);
        assert_eq!(filter.kind, Some(MovementKind::Salida));
    }
}
