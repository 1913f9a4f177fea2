//! # celumax-core: Pure Business Logic for the Celumax Shop Manager
//!
//! This crate is the **heart** of the shop manager. It contains the business
//! rules of a phone repair shop (inventory, invoices, purchase orders and
//! repair tickets) as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Celumax Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/cli (celumax)                           │   │
//! │  │    product, stock, invoice, order, receipt, backup commands    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ celumax-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   stock   │  │  repair   │  │ printing  │  │   │
//! │  │   │  Product  │  │  apply()  │  │  advance  │  │ templates │  │   │
//! │  │   │  Invoice  │  │  merge    │  │  states   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    celumax-db (Database Layer)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer money type (minor units)
//! - [`types`] - Domain types: Product, Invoice, Order, Receipt, ...
//! - [`stock`] - Stock arithmetic shared by every inventory workflow
//! - [`repair`] - Repair-ticket lifecycle
//! - [`printing`] - Plain-text ticket templates
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain errors
//!
//! ## Example Usage
//!
//! ```rust
//! use celumax_core::stock;
//! use celumax_core::MovementKind;
//!
//! // Outbound movements never drive stock below zero
//! assert_eq!(stock::apply(3, MovementKind::Salida, 5), 0);
//! assert_eq!(stock::apply(3, MovementKind::Entrada, 5), 8);
//! ```

pub mod error;
pub mod money;
pub mod printing;
pub mod repair;
pub mod stock;
pub mod types;
pub mod validation;

// These allow users to do `use celumax_core::Money` instead of
// `use celumax_core::money::Money`
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product on one invoice line or movement.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum number of distinct products on one invoice.
pub const MAX_INVOICE_LINES: usize = 100;

/// Maximum unit price, order total or repair price, in cents ($1,000,000,000).
///
/// `MAX_PRICE_CENTS * MAX_ITEM_QUANTITY * MAX_INVOICE_LINES` fits in an i64,
/// so an invoice total can never overflow.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Maximum opening stock of a new product.
pub const MAX_INITIAL_STOCK: i64 = 1_000_000;

/// Number of suggestions returned by product autocomplete.
pub const SUGGESTION_LIMIT: u32 = 5;

/// Default page size for product listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
