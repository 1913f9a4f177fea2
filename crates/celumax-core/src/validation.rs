//! # Validation Module
//!
//! Input validation for shop records.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI arguments (clap)                                         │
//! │  ├── Types and required flags                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository entry points (Rust)                               │
//! │  └── THIS MODULE: field rules, before a transaction opens              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use celumax_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("Pantalla Samsung A10").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{InvoiceDraft, NewProduct, ReceiptDetails};
use crate::{MAX_INITIAL_STOCK, MAX_INVOICE_LINES, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

fn optional(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a product name: required, at most 200 characters.
///
/// ```rust
/// use celumax_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Cargador tipo C").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required("name", name, 200)
}

/// Validates a client name on invoices and receipts.
pub fn validate_client_name(name: &str) -> ValidationResult<()> {
    required("client_name", name, 120)
}

/// Validates a client id number (cédula).
///
/// May be empty. When present it must be digits, optionally with dots or
/// hyphens as typed on paper forms.
pub fn validate_client_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();
    optional("client_id", id, 20)?;

    if !id
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "client_id".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock movement reason.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    required("reason", reason, 200)
}

/// Validates an order supplier. Empty is allowed for customer orders.
pub fn validate_supplier(supplier: &str) -> ValidationResult<()> {
    optional("supplier", supplier, 120)
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string. Empty means "everything".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a moved or sold quantity: 1 to [`MAX_ITEM_QUANTITY`].
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  validate_quantity(qty)                                                 │
/// │       ├── qty <= 0?    → Error: "quantity must be positive"            │
/// │       ├── qty > 9999?  → Error: "quantity must be between 1 and 9999"  │
/// │       └── OK → open the transaction                                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents: 0 to [`MAX_PRICE_CENTS`]. Zero is allowed
/// (warranty work, gifts).
///
/// ```rust
/// use celumax_core::validation::validate_price_cents;
/// use celumax_core::MAX_PRICE_CENTS;
///
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stored order total. Received orders add up many lines, so
/// only the sign is checked.
pub fn validate_total_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "total".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates initial stock of a new product: 0 to [`MAX_INITIAL_STOCK`].
pub fn validate_initial_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_INITIAL_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_INITIAL_STOCK,
        });
    }
    Ok(())
}

/// Deposit must be non-negative and not above the repair price.
pub fn validate_deposit(price_cents: i64, deposit_cents: i64) -> ValidationResult<()> {
    if deposit_cents < 0 || deposit_cents > price_cents {
        return Err(ValidationError::OutOfRange {
            field: "deposit".to_string(),
            min: 0,
            max: price_cents,
        });
    }
    Ok(())
}

/// Validates the number of distinct products on an invoice.
pub fn validate_invoice_line_count(lines: usize) -> ValidationResult<()> {
    if lines > MAX_INVOICE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "invoice lines".to_string(),
            min: 1,
            max: MAX_INVOICE_LINES as i64,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use celumax_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    optional("description", &product.description, 1_000)?;
    optional("location", &product.location, 100)?;
    validate_price_cents(product.purchase_price_cents)?;
    validate_price_cents(product.sale_price_cents)?;
    validate_initial_stock(product.stock)
}

/// Header and per-line checks. An empty line list is reported by the
/// repository as `CoreError::EmptyInvoice`, not here.
pub fn validate_invoice_draft(draft: &InvoiceDraft) -> ValidationResult<()> {
    validate_client_name(&draft.client_name)?;
    validate_client_id(&draft.client_id)?;
    validate_invoice_line_count(draft.lines.len())?;
    for line in &draft.lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            });
        }
        validate_quantity(line.quantity)?;
    }
    Ok(())
}

pub fn validate_receipt_details(details: &ReceiptDetails) -> ValidationResult<()> {
    validate_client_name(&details.client_name)?;
    validate_client_id(&details.client_id)?;
    optional("client_phone", &details.client_phone, 30)?;
    required("device_reference", &details.device_reference, 120)?;
    required("procedure", &details.procedure, 500)?;
    validate_price_cents(details.price_cents)?;
    validate_deposit(details.price_cents, details.deposit_cents)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvoiceLineDraft;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Pantalla A10").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
        // Counted in characters, not bytes
        assert!(validate_product_name(&"ñ".repeat(200)).is_ok());
    }

    #[test]
    fn test_validate_client_id() {
        assert!(validate_client_id("").is_ok());
        assert!(validate_client_id("1.020.304.050").is_ok());
        assert!(validate_client_id("10203040").is_ok());
        assert!(validate_client_id("abc").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_bounds() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price_cents(i64::MAX / 2 + 1).is_err());
        assert!(validate_price_cents(i64::MAX).is_err());

        assert!(validate_total_cents(i64::MAX).is_ok());
        assert!(validate_total_cents(-1).is_err());

        assert!(validate_initial_stock(MAX_INITIAL_STOCK).is_ok());
        assert!(validate_initial_stock(MAX_INITIAL_STOCK + 1).is_err());
        assert!(validate_initial_stock(i64::MAX).is_err());
    }

    #[test]
    fn test_largest_invoice_total_fits() {
        // Worst case after merging: every line names the same product
        let units = MAX_ITEM_QUANTITY * MAX_INVOICE_LINES as i64;
        let total = MAX_PRICE_CENTS.checked_mul(units);
        assert!(total.is_some());
    }

    #[test]
    fn test_validate_deposit() {
        assert!(validate_deposit(10_000, 0).is_ok());
        assert!(validate_deposit(10_000, 10_000).is_ok());
        assert!(validate_deposit(10_000, 10_001).is_err());
        assert!(validate_deposit(10_000, -1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }

    #[test]
    fn test_validate_invoice_draft() {
        let mut draft = InvoiceDraft {
            client_name: "María".to_string(),
            client_id: "123".to_string(),
            lines: vec![InvoiceLineDraft {
                product_id: "p1".to_string(),
                quantity: 2,
            }],
        };
        assert!(validate_invoice_draft(&draft).is_ok());

        draft.lines[0].quantity = 0;
        assert!(validate_invoice_draft(&draft).is_err());

        draft.lines[0].quantity = 1;
        draft.client_name = " ".to_string();
        assert!(matches!(
            validate_invoice_draft(&draft),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_receipt_details() {
        let details = ReceiptDetails {
            client_name: "Pedro".to_string(),
            device_reference: "Redmi Note 9".to_string(),
            procedure: "Cambio de pin de carga".to_string(),
            price_cents: 40_000,
            deposit_cents: 60_000,
            ..Default::default()
        };
        assert!(validate_receipt_details(&details).is_err());

        let details = ReceiptDetails {
            deposit_cents: 20_000,
            ..details
        };
        assert!(validate_receipt_details(&details).is_ok());
    }
}
