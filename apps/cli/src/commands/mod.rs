//! # Commands Module
//!
//! One submodule per screen of the shop.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (Output, argument parsers)
//! ├── product.rs    ◄─── Inventory: search, CRUD, metrics
//! ├── stock.rs      ◄─── Manual ENTRADA / SALIDA, movement history
//! ├── invoice.rs    ◄─── Counter sales: create, edit, void, print
//! ├── order.rs      ◄─── Purchase checklist, receiving, order history
//! ├── receipt.rs    ◄─── Repair tickets and their lifecycle
//! ├── dashboard.rs  ◄─── Today's summary
//! ├── backup.rs     ◄─── Snapshots, restore, the backup daemon
//! └── config.rs     ◄─── Show / write celumax.toml
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  $ celumax invoice create --client "Ana" --line 7f1c…:2                  │
//! │         │                                                               │
//! │         │ clap derive                                                   │
//! │         ▼                                                               │
//! │  InvoiceCommand::Create { client, lines, .. }                           │
//! │         │                                                               │
//! │         │ invoice::run(&AppState, cmd)                                  │
//! │         ▼                                                               │
//! │  CliResult<Output>                                                      │
//! │         │                                                               │
//! │         ├── Ok(Output::Json)  ──► pretty JSON on stdout                 │
//! │         ├── Ok(Output::Text)  ──► ticket text on stdout                 │
//! │         └── Err(CliError)     ──► {"code", "message"} on stderr, exit 1 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod backup;
pub mod config;
pub mod dashboard;
pub mod invoice;
pub mod order;
pub mod product;
pub mod receipt;
pub mod stock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use celumax_core::{day_bounds, InvoiceLineDraft};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliResult;

/// What a command prints.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Json(Value),
    /// Pre-formatted text, e.g. a ticket.
    Text(String),
}

impl Output {
    pub fn json<T: Serialize>(value: T) -> CliResult<Self> {
        Ok(Output::Json(serde_json::to_value(value)?))
    }

    /// Text printed to stdout.
    pub fn render(&self) -> CliResult<String> {
        match self {
            Output::Json(value) => Ok(serde_json::to_string_pretty(value)?),
            Output::Text(text) => Ok(text.clone()),
        }
    }
}

// =============================================================================
// Argument parsers (clap value_parser)
// =============================================================================

/// Parses an amount typed by the clerk into cents.
///
/// Accepts `25000`, `25000.5`, `25000.50` and an optional leading `$`.
pub fn parse_money(s: &str) -> Result<i64, String> {
    let raw = s.trim().trim_start_matches('$');
    let invalid = || format!("'{}' is not an amount (expected e.g. 25000 or 25000.50)", s);

    let (major, minor) = match raw.split_once('.') {
        Some((major, minor)) => (major, minor),
        None => (raw, ""),
    };
    if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if minor.len() > 2 || !minor.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let major: i64 = major.parse().map_err(|_| invalid())?;
    let minor: i64 = match minor.len() {
        0 => 0,
        1 => minor.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => minor.parse().map_err(|_| invalid())?,
    };

    major
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(minor))
        .ok_or_else(invalid)
}

/// Parses an invoice line given as `<product id>:<quantity>`.
pub fn parse_line(s: &str) -> Result<InvoiceLineDraft, String> {
    let (product_id, quantity) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("'{}' is not a line (expected <product id>:<quantity>)", s))?;
    let quantity = quantity
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("'{}' is not a quantity", quantity))?;

    Ok(InvoiceLineDraft {
        product_id: product_id.trim().to_string(),
        quantity,
    })
}

/// Parses a calendar day, `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a date (expected YYYY-MM-DD)", s))
}

/// Parses a local date-time, `YYYY-MM-DD HH:MM`. A bare date means the
/// start of that day.
pub fn parse_local_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .ok_or_else(|| format!("'{}' does not exist in the local time zone", s));
        }
    }
    parse_date(s)
        .map(|date| day_bounds(date).0)
        .map_err(|_| format!("'{}' is not a date (expected YYYY-MM-DD or YYYY-MM-DD HH:MM)", s))
}

/// UTC range covering whole local days `from..=to`, when both are given.
pub fn day_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        from.map(|d| day_bounds(d).0),
        to.map(|d| day_bounds(d).1),
    )
}
