//! # Order Commands
//!
//! The purchase checklist (what to buy next), receiving goods into stock,
//! and the order history.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order line add --name "Pantalla A10" --quantity 3 --unit-price 80000   │
//! │  order line check <line id>            (ticked on the list)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  order receive --supplier "Repuestos Bogotá"                            │
//! │       │  no --line given: every checked line                            │
//! │       ▼                                                                 │
//! │  ENTRADA per line, lines removed, REQUERIMIENTO / STOCK_CONFIRMADO      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use clap::{Subcommand, ValueEnum};
use celumax_core::{Money, NewOrder, NewPurchaseOrderLine, Order, OrderKind, OrderState, PurchaseOrderLine};
use serde::Serialize;
use tracing::debug;

use super::{parse_money, Output};
use crate::error::{CliError, CliResult};
use crate::state::AppState;

/// Orders shown by `order latest` when no limit is given.
pub const DEFAULT_LATEST: u32 = 3;

#[derive(Debug, Clone, Subcommand)]
pub enum OrderCommand {
    /// Purchase checklist
    Line {
        #[command(subcommand)]
        cmd: LineCommand,
    },
    /// Receive checklist lines into stock
    Receive {
        #[arg(long)]
        supplier: String,
        /// Lines to receive; all checked lines when omitted
        #[arg(long = "line")]
        lines: Vec<String>,
    },
    /// Record an order by hand
    Add {
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long)]
        supplier: String,
        #[arg(long, value_parser = parse_money)]
        total: i64,
        #[arg(long, value_enum, default_value_t = StateArg::PendienteCompra)]
        state: StateArg,
    },
    Update {
        id: String,
        #[arg(long)]
        supplier: Option<String>,
        #[arg(long, value_parser = parse_money)]
        total: Option<i64>,
        #[arg(long, value_enum)]
        state: Option<StateArg>,
    },
    Delete { id: String },
    Show { id: String },
    /// Orders of one kind, newest first
    List {
        #[arg(long, value_enum, default_value_t = KindArg::Requerimiento)]
        kind: KindArg,
        #[arg(long, value_enum)]
        state: Option<StateArg>,
    },
    /// Most recent orders of any kind
    Latest {
        #[arg(long, default_value_t = DEFAULT_LATEST)]
        limit: u32,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum LineCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: i64,
        #[arg(long, value_parser = parse_money, default_value = "0")]
        unit_price: i64,
        /// Product this line restocks, when it already exists
        #[arg(long)]
        product: Option<String>,
    },
    List,
    /// Tick (or with --off untick) a line
    Check {
        id: String,
        #[arg(long)]
        off: bool,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        quantity: Option<i64>,
        #[arg(long, value_parser = parse_money)]
        unit_price: Option<i64>,
        #[arg(long)]
        product: Option<String>,
    },
    Remove { id: String },
    /// Empty the checklist
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Venta,
    Requerimiento,
}

impl From<KindArg> for OrderKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Venta => OrderKind::Venta,
            KindArg::Requerimiento => OrderKind::Requerimiento,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    PendienteCompra,
    StockConfirmado,
}

impl From<StateArg> for OrderState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::PendienteCompra => OrderState::PendienteCompra,
            StateArg::StockConfirmado => OrderState::StockConfirmado,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistDto {
    pub lines: Vec<PurchaseOrderLine>,
    pub checked: usize,
    /// Σ quantity × unit price over all lines.
    pub total: String,
}

impl From<Vec<PurchaseOrderLine>> for ChecklistDto {
    fn from(lines: Vec<PurchaseOrderLine>) -> Self {
        let total: Money = lines.iter().map(PurchaseOrderLine::line_total).sum();
        ChecklistDto {
            checked: lines.iter().filter(|l| l.checked).count(),
            total: total.to_string(),
            lines,
        }
    }
}

async fn require_line(state: &AppState, id: &str) -> CliResult<PurchaseOrderLine> {
    state
        .db
        .orders()
        .get_line(id)
        .await?
        .ok_or_else(|| CliError::not_found("PurchaseOrderLine", id))
}

async fn require_order(state: &AppState, id: &str) -> CliResult<Order> {
    state
        .db
        .orders()
        .get(id)
        .await?
        .ok_or_else(|| CliError::not_found("Order", id))
}

async fn run_line(state: &AppState, cmd: LineCommand) -> CliResult<Output> {
    let orders = state.db.orders();

    match cmd {
        LineCommand::Add {
            name,
            quantity,
            unit_price,
            product,
        } => {
            let line = orders
                .add_line(&NewPurchaseOrderLine {
                    name,
                    quantity_ordered: quantity,
                    unit_price_cents: unit_price,
                    product_id: product,
                })
                .await?;
            Output::json(line)
        }

        LineCommand::List => Output::json(ChecklistDto::from(orders.list_lines().await?)),

        LineCommand::Check { id, off } => {
            orders.set_checked(&id, !off).await?;
            Output::json(require_line(state, &id).await?)
        }

        LineCommand::Update {
            id,
            name,
            quantity,
            unit_price,
            product,
        } => {
            let mut line = require_line(state, &id).await?;
            if let Some(name) = name {
                line.name = name;
            }
            if let Some(quantity) = quantity {
                line.quantity_ordered = quantity;
            }
            if let Some(cents) = unit_price {
                line.unit_price_cents = cents;
            }
            if let Some(product) = product {
                // An empty value unlinks the product
                line.product_id = Some(product).filter(|p| !p.trim().is_empty());
            }
            orders.update_line(&line).await?;
            Output::json(line)
        }

        LineCommand::Remove { id } => {
            orders.remove_line(&id).await?;
            Output::json(serde_json::json!({ "removed": id }))
        }

        LineCommand::Clear => {
            let removed = orders.clear_lines().await?;
            Output::json(serde_json::json!({ "removed": removed }))
        }
    }
}

pub async fn run(state: &AppState, cmd: OrderCommand) -> CliResult<Output> {
    let orders = state.db.orders();

    match cmd {
        OrderCommand::Line { cmd } => run_line(state, cmd).await,

        OrderCommand::Receive { supplier, lines } => {
            let line_ids = if lines.is_empty() {
                orders
                    .list_lines()
                    .await?
                    .into_iter()
                    .filter(|l| l.checked)
                    .map(|l| l.id)
                    .collect()
            } else {
                lines
            };
            debug!(count = line_ids.len(), supplier = %supplier, "order receive command");
            Output::json(orders.receive(&line_ids, &supplier).await?)
        }

        OrderCommand::Add {
            kind,
            supplier,
            total,
            state: order_state,
        } => {
            let order = orders
                .insert(&NewOrder {
                    kind: kind.into(),
                    supplier,
                    total_cents: total,
                    state: order_state.into(),
                })
                .await?;
            Output::json(order)
        }

        OrderCommand::Update {
            id,
            supplier,
            total,
            state: order_state,
        } => {
            let mut order = require_order(state, &id).await?;
            if let Some(supplier) = supplier {
                order.supplier = supplier;
            }
            if let Some(total) = total {
                order.total_cents = total;
            }
            if let Some(order_state) = order_state {
                order.state = order_state.into();
            }
            orders.update(&order).await?;
            Output::json(order)
        }

        OrderCommand::Delete { id } => {
            orders.delete(&id).await?;
            Output::json(serde_json::json!({ "deleted": id }))
        }

        OrderCommand::Show { id } => Output::json(require_order(state, &id).await?),

        OrderCommand::List {
            kind,
            state: order_state,
        } => Output::json(orders.list(kind.into(), order_state.map(Into::into)).await?),

        OrderCommand::Latest { limit } => Output::json(orders.latest(limit).await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::AppConfig;
    use serde_json::Value;

    async fn state() -> AppState {
        AppState::in_memory(AppConfig::default()).await.unwrap()
    }

    fn json(output: Output) -> Value {
        match output {
            Output::Json(value) => value,
            Output::Text(_) => panic!("expected JSON"),
        }
    }

    async fn add_line(state: &AppState, name: &str, quantity: i64) -> String {
        let line = json(
            run(
                state,
                OrderCommand::Line {
                    cmd: LineCommand::Add {
                        name: name.into(),
                        quantity,
                        unit_price: 800_000,
                        product: None,
                    },
                },
            )
            .await
            .unwrap(),
        );
        line["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_receive_checked_lines_only() {
        let state = state().await;
        let first = add_line(&state, "Pantalla A10", 2).await;
        add_line(&state, "Flex de carga", 5).await;

        run(
            &state,
            OrderCommand::Line {
                cmd: LineCommand::Check {
                    id: first,
                    off: false,
                },
            },
        )
        .await
        .unwrap();

        let order = json(
            run(
                &state,
                OrderCommand::Receive {
                    supplier: "Repuestos Bogotá".into(),
                    lines: vec![],
                },
            )
            .await
            .unwrap(),
        );
        assert_eq!(order["kind"], "REQUERIMIENTO");
        assert_eq!(order["state"], "STOCK_CONFIRMADO");
        assert_eq!(order["total_cents"], 1_600_000);

        let product = state
            .db
            .products()
            .get_by_name("Pantalla A10")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.stock, 2);

        let checklist = json(
            run(&state, OrderCommand::Line { cmd: LineCommand::List })
                .await
                .unwrap(),
        );
        assert_eq!(checklist["lines"].as_array().unwrap().len(), 1);
        assert_eq!(checklist["checked"], 0);
        assert_eq!(checklist["total"], "$40000.00");
    }

    #[tokio::test]
    async fn test_receive_nothing_checked() {
        let state = state().await;
        add_line(&state, "Pantalla A10", 2).await;
        let err = run(
            &state,
            OrderCommand::Receive {
                supplier: "Repuestos Bogotá".into(),
                lines: vec![],
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NothingToReceive);
    }

    #[tokio::test]
    async fn test_manual_order_update_and_list() {
        let state = state().await;
        let order = json(
            run(
                &state,
                OrderCommand::Add {
                    kind: KindArg::Venta,
                    supplier: "Cliente mostrador".into(),
                    total: 4_500_000,
                    state: StateArg::PendienteCompra,
                },
            )
            .await
            .unwrap(),
        );
        let id = order["id"].as_str().unwrap().to_string();

        let updated = json(
            run(
                &state,
                OrderCommand::Update {
                    id,
                    supplier: None,
                    total: None,
                    state: Some(StateArg::StockConfirmado),
                },
            )
            .await
            .unwrap(),
        );
        assert_eq!(updated["state"], "STOCK_CONFIRMADO");

        let sales = json(
            run(
                &state,
                OrderCommand::List {
                    kind: KindArg::Venta,
                    state: Some(StateArg::StockConfirmado),
                },
            )
            .await
            .unwrap(),
        );
        assert_eq!(sales.as_array().unwrap().len(), 1);

        let requirements = json(
            run(
                &state,
                OrderCommand::List {
                    kind: KindArg::Requerimiento,
                    state: None,
                },
            )
            .await
            .unwrap(),
        );
        assert!(requirements.as_array().unwrap().is_empty());
    }
}
