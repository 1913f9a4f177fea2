//! # Stock Commands
//!
//! Manual stock changes and the per-product movement history.
//!
//! `stock out` clamps at zero: taking 5 from a shelf of 2 leaves 0, and the
//! movement row still records the 5 that were requested.

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use celumax_core::{day_bounds, MovementFilter, MovementKind, StockMovement};
use serde::Serialize;

use super::{parse_date, Output};
use super::product::{require_product, ProductDto};
use crate::error::{CliError, CliResult};
use crate::state::AppState;

#[derive(Debug, Clone, Subcommand)]
pub enum StockCommand {
    /// ENTRADA: purchase, return, correction upwards
    In {
        product_id: String,
        quantity: i64,
        #[arg(long)]
        reason: String,
    },
    /// SALIDA: loss, breakage, correction downwards
    Out {
        product_id: String,
        quantity: i64,
        #[arg(long)]
        reason: String,
    },
    /// Movements of one product, newest first
    History {
        product_id: String,
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        /// First day included (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        /// Last day included (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Entrada,
    Salida,
}

impl From<KindArg> for MovementKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Entrada => MovementKind::Entrada,
            KindArg::Salida => MovementKind::Salida,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementResult {
    pub movement: StockMovement,
    pub product: ProductDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryDto {
    pub product: ProductDto,
    pub movements: Vec<StockMovement>,
}

fn history_filter(
    product_id: &str,
    kind: Option<KindArg>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> CliResult<MovementFilter> {
    let filter = MovementFilter::for_product(product_id).kind(kind.map(MovementKind::from));
    match (from, to) {
        (Some(from), Some(to)) if from > to => {
            Err(CliError::validation("--from must not be after --to"))
        }
        (Some(from), Some(to)) => Ok(filter.days(from, to)),
        // One open end keeps the default bound on that side
        (Some(day), None) => Ok(MovementFilter {
            from: day_bounds(day).0,
            ..filter
        }),
        (None, Some(day)) => Ok(MovementFilter {
            to: day_bounds(day).1,
            ..filter
        }),
        (None, None) => Ok(filter),
    }
}

async fn record(
    state: &AppState,
    product_id: &str,
    kind: MovementKind,
    quantity: i64,
    reason: &str,
) -> CliResult<Output> {
    let movement = state
        .db
        .movements()
        .record(product_id, kind, quantity, reason)
        .await?;
    let product = require_product(state, product_id).await?;
    Output::json(MovementResult {
        movement,
        product: product.into(),
    })
}

pub async fn run(state: &AppState, cmd: StockCommand) -> CliResult<Output> {
    match cmd {
        StockCommand::In {
            product_id,
            quantity,
            reason,
        } => record(state, &product_id, MovementKind::Entrada, quantity, &reason).await,

        StockCommand::Out {
            product_id,
            quantity,
            reason,
        } => record(state, &product_id, MovementKind::Salida, quantity, &reason).await,

        StockCommand::History {
            product_id,
            kind,
            from,
            to,
        } => {
            let product = require_product(state, &product_id).await?;
            let filter = history_filter(&product_id, kind, from, to)?;
            let movements = state.db.movements().list(&filter).await?;
            Output::json(HistoryDto {
                product: product.into(),
                movements,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::AppConfig;
    use celumax_core::NewProduct;

    async fn state_with_product(stock: i64) -> (AppState, String) {
        let state = AppState::in_memory(AppConfig::default()).await.unwrap();
        let product = state
            .db
            .products()
            .insert(&NewProduct {
                name: "Vidrio templado".into(),
                purchase_price_cents: 200_000,
                sale_price_cents: 500_000,
                stock,
                ..Default::default()
            })
            .await
            .unwrap();
        (state, product.id)
    }

    fn json_of(output: Output) -> serde_json::Value {
        match output {
            Output::Json(value) => value,
            Output::Text(_) => panic!("expected JSON"),
        }
    }

    #[tokio::test]
    async fn test_out_clamps_at_zero() {
        let (state, id) = state_with_product(2).await;
        let result = json_of(
            run(
                &state,
                StockCommand::Out {
                    product_id: id.clone(),
                    quantity: 5,
                    reason: "Se rompieron en bodega".into(),
                },
            )
            .await
            .unwrap(),
        );
        assert_eq!(result["product"]["stock"], 0);
        assert_eq!(result["movement"]["quantity"], 5);
        assert_eq!(result["movement"]["kind"], "SALIDA");
    }

    #[tokio::test]
    async fn test_history_filters_by_kind() {
        let (state, id) = state_with_product(4).await;
        run(
            &state,
            StockCommand::Out {
                product_id: id.clone(),
                quantity: 1,
                reason: "Garantía".into(),
            },
        )
        .await
        .unwrap();

        let all = json_of(
            run(
                &state,
                StockCommand::History {
                    product_id: id.clone(),
                    kind: None,
                    from: None,
                    to: None,
                },
            )
            .await
            .unwrap(),
        );
        assert_eq!(all["movements"].as_array().unwrap().len(), 2);
        assert_eq!(all["movements"][0]["reason"], "Garantía");

        let today = chrono::Local::now().date_naive();
        let entries = json_of(
            run(
                &state,
                StockCommand::History {
                    product_id: id,
                    kind: Some(KindArg::Entrada),
                    from: Some(today),
                    to: Some(today),
                },
            )
            .await
            .unwrap(),
        );
        let entries = entries["movements"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["reason"], "Stock inicial");
    }

    #[tokio::test]
    async fn test_rejects_inverted_range_and_missing_product() {
        let (state, id) = state_with_product(1).await;
        let day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let err = run(
            &state,
            StockCommand::History {
                product_id: id,
                kind: None,
                from: Some(day),
                to: day.pred_opt(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = run(
            &state,
            StockCommand::In {
                product_id: "missing".into(),
                quantity: 1,
                reason: "Compra".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
