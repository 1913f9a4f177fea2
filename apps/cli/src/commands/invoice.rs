//! # Invoice Commands
//!
//! Counter sales. Every write here moves stock in the same transaction.
//!
//! ```text
//! $ celumax invoice create --client "Ana Ruiz" --client-id 1020304 \
//!       --line <pantalla id>:1 --line <vidrio id>:2
//! $ celumax invoice update <id> --client "Ana Ruiz" --line <pantalla id>:1
//! $ celumax invoice print <id> > ticket.txt
//! $ celumax invoice delete <id>          # stock goes back on the shelf
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use celumax_core::printing::{render_invoice, DEFAULT_INVOICE_TEMPLATE};
use celumax_core::{InvoiceDraft, InvoiceFilter, InvoiceLineDraft, InvoiceWithLines};
use tracing::debug;

use super::{day_range, parse_date, parse_line, Output};
use crate::error::{CliError, CliResult};
use crate::state::AppState;

#[derive(Debug, Clone, Subcommand)]
pub enum InvoiceCommand {
    /// Sell products: one --line <product id>:<quantity> per product
    Create(InvoiceArgs),
    /// Replace client fields and lines of an invoice
    Update {
        id: String,
        #[command(flatten)]
        invoice: InvoiceArgs,
    },
    /// Void an invoice and return its stock
    Delete { id: String },
    Show { id: String },
    /// Newest first
    List {
        /// Client name contains
        #[arg(long, default_value = "")]
        client: String,
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },
    /// Ticket text for the thermal printer
    Print {
        id: String,
        /// Template file; the built-in ticket when omitted
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct InvoiceArgs {
    #[arg(long)]
    pub client: String,
    /// Cédula, may be left empty
    #[arg(long, default_value = "")]
    pub client_id: String,
    #[arg(long = "line", value_parser = parse_line, required = true)]
    pub lines: Vec<InvoiceLineDraft>,
}

impl From<InvoiceArgs> for InvoiceDraft {
    fn from(args: InvoiceArgs) -> Self {
        InvoiceDraft {
            client_name: args.client,
            client_id: args.client_id,
            lines: args.lines,
        }
    }
}

async fn require_invoice(state: &AppState, id: &str) -> CliResult<InvoiceWithLines> {
    state
        .db
        .invoices()
        .get(id)
        .await?
        .ok_or_else(|| CliError::not_found("Invoice", id))
}

/// Reads a ticket template, falling back to `default`.
pub(crate) fn load_template(path: Option<PathBuf>, default: &str) -> CliResult<String> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading ticket template");
            Ok(std::fs::read_to_string(path)?)
        }
        None => Ok(default.to_string()),
    }
}

pub async fn run(state: &AppState, cmd: InvoiceCommand) -> CliResult<Output> {
    let invoices = state.db.invoices();

    match cmd {
        InvoiceCommand::Create(args) => {
            let created = invoices.create(&args.into()).await?;
            Output::json(created)
        }

        InvoiceCommand::Update { id, invoice } => {
            let updated = invoices.update(&id, &invoice.into()).await?;
            Output::json(updated)
        }

        InvoiceCommand::Delete { id } => {
            invoices.delete(&id).await?;
            Output::json(serde_json::json!({ "deleted": id }))
        }

        InvoiceCommand::Show { id } => Output::json(require_invoice(state, &id).await?),

        InvoiceCommand::List { client, from, to } => {
            let (from, to) = day_range(from, to);
            let found = invoices
                .list(&InvoiceFilter {
                    client_query: client,
                    from,
                    to,
                })
                .await?;
            Output::json(found)
        }

        InvoiceCommand::Print { id, template } => {
            let invoice = require_invoice(state, &id).await?;
            let template = load_template(template, DEFAULT_INVOICE_TEMPLATE)?;
            Ok(Output::Text(render_invoice(
                &template,
                &state.config.shop,
                &invoice,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::AppConfig;
    use celumax_core::{NewProduct, Product};

    async fn setup() -> (AppState, Product) {
        let state = AppState::in_memory(AppConfig::default()).await.unwrap();
        let product = state
            .db
            .products()
            .insert(&NewProduct {
                name: "Pantalla A10".into(),
                purchase_price_cents: 8_000_000,
                sale_price_cents: 15_000_000,
                stock: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        (state, product)
    }

    fn args(product_id: &str, quantity: i64) -> InvoiceArgs {
        InvoiceArgs {
            client: "Ana Ruiz".into(),
            client_id: "1020304".into(),
            lines: vec![InvoiceLineDraft {
                product_id: product_id.to_string(),
                quantity,
            }],
        }
    }

    async fn stock(state: &AppState, id: &str) -> i64 {
        state.db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    fn invoice_id(output: Output) -> String {
        match output {
            Output::Json(value) => value["invoice"]["id"].as_str().unwrap().to_string(),
            Output::Text(_) => panic!("expected JSON"),
        }
    }

    #[tokio::test]
    async fn test_create_print_delete() {
        let (state, product) = setup().await;
        let id = invoice_id(
            run(&state, InvoiceCommand::Create(args(&product.id, 2)))
                .await
                .unwrap(),
        );
        assert_eq!(stock(&state, &product.id).await, 1);

        let printed = run(
            &state,
            InvoiceCommand::Print {
                id: id.clone(),
                template: None,
            },
        )
        .await
        .unwrap();
        match printed {
            Output::Text(text) => {
                assert!(text.contains("Ana Ruiz"));
                assert!(text.contains("Pantalla A10"));
                assert!(text.contains("CELUMAX"));
            }
            Output::Json(_) => panic!("expected ticket text"),
        }

        run(&state, InvoiceCommand::Delete { id: id.clone() })
            .await
            .unwrap();
        assert_eq!(stock(&state, &product.id).await, 3);

        let err = run(&state, InvoiceCommand::Show { id }).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_reported() {
        let (state, product) = setup().await;
        let err = run(&state, InvoiceCommand::Create(args(&product.id, 9)))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(stock(&state, &product.id).await, 3);
    }

    #[tokio::test]
    async fn test_custom_template_and_list() {
        let (state, product) = setup().await;
        let id = invoice_id(
            run(&state, InvoiceCommand::Create(args(&product.id, 1)))
                .await
                .unwrap(),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factura.txt");
        std::fs::write(&path, "Cliente: {{nombre_cliente}} / {{total_final}}").unwrap();
        let printed = run(
            &state,
            InvoiceCommand::Print {
                id,
                template: Some(path),
            },
        )
        .await
        .unwrap();
        assert_eq!(printed, Output::Text("Cliente: Ana Ruiz / 150000.00".into()));

        let listed = run(
            &state,
            InvoiceCommand::List {
                client: "ana".into(),
                from: None,
                to: None,
            },
        )
        .await
        .unwrap();
        match listed {
            Output::Json(value) => assert_eq!(value.as_array().unwrap().len(), 1),
            Output::Text(_) => panic!("expected JSON"),
        }
    }
}
