//! # Receipt Commands
//!
//! Repair tickets: intake, edits, the SIN_ARREGLAR → ARREGLADO → ENTREGADO
//! lifecycle, and the printed ticket.
//!
//! ## Ticket Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  receipt add ...            SIN_ARREGLAR   due +1 day unless --due      │
//! │       │                                                                 │
//! │  receipt advance <id>       ARREGLADO      repaired_at stamped          │
//! │       │                                                                 │
//! │  receipt advance <id>       ENTREGADO      delivered_at stamped         │
//! │                                                                         │
//! │  Only one step forward at a time. `receipt update` edits client,        │
//! │  device and price fields and never touches the state or its dates.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand, ValueEnum};
use celumax_core::printing::{render_receipt, DEFAULT_RECEIPT_TEMPLATE};
use celumax_core::{NewReceipt, Receipt, ReceiptDetails, ReceiptFilter, ReceiptState};
use serde::Serialize;

use super::invoice::load_template;
use super::{day_range, parse_date, parse_local_datetime, parse_money, Output};
use crate::error::{CliError, CliResult};
use crate::state::AppState;

#[derive(Debug, Clone, Subcommand)]
pub enum ReceiptCommand {
    /// Register a device left for repair
    Add(AddReceiptArgs),
    Show { id: String },
    /// Edit client, device or price fields
    Update(UpdateReceiptArgs),
    /// Move one step forward (or to --to, which must be the next step)
    Advance {
        id: String,
        #[arg(long, value_enum)]
        to: Option<StateArg>,
    },
    Delete { id: String },
    /// Soonest due first
    List {
        /// Client name contains
        #[arg(long, default_value = "")]
        client: String,
        #[arg(long, value_enum)]
        state: Option<StateArg>,
        /// Delivered on or after this day; needs --delivered-to
        #[arg(long, value_parser = parse_date, requires = "delivered_to")]
        delivered_from: Option<NaiveDate>,
        /// Delivered on or before this day; needs --delivered-from
        #[arg(long, value_parser = parse_date, requires = "delivered_from")]
        delivered_to: Option<NaiveDate>,
    },
    /// Ticket text for the thermal printer
    Print {
        id: String,
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AddReceiptArgs {
    #[arg(long)]
    pub client: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub client_id: String,
    /// Brand and model
    #[arg(long)]
    pub device: String,
    /// Work to be done
    #[arg(long)]
    pub procedure: String,
    /// Unlock code or pattern left by the client
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long, value_parser = parse_money)]
    pub price: i64,
    #[arg(long, value_parser = parse_money, default_value = "0")]
    pub deposit: i64,
    /// Promised delivery, YYYY-MM-DD [HH:MM]
    #[arg(long, value_parser = parse_local_datetime)]
    pub due: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateReceiptArgs {
    pub id: String,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub client_id: Option<String>,
    #[arg(long)]
    pub device: Option<String>,
    #[arg(long)]
    pub procedure: Option<String>,
    /// An empty value clears the stored password
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long, value_parser = parse_money)]
    pub price: Option<i64>,
    #[arg(long, value_parser = parse_money)]
    pub deposit: Option<i64>,
    #[arg(long, value_parser = parse_local_datetime)]
    pub due: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    SinArreglar,
    Arreglado,
    Entregado,
}

impl From<StateArg> for ReceiptState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::SinArreglar => ReceiptState::SinArreglar,
            StateArg::Arreglado => ReceiptState::Arreglado,
            StateArg::Entregado => ReceiptState::Entregado,
        }
    }
}

/// Ticket plus the amount still owed.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptDto {
    #[serde(flatten)]
    pub receipt: Receipt,
    pub balance_cents: i64,
    pub balance: String,
}

impl From<Receipt> for ReceiptDto {
    fn from(receipt: Receipt) -> Self {
        let balance = receipt.balance();
        ReceiptDto {
            receipt,
            balance_cents: balance.cents(),
            balance: balance.to_string(),
        }
    }
}

impl From<AddReceiptArgs> for NewReceipt {
    fn from(args: AddReceiptArgs) -> Self {
        NewReceipt {
            client_name: args.client,
            client_phone: args.phone,
            client_id: args.client_id,
            device_reference: args.device,
            procedure: args.procedure,
            device_password: args.password,
            price_cents: args.price,
            deposit_cents: args.deposit,
            estimated_delivery_at: args.due,
        }
    }
}

/// Current fields with the given overrides applied.
fn merged_details(current: Receipt, args: UpdateReceiptArgs) -> ReceiptDetails {
    ReceiptDetails {
        client_name: args.client.unwrap_or(current.client_name),
        client_phone: args.phone.unwrap_or(current.client_phone),
        client_id: args.client_id.unwrap_or(current.client_id),
        device_reference: args.device.unwrap_or(current.device_reference),
        procedure: args.procedure.unwrap_or(current.procedure),
        device_password: args.password.or(current.device_password),
        price_cents: args.price.unwrap_or(current.price_cents),
        deposit_cents: args.deposit.unwrap_or(current.deposit_cents),
        estimated_delivery_at: args.due,
    }
}

async fn require_receipt(state: &AppState, id: &str) -> CliResult<Receipt> {
    state
        .db
        .receipts()
        .get(id)
        .await?
        .ok_or_else(|| CliError::not_found("Receipt", id))
}

pub async fn run(state: &AppState, cmd: ReceiptCommand) -> CliResult<Output> {
    let receipts = state.db.receipts();

    match cmd {
        ReceiptCommand::Add(args) => {
            let created = receipts.insert(&args.into()).await?;
            Output::json(ReceiptDto::from(created))
        }

        ReceiptCommand::Show { id } => Output::json(ReceiptDto::from(require_receipt(state, &id).await?)),

        ReceiptCommand::Update(args) => {
            let id = args.id.clone();
            let current = require_receipt(state, &id).await?;
            let updated = receipts
                .update_details(&id, &merged_details(current, args))
                .await?;
            Output::json(ReceiptDto::from(updated))
        }

        ReceiptCommand::Advance { id, to } => {
            let current = require_receipt(state, &id).await?;
            let target = match to {
                Some(target) => target.into(),
                // Already delivered: ask for the same state so the error names it
                None => current.state.next().unwrap_or(current.state),
            };
            let advanced = receipts.advance(&id, target).await?;
            Output::json(ReceiptDto::from(advanced))
        }

        ReceiptCommand::Delete { id } => {
            receipts.delete(&id).await?;
            Output::json(serde_json::json!({ "deleted": id }))
        }

        ReceiptCommand::List {
            client,
            state: receipt_state,
            delivered_from,
            delivered_to,
        } => {
            let (delivered_from, delivered_to) = day_range(delivered_from, delivered_to);
            let found = receipts
                .list(&ReceiptFilter {
                    client_query: client,
                    delivered_from,
                    delivered_to,
                    state: receipt_state.map(Into::into),
                })
                .await?;
            Output::json(found.into_iter().map(ReceiptDto::from).collect::<Vec<_>>())
        }

        ReceiptCommand::Print { id, template } => {
            let receipt = require_receipt(state, &id).await?;
            let template = load_template(template, DEFAULT_RECEIPT_TEMPLATE)?;
            Ok(Output::Text(render_receipt(
                &template,
                &state.config.shop,
                &receipt,
            )))
        }
    }
}
