//! # Dashboard Commands
//!
//! Today's summary: repairs waiting, repairs ready, revenue, latest orders,
//! empty shelves.
//!
//! `dashboard show --watch` keeps running and prints a new JSON line every
//! time the summary changes, until Ctrl-C.

use std::io::Write;

use clap::Subcommand;
use celumax_core::{DashboardSnapshot, Money};
use serde::Serialize;
use tracing::info;

use super::Output;
use crate::error::CliResult;
use crate::state::{AppState, DashboardState, DASHBOARD_TICK};

#[derive(Debug, Clone, Subcommand)]
pub enum DashboardCommand {
    Show {
        /// Keep printing updates until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardDto {
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,
    pub revenue_today: String,
}

impl From<DashboardSnapshot> for DashboardDto {
    fn from(snapshot: DashboardSnapshot) -> Self {
        DashboardDto {
            revenue_today: Money::from_cents(snapshot.revenue_today_cents).to_string(),
            snapshot,
        }
    }
}

pub async fn run(state: &AppState, cmd: DashboardCommand) -> CliResult<Output> {
    match cmd {
        DashboardCommand::Show { watch: false } => {
            let snapshot = state.db.dashboard().today().await?;
            Output::json(DashboardDto::from(snapshot))
        }
        DashboardCommand::Show { watch: true } => {
            watch(state).await?;
            Output::json(serde_json::json!({ "watch": "stopped" }))
        }
    }
}

/// Prints one compact JSON line per snapshot until Ctrl-C.
async fn watch(state: &AppState) -> CliResult<()> {
    let dashboard = DashboardState::load(state.db.clone()).await?;
    let mut updates = dashboard.subscribe();
    let listener = dashboard.spawn_listener(DASHBOARD_TICK);

    info!("Watching dashboard, Ctrl-C to stop");
    print_line(&dashboard.current())?;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_line(&snapshot)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    listener.abort();
    Ok(())
}

fn print_line(snapshot: &DashboardSnapshot) -> CliResult<()> {
    let line = serde_json::to_string(&DashboardDto::from(snapshot.clone()))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()?;
    Ok(())
}
