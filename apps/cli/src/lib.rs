//! # Celumax CLI Library
//!
//! Argument parsing and command dispatch for the `celumax` binary. Kept in a
//! library so the commands can be tested without spawning a process.
//!
//! ## Startup Sequence
//! 1. Parse arguments (clap)
//! 2. Load configuration: defaults → celumax.toml → CELUMAX_* env
//! 3. Initialize tracing (RUST_LOG, else `[logging].filter`), logs on stderr
//! 4. `config` commands run right away; everything else opens the database
//!    (migrations run on connect)
//! 5. Dispatch the command, print its output on stdout

pub mod commands;
pub mod error;
pub mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use commands::backup::BackupCommand;
use commands::config::ConfigCommand;
use commands::dashboard::DashboardCommand;
use commands::invoice::InvoiceCommand;
use commands::order::OrderCommand;
use commands::product::ProductCommand;
use commands::receipt::ReceiptCommand;
use commands::stock::StockCommand;
use commands::Output;
use error::CliResult;
use state::{AppConfig, AppState};

/// Inventory, sales, purchasing and repair tickets for a phone repair shop.
#[derive(Debug, Parser)]
#[command(name = "celumax", version, about)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "CELUMAX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inventory
    #[command(subcommand)]
    Product(ProductCommand),
    /// Manual stock movements
    #[command(subcommand)]
    Stock(StockCommand),
    /// Counter sales
    #[command(subcommand)]
    Invoice(InvoiceCommand),
    /// Purchase checklist and orders
    #[command(subcommand)]
    Order(OrderCommand),
    /// Repair tickets
    #[command(subcommand)]
    Receipt(ReceiptCommand),
    /// Today's summary
    #[command(subcommand)]
    Dashboard(DashboardCommand),
    /// Database backups
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Loads the configuration the way `run` sees it.
pub fn load_config(cli: &Cli) -> CliResult<AppConfig> {
    let mut config = AppConfig::load(cli.config.clone())?;
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }
    Ok(config)
}

/// Installs the global subscriber. `RUST_LOG` wins over the config filter.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one command to completion.
pub async fn run(cli: Cli, config: AppConfig) -> CliResult<Output> {
    debug!(command = ?cli.command, "Dispatching command");

    let command = match cli.command {
        Command::Config(cmd) => return commands::config::run(&config, cli.config, cmd),
        other => other,
    };

    let state = AppState::open(config).await?;
    info!("Database ready");

    match command {
        Command::Product(cmd) => commands::product::run(&state, cmd).await,
        Command::Stock(cmd) => commands::stock::run(&state, cmd).await,
        Command::Invoice(cmd) => commands::invoice::run(&state, cmd).await,
        Command::Order(cmd) => commands::order::run(&state, cmd).await,
        Command::Receipt(cmd) => commands::receipt::run(&state, cmd).await,
        Command::Dashboard(cmd) => commands::dashboard::run(&state, cmd).await,
        Command::Backup(cmd) => commands::backup::run(&state, cmd).await,
        Command::Config(cmd) => commands::config::run(&state.config, None, cmd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "celumax",
            "--db",
            "/tmp/shop.db",
            "invoice",
            "create",
            "--client",
            "Ana",
            "--line",
            "p-1:2",
            "--line",
            "p-2:1",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/shop.db")));
        match cli.command {
            Command::Invoice(InvoiceCommand::Create(args)) => {
                assert_eq!(args.lines.len(), 2);
                assert_eq!(args.lines[0].quantity, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["celumax", "order", "line", "check", "l-1", "--off"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Order(OrderCommand::Line {
                cmd: commands::order::LineCommand::Check { off: true, .. }
            })
        ));
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let parsed = Cli::try_parse_from([
            "celumax", "product", "add", "--name", "Pantalla", "--purchase-price", "abc",
            "--sale-price", "100",
        ]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_run_against_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("data").join("celumax.db");
        let cli = Cli::try_parse_from([
            "celumax",
            "--db",
            db.to_str().unwrap(),
            "product",
            "metrics",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        config.database.path = cli.db.clone();
        let output = run(cli, config).await.unwrap();
        match output {
            Output::Json(value) => assert_eq!(value["total_stock"], 0),
            Output::Text(_) => panic!("expected JSON"),
        }
        assert!(db.exists());
    }
}
