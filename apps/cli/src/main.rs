//! # Celumax Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  $ celumax <command> ...                                                │
//! │                                                                         │
//! │  stdout  ◄── command output (pretty JSON, or ticket text for `print`)   │
//! │  stderr  ◄── tracing logs, and on failure:                              │
//! │              {"code":"INSUFFICIENT_STOCK","message":"..."}              │
//! │  exit    ◄── 0 on success, 1 on any error                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The setup lives in lib.rs so it can be tested.

use std::process::ExitCode;

use celumax_cli_lib::error::CliError;
use celumax_cli_lib::{init_tracing, load_config, run, Cli};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return report(e),
    };
    init_tracing(&config);

    match run(cli, config).await.and_then(|output| output.render()) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(code = ?e.code, "{}", e.message);
            report(e)
        }
    }
}

fn report(err: CliError) -> ExitCode {
    match serde_json::to_string(&err) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
    ExitCode::FAILURE
}
