//! # Config Commands
//!
//! Inspect and write `celumax.toml`. These run without opening the database.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;
use tracing::debug;

use super::Output;
use crate::error::{CliError, CliResult};
use crate::state::AppConfig;

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Effective configuration (file plus CELUMAX_* overrides)
    Show,
    /// Where the config file and the database live
    Path,
    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PathsDto {
    pub config_file: Option<PathBuf>,
    pub config_file_exists: bool,
    pub database: PathBuf,
    pub backups: PathBuf,
}

pub fn run(config: &AppConfig, config_path: Option<PathBuf>, cmd: ConfigCommand) -> CliResult<Output> {
    let config_path = config_path.or_else(AppConfig::default_config_path);

    match cmd {
        ConfigCommand::Show => {
            debug!("config show command");
            Output::json(config)
        }

        ConfigCommand::Path => Output::json(PathsDto {
            config_file_exists: config_path.as_ref().is_some_and(|p| p.exists()),
            config_file: config_path,
            database: config.database_path()?,
            backups: config.backup.directory.clone(),
        }),

        ConfigCommand::Init { force } => {
            if let Some(path) = &config_path {
                if path.exists() && !force {
                    return Err(CliError::config(format!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    )));
                }
            }
            let written = config.save(config_path)?;
            Output::json(serde_json::json!({ "written": written }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("celumax.toml");
        let config = AppConfig::default();

        run(&config, Some(path.clone()), ConfigCommand::Init { force: false }).unwrap();
        assert!(path.exists());

        let err = run(&config, Some(path.clone()), ConfigCommand::Init { force: false })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);

        run(&config, Some(path), ConfigCommand::Init { force: true }).unwrap();
    }

    #[test]
    fn test_path_reports_locations() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.path = Some(dir.path().join("shop.db"));

        let output = run(
            &config,
            Some(dir.path().join("celumax.toml")),
            ConfigCommand::Path,
        )
        .unwrap();
        match output {
            Output::Json(value) => {
                assert_eq!(value["config_file_exists"], false);
                assert!(value["database"].as_str().unwrap().ends_with("shop.db"));
            }
            Output::Text(_) => panic!("expected JSON"),
        }
    }
}
