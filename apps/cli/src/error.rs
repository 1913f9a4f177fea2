//! # CLI Error Type
//!
//! Unified error type for commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the CLI                                │
//! │                                                                         │
//! │  Command Function                                                       │
//! │  CliResult<T>                                                           │
//! │         │                                                               │
//! │         ├── DbError::NotFound ─────────────► NOT_FOUND                  │
//! │         ├── CoreError::InsufficientStock ──► INSUFFICIENT_STOCK         │
//! │         ├── CoreError::InvalidStateTransition ► INVALID_STATE           │
//! │         ├── ValidationError ───────────────► VALIDATION_ERROR           │
//! │         ├── BackupError ───────────────────► BACKUP_ERROR               │
//! │         └── anything else ─────────────────► DATABASE_ERROR / INTERNAL  │
//! │                                                                         │
//! │  main() prints it as JSON on stderr and exits with status 1:            │
//! │  {"code":"INSUFFICIENT_STOCK","message":"Insufficient stock ..."}       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use celumax_backup::BackupError;
use celumax_core::{CoreError, ValidationError};
use celumax_db::DbError;
use serde::Serialize;

pub type CliResult<T> = Result<T, CliError>;

/// Error reported to the user.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: 7f1c..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    /// Machine-readable error code for scripts
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientStock,
    /// Receipt state change that is not one step forward
    InvalidState,
    /// Record still referenced (e.g. product on an invoice)
    InUse,
    EmptyInvoice,
    NothingToReceive,
    DatabaseError,
    BackupError,
    ConfigError,
    Internal,
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CliError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ValidationError, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ConfigError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InvalidStateTransition { .. } => ErrorCode::InvalidState,
            CoreError::EmptyInvoice => ErrorCode::EmptyInvoice,
            CoreError::NothingToReceive => ErrorCode::NothingToReceive,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        CliError::new(code, err.to_string())
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::validation(err.to_string())
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CliError::not_found(&entity, &id),
            DbError::Domain(e) => e.into(),
            DbError::UniqueViolation { .. } => CliError::validation(err.to_string()),
            DbError::ForeignKeyViolation { message } => {
                tracing::debug!("Foreign key violation: {}", message);
                CliError::new(
                    ErrorCode::InUse,
                    "Record is still referenced (e.g. a product used on an invoice)",
                )
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                CliError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            other => {
                tracing::error!("Database error: {}", other);
                CliError::new(ErrorCode::DatabaseError, other.to_string())
            }
        }
    }
}

impl From<BackupError> for CliError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::Database(e) => e.into(),
            BackupError::InvalidConfig(msg) => CliError::config(msg),
            BackupError::BackupNotFound(name) => CliError::not_found("Backup", &name),
            other => CliError::new(ErrorCode::BackupError, other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::internal(format!("I/O error: {}", err))
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::config(format!("Invalid config file: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::config(format!("Could not write config: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(format!("JSON error: {}", err))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for CliError {}
