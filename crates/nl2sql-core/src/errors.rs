use crate::agents::Role;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);

/// Failure to build a schema description for one database.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("no database_description folder in {}", dir.display())]
    NotFound { dir: PathBuf },

    #[error("{file} has no original_column_name header")]
    MissingHeader { file: String },

    #[error("missing original_column_name in {file} at row {row}")]
    Malformed { file: String, row: usize },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
}

/// Engine-reported error for a candidate statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{class}: {message}")]
pub struct SqlExecutionError {
    pub message: String,
    pub class: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SqlRunError {
    #[error("database {} does not exist", path.display())]
    DatabaseNotFound { path: PathBuf },

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Execution(#[from] SqlExecutionError),
}

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("{role} agent call failed: {message}")]
    Agent { role: Role, message: String },

    #[error("retry budget exhausted after {attempts} refine attempts: {last_error}")]
    RetryBudgetExhausted {
        attempts: u32,
        last_sql: String,
        last_error: SqlExecutionError,
    },

    #[error(transparent)]
    Database(#[from] SqlRunError),
}

/// A failed solve together with the progress made before it failed.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct SolveFailure {
    pub error: SolveError,
    pub plan: String,
    /// First generated candidate, if generation succeeded.
    pub initial_sql: Option<String>,
    /// Last candidate that reached the database.
    pub last_sql: Option<String>,
    /// Refine cycles completed.
    pub attempts: u32,
}
