//! Executes candidate SQL against the benchmark SQLite files.
//!
//! Each call opens its own read-only connection which is closed before the
//! call returns, whatever the outcome.

use crate::errors::{SqlExecutionError, SqlRunError};
use crate::model::ExecutionOutcome;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Set when `max_rows` cut the result short.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct SqlRunner {
    root: PathBuf,
}

impl SqlRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<db_id>/<db_id>.sqlite`
    pub fn db_path(&self, db_id: &str) -> PathBuf {
        self.root.join(db_id).join(format!("{}.sqlite", db_id))
    }

    /// Runs `sql` to completion and reports only whether the engine accepted it.
    pub fn validate(&self, db_id: &str, sql: &str) -> Result<ExecutionOutcome, SqlRunError> {
        let conn = self.open(db_id)?;
        let outcome = match step_all(&conn, sql, |_| Ok(())) {
            Ok(()) => ExecutionOutcome::Success,
            Err(e) => ExecutionOutcome::Failure(execution_error(&e)),
        };
        close(conn);
        Ok(outcome)
    }

    /// Ad-hoc execution returning the rows, capped at `max_rows` when given.
    pub fn run_sql(
        &self,
        db_id: &str,
        sql: &str,
        max_rows: Option<usize>,
    ) -> Result<QueryRows, SqlRunError> {
        let conn = self.open(db_id)?;
        let result = collect_rows(&conn, sql, max_rows);
        close(conn);
        result.map_err(|e| SqlRunError::Execution(execution_error(&e)))
    }

    fn open(&self, db_id: &str) -> Result<Connection, SqlRunError> {
        let path = self.db_path(db_id);
        if !path.is_file() {
            return Err(SqlRunError::DatabaseNotFound { path });
        }
        open_read_only(&path).map_err(|source| SqlRunError::Open { path, source })
    }
}

fn open_read_only(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

fn close(conn: Connection) {
    if let Err((_conn, e)) = conn.close() {
        tracing::warn!(error = %e, "failed to close sqlite connection cleanly");
    }
}

fn step_all<F>(conn: &Connection, sql: &str, mut on_row: F) -> rusqlite::Result<()>
where
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<()>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        on_row(row)?;
    }
    Ok(())
}

fn collect_rows(
    conn: &Connection,
    sql: &str,
    max_rows: Option<usize>,
) -> rusqlite::Result<QueryRows> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut out = Vec::new();
    let mut truncated = false;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        if max_rows.is_some_and(|m| out.len() >= m) {
            truncated = true;
            break;
        }
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(value_to_json(row.get_ref(i)?));
        }
        out.push(values);
    }

    Ok(QueryRows {
        columns,
        rows: out,
        truncated,
    })
}

fn value_to_json(v: ValueRef<'_>) -> serde_json::Value {
    match v {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::json!(i),
        ValueRef::Real(f) => serde_json::json!(f),
        ValueRef::Text(t) => serde_json::json!(String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => serde_json::json!(hex::encode(b)),
    }
}

/// Engine message plus a DB-API style class name for the refiner prompt.
pub fn execution_error(e: &rusqlite::Error) -> SqlExecutionError {
    let message = match e {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
        rusqlite::Error::SqliteFailure(err, None) => err.to_string(),
        rusqlite::Error::SqlInputError { msg, .. } => msg.clone(),
        other => other.to_string(),
    };
    SqlExecutionError {
        message,
        class: error_class(e).to_string(),
    }
}

pub fn error_class(e: &rusqlite::Error) -> &'static str {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => match err.code {
            ErrorCode::ConstraintViolation => "IntegrityError",
            ErrorCode::TypeMismatch | ErrorCode::TooBig => "DataError",
            ErrorCode::InternalMalfunction | ErrorCode::NotFound => "InternalError",
            ErrorCode::ApiMisuse => "ProgrammingError",
            ErrorCode::NotADatabase => "DatabaseError",
            _ => "OperationalError",
        },
        rusqlite::Error::SqlInputError { .. } => "OperationalError",
        rusqlite::Error::MultipleStatement
        | rusqlite::Error::InvalidParameterCount(..)
        | rusqlite::Error::InvalidQuery => "ProgrammingError",
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::Utf8Error(..) => "DataError",
        _ => "DatabaseError",
    }
}
