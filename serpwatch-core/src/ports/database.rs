//! Database port - the handle migrations and the history store run against

use serde::Serialize;

use crate::domain::result::Result;

/// Positional statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::Text(s)
    }
}

impl From<i64> for SqlParam {
    fn from(i: i64) -> Self {
        SqlParam::Int(i)
    }
}

impl From<bool> for SqlParam {
    fn from(b: bool) -> Self {
        SqlParam::Bool(b)
    }
}

/// Rows returned by [`Database::query`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

impl QueryResult {
    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Database handle
///
/// One handle is shared by every statement of a run. Implementations are
/// not expected to support concurrent use; the runner issues one call at a
/// time.
pub trait Database: Send + Sync {
    /// Execute one or more statements, discarding any result
    fn execute_batch(&self, sql: &str) -> Result<()>;

    /// Execute a single statement with positional parameters, returning
    /// the number of affected rows
    fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<usize>;

    /// Run a query and collect its rows
    fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryResult>;

    fn begin(&self) -> Result<()> {
        self.execute_batch("BEGIN TRANSACTION")
    }

    fn commit(&self) -> Result<()> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        self.execute_batch("ROLLBACK")
    }
}
