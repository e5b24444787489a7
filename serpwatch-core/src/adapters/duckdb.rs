//! DuckDB database adapter

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use duckdb::types::{Value, ValueRef};
use duckdb::{params_from_iter, Connection};

use crate::domain::result::{Error, Result};
use crate::ports::{Database, QueryResult, SqlParam};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
        || lower.contains("file is already open")
}

/// Where the database lives, parsed from a connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    InMemory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parse a connection string
    ///
    /// Accepts `:memory:` (or an empty string), `duckdb://<path>`,
    /// `duckdb:<path>`, or a bare filesystem path.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let path = url
            .strip_prefix("duckdb://")
            .or_else(|| url.strip_prefix("duckdb:"))
            .unwrap_or(url);

        if path.is_empty() || path == ":memory:" {
            return Ok(Self::InMemory);
        }
        if path.contains("://") {
            return Err(Error::Config(format!(
                "unsupported connection string '{}': expected a DuckDB path or :memory:",
                url
            )));
        }
        Ok(Self::File(PathBuf::from(path)))
    }

    /// Path of the database file, if file-backed
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::InMemory => None,
            Self::File(path) => Some(path),
        }
    }
}

/// DuckDB-backed [`Database`] handle
pub struct DuckDbDatabase {
    conn: Mutex<Connection>,
    location: DatabaseLocation,
}

impl DuckDbDatabase {
    /// Open the database identified by a connection string
    pub fn connect(url: &str) -> Result<Self> {
        match DatabaseLocation::parse(url)? {
            DatabaseLocation::InMemory => Self::open_in_memory(),
            DatabaseLocation::File(path) => Self::open(&path),
        }
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: DatabaseLocation::InMemory,
        })
    }

    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process holds the database open.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        location: DatabaseLocation::File(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    // Non-retryable error or max retries reached
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off: cached extensions can fail code signing on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("connection lock poisoned: {}", e)))
    }
}

impl Database for DuckDbDatabase {
    fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<usize> {
        let conn = self.lock()?;
        let affected = conn.execute(sql, params_from_iter(params.iter().map(to_value)))?;
        Ok(affected)
    }

    fn query(&self, sql: &str, params: &[SqlParam]) -> Result<QueryResult> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut result_rows = stmt.query(params_from_iter(params.iter().map(to_value)))?;

        let mut rows: Vec<Vec<serde_json::Value>> = Vec::new();
        let mut column_count = 0;

        while let Some(row) = result_rows.next()? {
            if rows.is_empty() {
                column_count = row.as_ref().column_count();
            }
            let row_values = (0..column_count).map(|i| column_value(row, i)).collect();
            rows.push(row_values);
        }

        // Release the borrow on stmt before reading column names
        drop(result_rows);

        let count = if column_count > 0 {
            column_count
        } else {
            stmt.column_count()
        };
        let columns = (0..count)
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        let row_count = rows.len();
        Ok(QueryResult {
            columns,
            rows,
            row_count,
        })
    }
}

fn to_value(param: &SqlParam) -> Value {
    match param {
        SqlParam::Null => Value::Null,
        SqlParam::Bool(b) => Value::Boolean(*b),
        SqlParam::Int(i) => Value::BigInt(*i),
        SqlParam::Text(s) => Value::Text(s.clone()),
    }
}

fn column_value(row: &duckdb::Row, idx: usize) -> serde_json::Value {
    match row.get_ref(idx) {
        Ok(ValueRef::Null) => serde_json::Value::Null,
        Ok(ValueRef::Boolean(b)) => serde_json::Value::Bool(b),
        Ok(ValueRef::TinyInt(i)) => serde_json::json!(i),
        Ok(ValueRef::SmallInt(i)) => serde_json::json!(i),
        Ok(ValueRef::Int(i)) => serde_json::json!(i),
        Ok(ValueRef::BigInt(i)) => serde_json::json!(i),
        Ok(ValueRef::HugeInt(i)) => serde_json::json!(i.to_string()),
        Ok(ValueRef::UTinyInt(i)) => serde_json::json!(i),
        Ok(ValueRef::USmallInt(i)) => serde_json::json!(i),
        Ok(ValueRef::UInt(i)) => serde_json::json!(i),
        Ok(ValueRef::UBigInt(i)) => serde_json::json!(i),
        Ok(ValueRef::Float(f)) => serde_json::json!(f),
        Ok(ValueRef::Double(f)) => serde_json::json!(f),
        Ok(ValueRef::Decimal(d)) => serde_json::Value::String(d.to_string()),
        Ok(ValueRef::Text(bytes)) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        Ok(ValueRef::Blob(bytes)) => {
            serde_json::Value::String(format!("<blob {} bytes>", bytes.len()))
        }
        Ok(ValueRef::Timestamp(_, ts)) => {
            // Microseconds since epoch
            let dt = chrono::DateTime::from_timestamp_micros(ts)
                .map(|dt| dt.naive_utc().to_string())
                .unwrap_or_else(|| ts.to_string());
            serde_json::Value::String(dt)
        }
        _ => serde_json::Value::Null,
    }
}
