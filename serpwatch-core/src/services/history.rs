//! History store - the bookkeeping table of applied migrations
//!
//! Every failure here surfaces as [`Error::Storage`], whatever the engine
//! reported.

use chrono::{NaiveDateTime, Utc};

use crate::domain::history::MAX_NAME_LEN;
use crate::domain::result::{Error, Result};
use crate::domain::{HistoryRecord, HistoryTable};
use crate::ports::{Database, SqlParam};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Reads and appends history records through a database handle
pub struct HistoryStore<'a> {
    db: &'a dyn Database,
    table: HistoryTable,
}

impl<'a> HistoryStore<'a> {
    pub fn new(db: &'a dyn Database, table: HistoryTable) -> Self {
        Self { db, table }
    }

    pub fn table(&self) -> &HistoryTable {
        &self.table
    }

    /// Create the history table if it does not exist
    pub fn ensure(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                applied_at TIMESTAMP DEFAULT current_timestamp,
                name       VARCHAR({}) NOT NULL
            )",
            self.table, MAX_NAME_LEN
        );
        self.db.execute_batch(&sql).map_err(Error::into_storage)
    }

    /// Check if the history table exists in the current schema, without creating it
    pub fn exists(&self) -> Result<bool> {
        let result = self
            .db
            .query(
                "SELECT COUNT(*) FROM information_schema.tables
                 WHERE table_name = ? AND table_schema = current_schema()",
                &[SqlParam::from(self.table.as_str())],
            )
            .map_err(Error::into_storage)?;

        let count = result
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Ok(count > 0)
    }

    /// Applied migration names, oldest first
    pub fn applied_names(&self) -> Result<Vec<String>> {
        Ok(self.records()?.into_iter().map(|r| r.name).collect())
    }

    /// Applied records, oldest first; ties on `applied_at` keep insertion order
    pub fn records(&self) -> Result<Vec<HistoryRecord>> {
        let sql = format!(
            "SELECT name, CAST(applied_at AS VARCHAR) AS applied_at_text
             FROM {}
             ORDER BY applied_at, rowid",
            self.table
        );
        let result = self.db.query(&sql, &[]).map_err(Error::into_storage)?;

        result
            .rows
            .iter()
            .map(|row| {
                let name = row
                    .first()
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        Error::storage(format!("history table {} has a row without a name", self.table))
                    })?
                    .to_string();
                let applied_at = row.get(1).and_then(|v| v.as_str()).and_then(parse_timestamp);
                Ok(HistoryRecord { name, applied_at })
            })
            .collect()
    }

    /// Append a record for `name`, stamped with the current time
    ///
    /// No uniqueness check: callers only record names that were pending.
    pub fn record(&self, name: &str) -> Result<()> {
        if name.chars().count() > MAX_NAME_LEN {
            return Err(Error::storage(format!(
                "migration name '{}' exceeds {} characters",
                name, MAX_NAME_LEN
            )));
        }

        let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
        let sql = format!(
            "INSERT INTO {} (name, applied_at) VALUES (?, CAST(? AS TIMESTAMP))",
            self.table
        );
        self.db
            .execute(&sql, &[SqlParam::from(name), SqlParam::Text(now)])
            .map_err(Error::into_storage)?;
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()
}
