use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Maximum length of a migration name, matching the `VARCHAR(100)` column
pub const MAX_NAME_LEN: usize = 100;

/// Default name of the history table
pub const DEFAULT_HISTORY_TABLE: &str = "migration";

/// One applied migration as stored in the history table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub name: String,
    pub applied_at: Option<NaiveDateTime>,
}

/// Validated name of the history table
///
/// The name is interpolated into DDL, so only plain identifiers
/// (`[A-Za-z_][A-Za-z0-9_]*`, up to 63 characters) are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTable(String);

impl HistoryTable {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_start || !valid_rest || name.len() > 63 {
            return Err(Error::validation(format!(
                "invalid history table name '{}': expected a plain SQL identifier",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self(DEFAULT_HISTORY_TABLE.to_string())
    }
}

impl std::fmt::Display for HistoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
