//! Configuration management
//!
//! Settings live in `settings.json` inside the serpwatch directory:
//! ```json
//! {
//!   "database": {
//!     "url": "duckdb:///var/lib/serpwatch/serpwatch.duckdb",
//!     "historyTable": "migration",
//!     "transactional": false,
//!     "lock": true,
//!     "lockTimeoutMs": 30000
//!   }
//! }
//! ```
//! Environment variables override the file: `DB_CONN_URL`,
//! `SERPWATCH_HISTORY_TABLE`, `SERPWATCH_TRANSACTIONAL`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::HistoryTable;

/// Default database file name inside the serpwatch directory
pub const DEFAULT_DB_FILENAME: &str = "serpwatch.duckdb";

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database: DatabaseSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    history_table: Option<String>,
    #[serde(default)]
    transactional: Option<bool>,
    #[serde(default)]
    lock: Option<bool>,
    #[serde(default)]
    lock_timeout_ms: Option<u64>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string handed to the database adapter
    pub database_url: String,
    pub history_table: HistoryTable,
    /// Wrap each migration and its history record in one transaction
    pub transactional: bool,
    /// Take the file run lock before migrating a file-backed database
    pub lock: bool,
    pub lock_timeout: Duration,
}

impl Config {
    /// Defaults for a serpwatch directory
    pub fn defaults(serpwatch_dir: &Path) -> Self {
        Self {
            database_url: serpwatch_dir.join(DEFAULT_DB_FILENAME).display().to_string(),
            history_table: HistoryTable::default(),
            transactional: false,
            lock: true,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// Load config from the serpwatch directory and the process environment
    pub fn load(serpwatch_dir: &Path) -> Result<Self> {
        Self::load_with_env(serpwatch_dir, |key| std::env::var(key).ok())
    }

    /// Load config with an explicit environment lookup
    pub fn load_with_env<F>(serpwatch_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = Self::settings_path(serpwatch_dir);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("{}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let mut config = Self::defaults(serpwatch_dir);
        let db = raw.database;

        if let Some(url) = env("DB_CONN_URL").or(db.url) {
            config.database_url = url;
        }
        if let Some(table) = env("SERPWATCH_HISTORY_TABLE").or(db.history_table) {
            config.history_table = HistoryTable::new(table)?;
        }
        config.transactional = match env("SERPWATCH_TRANSACTIONAL").as_deref() {
            Some(value) => parse_bool(value).ok_or_else(|| {
                Error::Config(format!("SERPWATCH_TRANSACTIONAL: expected a boolean, got '{}'", value))
            })?,
            None => db.transactional.unwrap_or(false),
        };
        if let Some(lock) = db.lock {
            config.lock = lock;
        }
        if let Some(ms) = db.lock_timeout_ms {
            config.lock_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Save the database settings, preserving nothing else
    pub fn save(&self, serpwatch_dir: &Path) -> Result<()> {
        let settings = SettingsFile {
            database: DatabaseSettings {
                url: Some(self.database_url.clone()),
                history_table: Some(self.history_table.to_string()),
                transactional: Some(self.transactional),
                lock: Some(self.lock),
                lock_timeout_ms: Some(self.lock_timeout.as_millis() as u64),
            },
        };
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(Self::settings_path(serpwatch_dir), content)?;
        Ok(())
    }

    pub fn settings_path(serpwatch_dir: &Path) -> PathBuf {
        serpwatch_dir.join("settings.json")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "TRUE" | "YES" => Some(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Some(false),
        _ => None,
    }
}
