//! Status service - read-only view of applied and pending migrations

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{Catalog, HistoryRecord, HistoryTable};
use crate::ports::Database;
use crate::services::history::HistoryStore;

/// Migration status summary
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub history_table: String,
    /// Whether the history table exists yet
    pub initialized: bool,
    /// Applied records, oldest first
    pub applied: Vec<HistoryRecord>,
    /// Catalog names not yet applied, in catalog order
    pub pending: Vec<String>,
    /// Recorded names that the catalog no longer knows about
    pub unknown: Vec<String>,
}

/// Service for reporting migration status
///
/// Never creates the history table; a fresh database reports every catalog
/// entry as pending.
pub struct StatusService<'a> {
    db: &'a dyn Database,
    table: HistoryTable,
}

impl<'a> StatusService<'a> {
    pub fn new(db: &'a dyn Database, table: HistoryTable) -> Self {
        Self { db, table }
    }

    pub fn get_status(&self, catalog: &Catalog) -> Result<StatusSummary> {
        let history = HistoryStore::new(self.db, self.table.clone());
        let initialized = history.exists()?;
        let applied = if initialized {
            history.records()?
        } else {
            Vec::new()
        };

        let applied_names: HashSet<&str> = applied.iter().map(|r| r.name.as_str()).collect();
        let catalog_names: HashSet<&str> = catalog.names().into_iter().collect();

        let pending = catalog
            .iter()
            .map(|m| m.name())
            .filter(|name| !applied_names.contains(name))
            .map(str::to_string)
            .collect();
        let unknown = applied
            .iter()
            .map(|r| r.name.as_str())
            .filter(|name| !catalog_names.contains(name))
            .map(str::to_string)
            .collect();

        Ok(StatusSummary {
            history_table: self.table.to_string(),
            initialized,
            applied,
            pending,
            unknown,
        })
    }
}
