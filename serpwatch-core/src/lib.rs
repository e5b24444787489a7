//! serpwatch core - schema migrations for the serpwatch ranking database
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: migrations, the catalog, history records, run outcomes
//! - **ports**: the database handle trait
//! - **services**: history store, migration runner, status, catalog check
//! - **adapters**: DuckDB handle and the file run lock
//! - **migrations**: the bundled SQL catalog

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;

use adapters::duckdb::{DatabaseLocation, DuckDbDatabase};
use adapters::lock::RunLock;
use config::Config;
use services::{
    CatalogCheck, CheckReport, MigrationRunner, ProgressFn, RunOptions, StatusService, StatusSummary,
};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{Catalog, HistoryRecord, Migration, RunFailure, RunOutcome, RunReport, RunStage};
pub use ports::{Database, QueryResult, SqlParam};

/// Main context for migration operations
///
/// Holds the resolved configuration and the catalog; opens the database
/// per operation so a long-lived context never pins the file.
pub struct MigrateContext {
    pub config: Config,
    pub catalog: Catalog,
}

impl MigrateContext {
    pub fn new(config: Config, catalog: Catalog) -> Self {
        Self { config, catalog }
    }

    /// Create the directory holding a file-backed database
    fn prepare_location(&self) -> Result<DatabaseLocation> {
        let location = DatabaseLocation::parse(&self.config.database_url)?;
        if let Some(parent) = location
            .path()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(location)
    }

    fn open_database(&self) -> Result<DuckDbDatabase> {
        self.prepare_location()?;
        DuckDbDatabase::connect(&self.config.database_url)
    }

    /// Apply all pending migrations
    ///
    /// Errors are limited to taking the run lock and opening the database;
    /// everything after that is reported through the [`RunOutcome`].
    pub fn migrate(&self) -> Result<RunOutcome> {
        self.migrate_with_progress(&|_: &str| {})
    }

    /// Apply all pending migrations, reporting each one before it runs
    pub fn migrate_with_progress(&self, on_migrating: ProgressFn<'_>) -> Result<RunOutcome> {
        let location = self.prepare_location()?;
        let _lock = match location.path() {
            Some(path) if self.config.lock => {
                Some(RunLock::acquire(path, self.config.lock_timeout)?)
            }
            _ => None,
        };

        let db = self.open_database()?;
        let options = RunOptions {
            transactional: self.config.transactional,
            history_table: self.config.history_table.clone(),
        };
        Ok(MigrationRunner::with_options(&db, &self.catalog, options)
            .on_migrating(on_migrating)
            .run())
    }

    /// Applied, pending and unknown migrations
    pub fn status(&self) -> Result<StatusSummary> {
        let db = self.open_database()?;
        StatusService::new(&db, self.config.history_table.clone()).get_status(&self.catalog)
    }

    /// Lint the catalog without touching the database
    pub fn check(&self) -> CheckReport {
        CatalogCheck::run(&self.catalog)
    }
}
