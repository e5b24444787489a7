//! Migration runner - applies pending catalog entries in definition order
//!
//! A run ensures the history table, diffs the catalog against the recorded
//! names and applies each pending migration followed by its history record.
//! The first failure stops the run; nothing after it is attempted.

use std::collections::HashSet;

use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Catalog, HistoryTable, Migration, RunFailure, RunOutcome, RunReport, RunStage};
use crate::ports::Database;
use crate::services::history::HistoryStore;

/// Per-run behaviour switches
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Wrap each migration and its history record in one transaction
    ///
    /// Actions that issue their own `BEGIN`/`COMMIT` fail in this mode:
    /// DuckDB does not nest transactions.
    pub transactional: bool,
    /// History table name
    pub history_table: HistoryTable,
}

/// Called with each migration name just before its action runs
pub type ProgressFn<'a> = &'a dyn Fn(&str);

/// Runs a catalog against one database handle
pub struct MigrationRunner<'a> {
    db: &'a dyn Database,
    catalog: &'a Catalog,
    options: RunOptions,
    on_migrating: Option<ProgressFn<'a>>,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(db: &'a dyn Database, catalog: &'a Catalog) -> Self {
        Self::with_options(db, catalog, RunOptions::default())
    }

    pub fn with_options(db: &'a dyn Database, catalog: &'a Catalog, options: RunOptions) -> Self {
        Self {
            db,
            catalog,
            options,
            on_migrating: None,
        }
    }

    /// Report each pending migration before it is applied
    pub fn on_migrating(mut self, progress: ProgressFn<'a>) -> Self {
        self.on_migrating = Some(progress);
        self
    }

    fn history(&self) -> HistoryStore<'a> {
        HistoryStore::new(self.db, self.options.history_table.clone())
    }

    /// Apply every pending migration
    ///
    /// Never returns an error: failures come back as [`RunOutcome::Failed`]
    /// so the caller decides the exit behaviour.
    pub fn run(&self) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("migration_run", %run_id, table = %self.options.history_table);
        let _guard = span.enter();

        info!(catalog = self.catalog.len(), "running migrations");
        let history = self.history();

        let fail = |stage: RunStage, migration: Option<&str>, error: Error, applied: Vec<String>| {
            let failure = RunFailure {
                run_id,
                stage,
                migration: migration.map(str::to_string),
                error,
                applied,
            };
            warn!(stage = %failure.stage, "{}", failure);
            RunOutcome::Failed(failure)
        };

        debug!("ensuring history table");
        if let Err(e) = history.ensure() {
            return fail(RunStage::EnsuringHistory, None, e, Vec::new());
        }

        debug!("reading applied migrations");
        let previously_applied = match history.applied_names() {
            Ok(names) => names,
            Err(e) => return fail(RunStage::Diffing, None, e, Vec::new()),
        };
        let applied_set: HashSet<&str> = previously_applied.iter().map(String::as_str).collect();

        let mut applied = Vec::new();
        for (index, migration) in self.catalog.iter().enumerate() {
            if applied_set.contains(migration.name()) {
                continue;
            }

            info!(migration = migration.name(), "migrating");
            if let Some(progress) = self.on_migrating {
                progress(migration.name());
            }
            if let Err(e) = self.apply_one(&history, migration) {
                return fail(RunStage::Applying { index }, Some(migration.name()), e, applied);
            }
            applied.push(migration.name().to_string());
        }

        info!(
            applied = applied.len(),
            already_applied = previously_applied.len(),
            "migrations complete"
        );
        RunOutcome::Done(RunReport {
            run_id,
            applied,
            previously_applied,
        })
    }

    fn apply_one(&self, history: &HistoryStore<'_>, migration: &Migration) -> Result<()> {
        if !self.options.transactional {
            migration.apply(self.db).map_err(Error::into_migration)?;
            return history.record(migration.name());
        }

        self.db.begin().map_err(Error::into_storage)?;
        let result = migration
            .apply(self.db)
            .map_err(Error::into_migration)
            .and_then(|()| history.record(migration.name()))
            .and_then(|()| self.db.commit().map_err(Error::into_storage));

        if result.is_err() {
            if let Err(e) = self.db.rollback() {
                warn!(migration = migration.name(), error = %e, "rollback failed");
            }
        }
        result
    }

    /// Catalog names not yet recorded, in catalog order (read-only)
    pub fn pending(&self) -> Result<Vec<String>> {
        let history = self.history();
        let applied: HashSet<String> = if history.exists()? {
            history.applied_names()?.into_iter().collect()
        } else {
            HashSet::new()
        };

        Ok(self
            .catalog
            .iter()
            .filter(|m| !applied.contains(m.name()))
            .map(|m| m.name().to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbDatabase;

    fn catalog_ab() -> Catalog {
        Catalog::new()
            .with(Migration::sql("a", "CREATE TABLE IF NOT EXISTS t (id INTEGER)"))
            .with(Migration::sql("b", "ALTER TABLE t ADD COLUMN IF NOT EXISTS c VARCHAR"))
    }

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = catalog_ab();
        let runner = MigrationRunner::new(&db, &catalog);

        let outcome = runner.run();
        assert!(outcome.is_success());
        assert_eq!(outcome.applied(), ["a", "b"]);

        // Running again should apply nothing
        match runner.run() {
            RunOutcome::Done(report) => {
                assert!(report.applied.is_empty());
                assert_eq!(report.already_applied(), 2);
            }
            RunOutcome::Failed(f) => panic!("unexpected failure: {}", f),
        }
    }

    #[test]
    fn test_get_pending_on_fresh_db() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = catalog_ab();
        let runner = MigrationRunner::new(&db, &catalog);

        assert_eq!(runner.pending().unwrap(), vec!["a", "b"]);
        // pending() must not create the history table
        assert!(!HistoryStore::new(&db, HistoryTable::default()).exists().unwrap());

        runner.run();
        assert!(runner.pending().unwrap().is_empty());
    }

    #[test]
    fn test_failure_is_migration_error() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = catalog_ab().with(Migration::sql("c", "ALTER TABLE missing ADD COLUMN x INTEGER"));

        let outcome = MigrationRunner::new(&db, &catalog).run();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.migration.as_deref(), Some("c"));
        assert_eq!(failure.stage, RunStage::Applying { index: 2 });
        assert!(matches!(failure.error, Error::Migration(_)));
        assert_eq!(failure.applied, vec!["a", "b"]);
    }

    #[test]
    fn test_transactional_failure_leaves_no_partial_change() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = Catalog::new().with(Migration::new("two_steps", |db| {
            db.execute_batch("CREATE TABLE half_done (id INTEGER)")?;
            db.execute_batch("ALTER TABLE nope ADD COLUMN x INTEGER")
        }));
        let options = RunOptions {
            transactional: true,
            ..RunOptions::default()
        };

        let outcome = MigrationRunner::with_options(&db, &catalog, options).run();
        assert!(!outcome.is_success());
        assert!(db.query("SELECT * FROM half_done", &[]).is_err());

        let history = HistoryStore::new(&db, HistoryTable::default());
        assert!(history.applied_names().unwrap().is_empty());
    }

    #[test]
    fn test_transaction_start_failure_is_storage_error() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = catalog_ab();
        let options = RunOptions {
            transactional: true,
            ..RunOptions::default()
        };
        HistoryStore::new(&db, HistoryTable::default()).ensure().unwrap();
        db.begin().unwrap();

        let outcome = MigrationRunner::with_options(&db, &catalog, options).run();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.migration.as_deref(), Some("a"));
        assert!(matches!(failure.error, Error::Storage(_)));
    }

    #[test]
    fn test_own_transaction_fails_in_transactional_mode() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = Catalog::new().with(Migration::sql(
            "self_managed",
            "BEGIN TRANSACTION; CREATE TABLE t (id INTEGER); COMMIT;",
        ));
        let options = RunOptions {
            transactional: true,
            ..RunOptions::default()
        };

        let outcome = MigrationRunner::with_options(&db, &catalog, options).run();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.migration.as_deref(), Some("self_managed"));
        assert!(matches!(failure.error, Error::Migration(_)));
        assert!(HistoryStore::new(&db, HistoryTable::default())
            .applied_names()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_progress_reported_before_each_action() {
        use std::sync::Mutex;

        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = catalog_ab().with(Migration::sql("c", "ALTER TABLE missing ADD COLUMN x INTEGER"));
        let seen = Mutex::new(Vec::new());
        let progress = |name: &str| seen.lock().unwrap().push(name.to_string());

        let outcome = MigrationRunner::new(&db, &catalog).on_migrating(&progress).run();
        assert!(!outcome.is_success());
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);

        // Applied migrations are not reported again
        seen.lock().unwrap().clear();
        MigrationRunner::new(&db, &catalog).on_migrating(&progress).run();
        assert_eq!(*seen.lock().unwrap(), vec!["c"]);
    }

    #[test]
    fn test_pending_ignores_history_table_in_other_schema() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        db.execute_batch("CREATE SCHEMA audit; CREATE TABLE audit.migration (x INTEGER)")
            .unwrap();
        let catalog = catalog_ab();

        assert_eq!(MigrationRunner::new(&db, &catalog).pending().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_non_transactional_failure_keeps_partial_change() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = Catalog::new().with(Migration::new("two_steps", |db| {
            db.execute_batch("CREATE TABLE half_done (id INTEGER)")?;
            db.execute_batch("ALTER TABLE nope ADD COLUMN x INTEGER")
        }));

        let outcome = MigrationRunner::new(&db, &catalog).run();
        assert!(!outcome.is_success());
        assert!(db.query("SELECT * FROM half_done", &[]).is_ok());
    }
}
