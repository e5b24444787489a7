//! Migration and catalog entities

use std::fmt;

use crate::domain::result::Result;
use crate::ports::Database;

/// A migration body: performs one schema change against the database
pub type MigrationAction = Box<dyn Fn(&dyn Database) -> Result<()> + Send + Sync>;

/// A named, one-shot schema change
pub struct Migration {
    name: String,
    sql: Option<String>,
    action: MigrationAction,
}

impl Migration {
    /// Create a migration from an arbitrary action
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&dyn Database) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            sql: None,
            action: Box::new(action),
        }
    }

    /// Create a migration that executes a SQL script as one batch
    pub fn sql(name: impl Into<String>, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let script = sql.clone();
        Self {
            name: name.into(),
            sql: Some(sql),
            action: Box::new(move |db: &dyn Database| db.execute_batch(&script)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// SQL text, for migrations built with [`Migration::sql`]
    pub fn sql_text(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    /// Run the action against a database handle
    pub fn apply(&self, db: &dyn Database) -> Result<()> {
        (self.action)(db)
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("sql", &self.sql.is_some())
            .finish()
    }
}

/// Ordered list of migrations
///
/// Definition order is the only ordering authority: entries are applied in
/// the order they were pushed, never sorted by name.
#[derive(Debug, Default)]
pub struct Catalog {
    migrations: Vec<Migration>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog of SQL migrations from `(name, sql)` pairs
    pub fn from_sql(entries: &[(&str, &str)]) -> Self {
        entries
            .iter()
            .map(|(name, sql)| Migration::sql(*name, *sql))
            .collect()
    }

    /// Append a migration (builder style)
    pub fn with(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Migration> {
        self.migrations.iter()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Names in definition order
    pub fn names(&self) -> Vec<&str> {
        self.migrations.iter().map(Migration::name).collect()
    }

    /// First migration with the given name
    pub fn get(&self, name: &str) -> Option<&Migration> {
        self.migrations.iter().find(|m| m.name == name)
    }
}

impl FromIterator<Migration> for Catalog {
    fn from_iter<I: IntoIterator<Item = Migration>>(iter: I) -> Self {
        Self {
            migrations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Migration;
    type IntoIter = std::slice::Iter<'a, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_keeps_definition_order() {
        let catalog = Catalog::new()
            .with(Migration::new("b_second", |_| Ok(())))
            .with(Migration::new("a_first", |_| Ok(())))
            .with(Migration::sql("c_third", "SELECT 1"));

        assert_eq!(catalog.names(), vec!["b_second", "a_first", "c_third"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_sql_migration_keeps_text() {
        let catalog = Catalog::from_sql(&[("v00", "CREATE TABLE t (id INTEGER)")]);
        let migration = catalog.get("v00").unwrap();
        assert_eq!(migration.sql_text(), Some("CREATE TABLE t (id INTEGER)"));
        assert!(Migration::new("closure", |_| Ok(())).sql_text().is_none());
    }

    #[test]
    fn test_get_missing() {
        let catalog = Catalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.get("nope").is_none());
    }
}
