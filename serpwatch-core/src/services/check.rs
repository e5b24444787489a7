//! Catalog check - static lint of a migration catalog
//!
//! The runner trusts its catalog. This check catches the mistakes it would
//! otherwise only discover mid-run: reused names, names the history table
//! cannot hold, and SQL the engine will not parse.

use std::collections::HashMap;

use serde::Serialize;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use crate::domain::history::MAX_NAME_LEN;
use crate::domain::Catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding
#[derive(Debug, Clone, Serialize)]
pub struct CheckIssue {
    pub migration: String,
    pub severity: Severity,
    pub message: String,
}

/// All findings for a catalog
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

/// Validate SQL syntax with the DuckDB dialect
pub fn validate_sql_syntax(sql: &str) -> std::result::Result<usize, String> {
    let dialect = DuckDbDialect {};
    Parser::parse_sql(&dialect, sql)
        .map(|statements| statements.len())
        .map_err(|e| {
            let msg = e.to_string();
            msg.trim_start_matches("sql parser error: ").to_string()
        })
}

/// Lints a catalog
pub struct CatalogCheck;

impl CatalogCheck {
    pub fn run(catalog: &Catalog) -> CheckReport {
        let mut issues = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for (index, migration) in catalog.iter().enumerate() {
            let name = migration.name();
            let mut issue = |severity, message: String| {
                issues.push(CheckIssue {
                    migration: name.to_string(),
                    severity,
                    message,
                })
            };

            if name.trim().is_empty() {
                issue(Severity::Error, format!("entry #{} has an empty name", index));
            }
            if name.chars().count() > MAX_NAME_LEN {
                issue(
                    Severity::Error,
                    format!("name exceeds {} characters and cannot be recorded", MAX_NAME_LEN),
                );
            }
            if let Some(first) = seen.insert(name, index) {
                issue(
                    Severity::Error,
                    format!("name reused at #{} (first defined at #{})", index, first),
                );
            }

            if let Some(sql) = migration.sql_text() {
                match validate_sql_syntax(sql) {
                    Ok(0) => issue(Severity::Warning, "SQL contains no statements".to_string()),
                    Ok(_) => {}
                    Err(e) => issue(Severity::Error, format!("SQL does not parse: {}", e)),
                }
            }
        }

        CheckReport {
            checked: catalog.len(),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Migration;

    #[test]
    fn test_clean_catalog() {
        let catalog = Catalog::from_sql(&[
            ("v00", "CREATE TABLE IF NOT EXISTS t (id INTEGER)"),
            ("v01", "ALTER TABLE t ADD COLUMN c TEXT"),
        ])
        .with(Migration::new("v02", |_| Ok(())));

        let report = CatalogCheck::run(&catalog);
        assert_eq!(report.checked, 3);
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_duplicate_names() {
        let catalog = Catalog::new()
            .with(Migration::new("a", |_| Ok(())))
            .with(Migration::new("b", |_| Ok(())))
            .with(Migration::new("a", |_| Ok(())));

        let report = CatalogCheck::run(&catalog);
        assert!(report.has_errors());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].migration, "a");
        assert!(report.issues[0].message.contains("first defined at #0"));
    }

    #[test]
    fn test_bad_sql_and_long_name() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let catalog = Catalog::new()
            .with(Migration::sql("broken", "CREATE TABLEE t (id INTEGER)"))
            .with(Migration::sql(long.clone(), "SELECT 1"));

        let report = CatalogCheck::run(&catalog);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].migration, "broken");
        assert!(report.issues[0].message.starts_with("SQL does not parse"));
        assert_eq!(report.issues[1].migration, long);
    }

    #[test]
    fn test_empty_sql_is_warning() {
        let catalog = Catalog::from_sql(&[("blank", "  ")]);
        let report = CatalogCheck::run(&catalog);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Warning);
        assert!(!report.has_errors());
    }
}
