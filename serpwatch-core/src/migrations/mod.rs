//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content), applied in the order
//! listed here. Names are never sorted at runtime.

use crate::domain::Catalog;

/// All migrations of the serpwatch ranking schema, embedded at compile time.
/// Format: (name, sql_content)
///
/// IMPORTANT: When adding a new migration:
/// 1. Create the SQL file: vNN_description.sql
/// 2. Append an entry at the END of this list
/// 3. Prefer IF NOT EXISTS forms so a failed run can be retried
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("v01_create_category_info", include_str!("v01_create_category_info.sql")),
    ("v01_remove_not_null", include_str!("v01_remove_not_null.sql")),
    ("v02_set_created_at_default", include_str!("v02_set_created_at_default.sql")),
    ("v03_create_query_location", include_str!("v03_create_query_location.sql")),
    ("v04_create_query_item", include_str!("v04_create_query_item.sql")),
    (
        "v05_add_zenserp_batch_id_to_query_job",
        include_str!("v05_add_zenserp_batch_id_to_query_job.sql"),
    ),
    ("v06_update_num_to_text", include_str!("v06_update_num_to_text.sql")),
    (
        "v06_add_zenserp_batch_processed",
        include_str!("v06_add_zenserp_batch_processed.sql"),
    ),
    (
        "v07_add_error_processing_bool_to_query_item",
        include_str!("v07_add_error_processing_bool_to_query_item.sql"),
    ),
    (
        "v08_remove_not_null_query_item_body",
        include_str!("v08_remove_not_null_query_item_body.sql"),
    ),
    ("v09_create_link", include_str!("v09_create_link.sql")),
    ("v10_update_text_to_text", include_str!("v10_update_text_to_text.sql")),
    ("v11_query_jobs_created_at_idx", include_str!("v11_query_jobs_created_at_idx.sql")),
    ("v12_add_query_item_idx", include_str!("v12_add_query_item_idx.sql")),
    ("v13_add_query_item_id_idx", include_str!("v13_add_query_item_id_idx.sql")),
];

/// The bundled catalog
pub fn catalog() -> Catalog {
    Catalog::from_sql(MIGRATIONS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbDatabase;
    use crate::ports::Database;
    use crate::services::{CatalogCheck, MigrationRunner};

    #[test]
    fn test_bundled_catalog_passes_check() {
        let report = CatalogCheck::run(&catalog());
        assert_eq!(report.checked, MIGRATIONS.len());
        assert!(!report.has_errors(), "{:?}", report.issues);
    }

    #[test]
    fn test_bundled_names_match_recorded_history() {
        // Databases migrated by earlier deployments hold these names
        let names = catalog().names().into_iter().map(str::to_string).collect::<Vec<_>>();
        assert_eq!(names.first().map(String::as_str), Some("v01_create_category_info"));
        assert_eq!(names.last().map(String::as_str), Some("v13_add_query_item_id_idx"));
        assert!(names.iter().all(|n| !n.starts_with("v00_")));
    }

    #[test]
    fn test_bundled_catalog_applies_on_fresh_db() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let catalog = catalog();

        let outcome = MigrationRunner::new(&db, &catalog).run();
        if let Some(failure) = outcome.failure() {
            panic!("{}", failure);
        }
        assert_eq!(outcome.applied().len(), MIGRATIONS.len());

        db.execute_batch(
            "INSERT INTO query_job (keyword) VALUES ('rust migrations');
             INSERT INTO link (query_item_id, text, url)
             VALUES (gen_random_uuid(), 'docs', 'https://example.com')",
        )
        .unwrap();
        let result = db
            .query("SELECT zenserp_batch_processed, completed_at FROM query_job", &[])
            .unwrap();
        assert_eq!(result.rows[0][0], serde_json::json!(false));
        assert!(result.rows[0][1].is_null());
    }
}
