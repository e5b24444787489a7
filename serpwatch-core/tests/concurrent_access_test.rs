//! Concurrent run tests
//!
//! Two runs against one database file must not both see a migration as
//! pending. The run lock serializes them, so every action executes once.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use serpwatch_core::adapters::duckdb::DuckDbDatabase;
use serpwatch_core::adapters::lock::RunLock;
use serpwatch_core::config::Config;
use serpwatch_core::domain::HistoryTable;
use serpwatch_core::services::HistoryStore;
use serpwatch_core::{Catalog, Error, MigrateContext, Migration};

/// Number of concurrent runs
const THREAD_COUNT: usize = 4;

/// Catalog whose actions count invocations and hold the lock long enough to
/// create contention
fn slow_catalog(calls: &Arc<AtomicUsize>) -> Catalog {
    ["v00_one", "v01_two", "v02_three"]
        .iter()
        .map(|name| {
            let calls = Arc::clone(calls);
            Migration::new(*name, move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(30));
                Ok(())
            })
        })
        .collect()
}

#[test]
fn test_concurrent_runs_apply_each_migration_once() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::defaults(temp_dir.path());
    config.lock_timeout = Duration::from_secs(30);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let barrier = Arc::clone(&barrier);
        let calls = Arc::clone(&calls);
        let config = config.clone();

        handles.push(thread::spawn(move || {
            let ctx = MigrateContext::new(config, slow_catalog(&calls));
            barrier.wait();

            let outcome = ctx.migrate().expect("lock and open should succeed");
            println!("Thread {}: applied {:?}", thread_id, outcome.applied());
            assert!(outcome.is_success());
            outcome.applied().len()
        }));
    }

    let total_applied: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(calls.load(Ordering::SeqCst), 3, "each action runs exactly once");
    assert_eq!(total_applied, 3);

    let db = DuckDbDatabase::connect(&config.database_url).unwrap();
    let names = HistoryStore::new(&db, HistoryTable::default()).applied_names().unwrap();
    assert_eq!(names, vec!["v00_one", "v01_two", "v02_three"]);
}

#[test]
fn test_run_fails_when_lock_is_held() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::defaults(temp_dir.path());
    config.lock_timeout = Duration::from_millis(100);
    let db_path = temp_dir.path().join("serpwatch.duckdb");

    let _held = RunLock::acquire(&db_path, Duration::from_millis(0)).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = MigrateContext::new(config, slow_catalog(&calls));
    let err = ctx.migrate().unwrap_err();

    assert!(matches!(err, Error::Lock(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_lock_can_be_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::defaults(temp_dir.path());
    config.lock = false;
    let db_path = temp_dir.path().join("serpwatch.duckdb");

    let _held = RunLock::acquire(&db_path, Duration::from_millis(0)).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = MigrateContext::new(config, slow_catalog(&calls));
    let outcome = ctx.migrate().unwrap();

    assert!(outcome.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_progress_reports_each_migration_before_it_runs() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::defaults(temp_dir.path().join("nested").as_path());

    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = MigrateContext::new(config, slow_catalog(&calls));

    // Each name is reported while its action has not yet run
    let seen = std::sync::Mutex::new(Vec::new());
    let progress = |name: &str| {
        seen.lock().unwrap().push((name.to_string(), calls.load(Ordering::SeqCst)));
    };
    let outcome = ctx.migrate_with_progress(&progress).unwrap();

    assert!(outcome.is_success());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("v00_one".to_string(), 0),
            ("v01_two".to_string(), 1),
            ("v02_three".to_string(), 2),
        ]
    );
}
