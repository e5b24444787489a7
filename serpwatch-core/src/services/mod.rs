//! Service layer - migration orchestration
//!
//! Services coordinate the catalog, the history table and the database
//! port. Each service focuses on one use case.

pub mod check;
pub mod history;
pub mod migration;
mod status;

pub use check::{CatalogCheck, CheckIssue, CheckReport, Severity};
pub use history::HistoryStore;
pub use migration::{MigrationRunner, ProgressFn, RunOptions};
pub use status::{StatusService, StatusSummary};
