//! Core domain entities
//!
//! Migrations, the catalog, history records and run outcomes. These are
//! plain data structures; all I/O goes through the [`crate::ports`] traits.

pub mod history;
mod migration;
pub mod outcome;
pub mod result;

pub use history::{HistoryRecord, HistoryTable};
pub use migration::{Catalog, Migration, MigrationAction};
pub use outcome::{RunFailure, RunOutcome, RunReport, RunStage};
