//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The runner and
//! history store depend only on these traits, not on a concrete engine.

mod database;

pub use database::{Database, QueryResult, SqlParam};
