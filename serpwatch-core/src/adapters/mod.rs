//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Database port
//! - fs2 file locks for serializing runs against one database file

pub mod duckdb;
pub mod lock;
