//! Teradata DBA diagnostic tools.
//!
//! Read-only queries against the DBC catalog views (query log, space usage,
//! version, workload summary), normalized into records and returned as a
//! uniform JSON envelope. Tools run over any [`CatalogSession`]; a pooled
//! sqlx session is provided for MySQL, PostgreSQL and SQLite mirrors.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod tools;

pub use config::{LogConfig, SessionConfig};
pub use db::{CatalogSession, QueryExecutor};
pub use error::{DbError, DbResult};
pub use models::{Envelope, SqlValue, create_response, rows_to_records};
