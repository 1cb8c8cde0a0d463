//! Database access layer.
//!
//! - `session`: the capability tools run statements through
//! - `builder`: catalog statements with optional bound filters
//! - `pool` / `executor`: sqlx-backed sessions
//! - `types`: decoding of driver rows into `SqlValue`s

pub mod builder;
pub mod executor;
#[macro_use]
pub mod macros;
pub(crate) mod params;
pub mod pool;
pub mod session;
pub mod types;

pub use builder::{PlaceholderStyle, QueryBuilder, has_filter, rewrite_placeholders};
pub use executor::QueryExecutor;
pub use macros::DatabaseType;
pub use pool::DbPool;
pub use session::CatalogSession;
