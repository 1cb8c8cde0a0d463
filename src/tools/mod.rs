//! DBA diagnostic tools.
//!
//! - `query_log`: `read_sql_list`
//! - `space`: `read_table_space`, `read_database_space`
//! - `system`: `read_database_version`, `read_resusage_summary`
//!
//! Every tool builds one statement, runs it through a [`CatalogSession`],
//! normalizes the rows and returns the JSON envelope as text. Session
//! errors are returned unchanged.

pub mod query_log;
pub mod space;
pub mod system;

pub use query_log::{QueryLogToolHandler, ReadSqlListInput};
pub use space::{ReadDatabaseSpaceInput, ReadTableSpaceInput, SpaceToolHandler};
pub use system::{RESUSAGE_SUMMARY_COMMENT, RESUSAGE_SUMMARY_SQL, SystemToolHandler};

use crate::db::CatalogSession;
use crate::error::DbResult;
use crate::models::{Metadata, Record, Statement};

/// Execute `statement` and normalize every row into a record.
pub(crate) async fn fetch_records<S: CatalogSession>(
    session: &S,
    statement: &Statement,
) -> DbResult<Vec<Record>> {
    Ok(session.fetch_all(statement).await?.into_records())
}

/// Metadata map starting with `tool_name`.
pub(crate) fn tool_metadata(tool_name: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("tool_name".into(), tool_name.into());
    metadata
}
