//! System-level tools: `read_database_version` and `read_resusage_summary`.

use crate::db::{CatalogSession, QueryBuilder};
use crate::error::DbResult;
use crate::models::{Statement, create_response};
use crate::tools::{fetch_records, tool_metadata};
use tracing::{debug, info};

/// Workload summary over the last 30 days of DBQL, by hour, day of week,
/// workload type and complexity bucket.
pub const RESUSAGE_SUMMARY_SQL: &str = include_str!("sql/resusage_summary.sql");

pub const RESUSAGE_SUMMARY_COMMENT: &str = "Total system resource usage summary by type of workload and query complexity bucket. Metrics are computed aggregated at the hour and day of week level.";

pub struct SystemToolHandler<S> {
    session: S,
}

impl<S: CatalogSession> SystemToolHandler<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Handle the read_database_version tool call.
    pub async fn read_database_version(&self) -> DbResult<String> {
        debug!("Tool: read_database_version");

        let statement = QueryBuilder::select(["InfoKey", "InfoData"])
            .from("DBC.DBCInfoV")
            .build(self.session.placeholder_style());
        let records = fetch_records(&self.session, &statement).await?;

        info!(tool = "read_database_version", row_count = records.len(), "Tool completed");

        let mut metadata = tool_metadata("read_database_version");
        metadata.insert("total_rows".into(), records.len().into());
        create_response(records, Some(metadata))
    }

    /// Handle the read_resusage_summary tool call.
    pub async fn read_resusage_summary(&self) -> DbResult<String> {
        debug!("Tool: read_resusage_summary");

        let records = fetch_records(&self.session, &Statement::new(RESUSAGE_SUMMARY_SQL)).await?;

        info!(tool = "read_resusage_summary", row_count = records.len(), "Tool completed");

        let mut metadata = tool_metadata("read_resusage_summary");
        metadata.insert("total_rows".into(), records.len().into());
        metadata.insert("comment".into(), RESUSAGE_SUMMARY_COMMENT.into());
        create_response(records, Some(metadata))
    }
}
