//! Space usage tools.
//!
//! This module implements `read_table_space` (perm space per table from
//! `DBC.AllSpaceV`) and `read_database_space` (allocation per database from
//! `DBC.DiskSpaceV`).

use crate::db::{CatalogSession, PlaceholderStyle, QueryBuilder, has_filter};
use crate::error::DbResult;
use crate::models::{Statement, create_response};
use crate::tools::{fetch_records, tool_metadata};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Input for the read_table_space tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ReadTableSpaceInput {
    /// Database to report on. Empty or omitted covers every database.
    #[serde(default)]
    pub db_name: Option<String>,
    /// Table to report on. Empty or omitted covers every table.
    #[serde(default)]
    pub table_name: Option<String>,
}

/// Input for the read_database_space tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ReadDatabaseSpaceInput {
    /// Database to report on. Empty or omitted covers every database with perm space.
    #[serde(default)]
    pub db_name: Option<String>,
}

/// Build the `read_table_space` statement.
///
/// When only the database is given, rows are per table and the
/// `DatabaseName` column is left out.
pub fn table_space_statement(input: &ReadTableSpaceInput, style: PlaceholderStyle) -> Statement {
    let db_name = input.db_name.as_deref();
    let table_name = input.table_name.as_deref();
    let keys: &[&str] = if has_filter(db_name) && !has_filter(table_name) {
        &["TableName"]
    } else {
        &["DatabaseName", "TableName"]
    };

    let columns = keys.iter().copied().chain([
        "SUM(CurrentPerm) AS CurrentPerm1",
        "SUM(PeakPerm) AS PeakPerm",
    ]);

    QueryBuilder::select(columns)
        .from("DBC.AllSpaceV")
        .filter_eq("DatabaseName", db_name)
        .filter_eq("TableName", table_name)
        .group_by(keys.iter().copied())
        .order_by("CurrentPerm1 DESC")
        .build(style)
}

/// Build the `read_database_space` statement.
///
/// Only databases with perm space allocated are reported. The unfiltered
/// variant lists the fullest databases first.
pub fn database_space_statement(
    input: &ReadDatabaseSpaceInput,
    style: PlaceholderStyle,
) -> Statement {
    let db_name = input.db_name.as_deref();
    let builder = QueryBuilder::select([
        "DatabaseName",
        "CAST(SUM(MaxPerm)/1024/1024/1024 AS DECIMAL(10,2)) AS SpaceAllocated_GB",
        "CAST(SUM(CurrentPerm)/1024/1024/1024 AS DECIMAL(10,2)) AS SpaceUsed_GB",
        "CAST((SUM(MaxPerm) - SUM(CurrentPerm))/1024/1024/1024 AS DECIMAL(10,2)) AS FreeSpace_GB",
        "CAST((SUM(CurrentPerm) * 100.0 / NULLIF(SUM(MaxPerm),0)) AS DECIMAL(10,2)) AS PercentUsed",
    ])
    .from("DBC.DiskSpaceV")
    .filter("MaxPerm > 0")
    .filter_eq("DatabaseName", db_name)
    .group_by(["DatabaseName"]);

    if has_filter(db_name) {
        builder.build(style)
    } else {
        builder.order_by("PercentUsed DESC").build(style)
    }
}

pub struct SpaceToolHandler<S> {
    session: S,
}

impl<S: CatalogSession> SpaceToolHandler<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Handle the read_table_space tool call.
    pub async fn read_table_space(&self, input: ReadTableSpaceInput) -> DbResult<String> {
        debug!(
            db_name = ?input.db_name,
            table_name = ?input.table_name,
            "Tool: read_table_space"
        );

        let statement = table_space_statement(&input, self.session.placeholder_style());
        let records = fetch_records(&self.session, &statement).await?;

        info!(tool = "read_table_space", row_count = records.len(), "Tool completed");

        let mut metadata = tool_metadata("read_table_space");
        metadata.insert("db_name".into(), json!(input.db_name));
        metadata.insert("table_name".into(), json!(input.table_name));
        metadata.insert("total_tables".into(), records.len().into());
        create_response(records, Some(metadata))
    }

    /// Handle the read_database_space tool call.
    pub async fn read_database_space(&self, input: ReadDatabaseSpaceInput) -> DbResult<String> {
        debug!(db_name = ?input.db_name, "Tool: read_database_space");

        let statement = database_space_statement(&input, self.session.placeholder_style());
        let records = fetch_records(&self.session, &statement).await?;

        info!(tool = "read_database_space", row_count = records.len(), "Tool completed");

        let mut metadata = tool_metadata("read_database_space");
        metadata.insert("db_name".into(), json!(input.db_name));
        metadata.insert("total_databases".into(), records.len().into());
        create_response(records, Some(metadata))
    }
}
