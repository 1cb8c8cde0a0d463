//! Query log tool.
//!
//! This module implements `read_sql_list`: recent SQL text from the DBQL
//! views, newest first.

use crate::config::DEFAULT_SQL_LIST_DAYS;
use crate::db::{CatalogSession, PlaceholderStyle, QueryBuilder};
use crate::error::DbResult;
use crate::models::{Statement, create_response};
use crate::tools::{fetch_records, tool_metadata};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Input for the read_sql_list tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ReadSqlListInput {
    /// Only return queries run by this user. Empty or omitted returns all users.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Number of days of query log to return. Default: 7. A negative window
    /// lies in the future and matches no rows.
    #[serde(default)]
    pub no_days: Option<i64>,
}

/// Build the `read_sql_list` statement.
///
/// The day window is bound as given; the database evaluates it.
pub fn sql_list_statement(input: &ReadSqlListInput, style: PlaceholderStyle) -> Statement {
    let no_days = input.no_days.unwrap_or(DEFAULT_SQL_LIST_DAYS);

    QueryBuilder::select([
        "t1.QueryID",
        "t1.ProcID",
        "t1.CollectTimeStamp",
        "t1.SqlTextInfo",
        "t2.UserName",
    ])
    .from("DBC.QryLogSqlV t1\nJOIN DBC.QryLogV t2\nON t1.QueryID = t2.QueryID")
    .filter_bound(
        "t1.CollectTimeStamp >= CURRENT_TIMESTAMP - CAST(? AS INTERVAL DAY(4))",
        no_days,
    )
    .filter_eq("t2.UserName", input.user_name.as_deref())
    .order_by("t1.CollectTimeStamp DESC")
    .build(style)
}

pub struct QueryLogToolHandler<S> {
    session: S,
}

impl<S: CatalogSession> QueryLogToolHandler<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Handle the read_sql_list tool call.
    pub async fn read_sql_list(&self, input: ReadSqlListInput) -> DbResult<String> {
        debug!(
            user_name = ?input.user_name,
            no_days = ?input.no_days,
            "Tool: read_sql_list"
        );

        let statement = sql_list_statement(&input, self.session.placeholder_style());
        let records = fetch_records(&self.session, &statement).await?;

        info!(tool = "read_sql_list", row_count = records.len(), "Tool completed");

        let mut metadata = tool_metadata("read_sql_list");
        metadata.insert("user_name".into(), json!(input.user_name));
        metadata.insert("no_days".into(), json!(input.no_days));
        metadata.insert("total_queries".into(), records.len().into());
        create_response(records, Some(metadata))
    }
}
