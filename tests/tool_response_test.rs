//! Tool behavior against a recording session.
//!
//! These tests verify statement selection, metadata and envelope shape, and
//! that session errors reach the caller unchanged.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::{Arc, Mutex};
use td_dba_tools::db::{CatalogSession, PlaceholderStyle};
use td_dba_tools::error::{DbError, DbResult};
use td_dba_tools::models::{QueryParam, ResultSet, SqlValue, Statement};
use td_dba_tools::tools::{
    QueryLogToolHandler, RESUSAGE_SUMMARY_COMMENT, RESUSAGE_SUMMARY_SQL, ReadDatabaseSpaceInput,
    ReadSqlListInput, ReadTableSpaceInput, SpaceToolHandler, SystemToolHandler,
};

/// Returns a canned result (or error) and records every statement it is given.
#[derive(Default)]
struct RecordingSession {
    result: ResultSet,
    error_message: Option<String>,
    style: PlaceholderStyle,
    statements: Mutex<Vec<Statement>>,
}

impl RecordingSession {
    fn returning(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            result: ResultSet::new(columns.iter().map(|c| c.to_string()).collect(), rows),
            ..Self::default()
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            error_message: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }
}

impl CatalogSession for RecordingSession {
    fn fetch_all(&self, statement: &Statement) -> impl Future<Output = DbResult<ResultSet>> + Send {
        self.statements.lock().unwrap().push(statement.clone());
        let outcome = match &self.error_message {
            Some(message) => Err(DbError::database(
                message.clone(),
                Some("3807".to_string()),
                "Check that the catalog views exist and the user has SELECT on DBC",
            )),
            None => Ok(self.result.clone()),
        };
        async move { outcome }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }
}

// =========================================================================
// read_sql_list
// =========================================================================

#[tokio::test]
async fn test_read_sql_list_envelope() {
    let collected = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(10, 15, 30)
        .unwrap();
    let session = RecordingSession::returning(
        &["QueryID", "ProcID", "CollectTimeStamp", "SqlTextInfo", "UserName"],
        vec![vec![
            SqlValue::Decimal(Decimal::from(307192)),
            SqlValue::Decimal(Decimal::from(30719)),
            SqlValue::Timestamp(collected),
            SqlValue::Text("SELECT 1".into()),
            SqlValue::Text("etl_batch".into()),
        ]],
    );
    let handler = QueryLogToolHandler::new(session);

    let out = handler
        .read_sql_list(ReadSqlListInput {
            user_name: Some("etl_batch".into()),
            no_days: Some(3),
        })
        .await
        .unwrap();

    assert_eq!(
        out,
        r#"{"status":"success","metadata":{"tool_name":"read_sql_list","user_name":"etl_batch","no_days":3,"total_queries":1},"results":[{"QueryID":307192.0,"ProcID":30719.0,"CollectTimeStamp":"2024-05-01T10:15:30","SqlTextInfo":"SELECT 1","UserName":"etl_batch"}]}"#
    );
}

#[tokio::test]
async fn test_read_sql_list_binds_user_and_days() {
    let session = Arc::new(RecordingSession::default());
    let handler = QueryLogToolHandler::new(session.clone());

    handler
        .read_sql_list(ReadSqlListInput {
            user_name: Some("O'Brien".into()),
            no_days: Some(14),
        })
        .await
        .unwrap();

    let statements = session.statements();
    assert_eq!(statements.len(), 1);
    assert!(!statements[0].sql.contains("O'Brien"));
    assert_eq!(
        statements[0].params,
        vec![QueryParam::Int(14), QueryParam::from("O'Brien")]
    );
}

#[tokio::test]
async fn test_read_sql_list_negative_days_is_an_empty_success() {
    let session = Arc::new(RecordingSession::default());
    let handler = QueryLogToolHandler::new(session.clone());

    let out = handler
        .read_sql_list(ReadSqlListInput {
            user_name: None,
            no_days: Some(-3),
        })
        .await
        .unwrap();

    assert_eq!(
        out,
        r#"{"status":"success","metadata":{"tool_name":"read_sql_list","user_name":null,"no_days":-3,"total_queries":0},"results":[]}"#
    );
    assert_eq!(session.statements()[0].params, vec![QueryParam::Int(-3)]);
}

// =========================================================================
// read_table_space / read_database_space
// =========================================================================

#[tokio::test]
async fn test_absent_inputs_echo_as_null() {
    let handler = SpaceToolHandler::new(RecordingSession::default());

    let out = handler
        .read_table_space(ReadTableSpaceInput::default())
        .await
        .unwrap();

    assert_eq!(
        out,
        r#"{"status":"success","metadata":{"tool_name":"read_table_space","db_name":null,"table_name":null,"total_tables":0},"results":[]}"#
    );
}

#[tokio::test]
async fn test_empty_inputs_echo_as_empty_strings() {
    let session = Arc::new(RecordingSession::default());
    let handler = SpaceToolHandler::new(session.clone());

    let out = handler
        .read_table_space(ReadTableSpaceInput {
            db_name: Some(String::new()),
            table_name: Some(String::new()),
        })
        .await
        .unwrap();

    assert!(out.contains(r#""db_name":"","table_name":"""#));
    assert!(session.statements()[0].params.is_empty());
    assert!(!session.statements()[0].sql.contains("WHERE"));
}

#[tokio::test]
async fn test_postgres_placeholders_are_numbered() {
    let session = Arc::new(RecordingSession {
        style: PlaceholderStyle::Dollar,
        ..RecordingSession::default()
    });
    let handler = SpaceToolHandler::new(session.clone());

    handler
        .read_table_space(ReadTableSpaceInput {
            db_name: Some("Sales".into()),
            table_name: Some("Orders".into()),
        })
        .await
        .unwrap();

    let sql = &session.statements()[0].sql;
    assert!(sql.contains("DatabaseName = $1"));
    assert!(sql.contains("TableName = $2"));
    assert!(!sql.contains('?'));
}

#[tokio::test]
async fn test_database_space_counts_databases() {
    let session = RecordingSession::returning(
        &["DatabaseName", "SpaceAllocated_GB", "SpaceUsed_GB", "FreeSpace_GB", "PercentUsed"],
        vec![
            vec![
                "Sales".into(),
                SqlValue::Decimal(Decimal::new(1000, 2)),
                SqlValue::Decimal(Decimal::new(250, 2)),
                SqlValue::Decimal(Decimal::new(750, 2)),
                SqlValue::Decimal(Decimal::new(2500, 2)),
            ],
            vec![
                "HR".into(),
                SqlValue::Decimal(Decimal::new(100, 2)),
                SqlValue::Decimal(Decimal::new(75, 2)),
                SqlValue::Decimal(Decimal::new(25, 2)),
                SqlValue::Null,
            ],
        ],
    );
    let handler = SpaceToolHandler::new(session);

    let out = handler
        .read_database_space(ReadDatabaseSpaceInput::default())
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(value["metadata"]["total_databases"], 2);
    assert_eq!(value["results"][0]["SpaceAllocated_GB"], 10.0);
    assert_eq!(value["results"][1]["PercentUsed"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_session_errors_propagate_unchanged() {
    let handler = SpaceToolHandler::new(RecordingSession::failing(
        "Object 'DBC.DiskSpaceV' does not exist.",
    ));

    let err = handler
        .read_database_space(ReadDatabaseSpaceInput {
            db_name: Some("Sales".into()),
        })
        .await
        .unwrap_err();

    match err {
        DbError::Database {
            message, sql_state, ..
        } => {
            assert_eq!(message, "Object 'DBC.DiskSpaceV' does not exist.");
            assert_eq!(sql_state.as_deref(), Some("3807"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// =========================================================================
// read_database_version / read_resusage_summary
// =========================================================================

#[tokio::test]
async fn test_read_database_version() {
    let session = Arc::new(RecordingSession::returning(
        &["InfoKey", "InfoData"],
        vec![
            vec!["VERSION".into(), "17.20.03.09".into()],
            vec!["LANGUAGE SUPPORT MODE".into(), "Standard".into()],
        ],
    ));
    let handler = SystemToolHandler::new(session.clone());

    let out = handler.read_database_version().await.unwrap();

    assert_eq!(
        out,
        r#"{"status":"success","metadata":{"tool_name":"read_database_version","total_rows":2},"results":[{"InfoKey":"VERSION","InfoData":"17.20.03.09"},{"InfoKey":"LANGUAGE SUPPORT MODE","InfoData":"Standard"}]}"#
    );
    assert_eq!(
        session.statements()[0],
        Statement::new("SELECT InfoKey, InfoData\nFROM DBC.DBCInfoV")
    );
}

#[tokio::test]
async fn test_read_resusage_summary_comment_follows_count() {
    let session = Arc::new(RecordingSession::default());
    let handler = SystemToolHandler::new(session.clone());

    let out = handler.read_resusage_summary().await.unwrap();

    let expected = format!(
        r#"{{"status":"success","metadata":{{"tool_name":"read_resusage_summary","total_rows":0,"comment":"{}"}},"results":[]}}"#,
        RESUSAGE_SUMMARY_COMMENT
    );
    assert_eq!(out, expected);
    assert_eq!(session.statements()[0], Statement::new(RESUSAGE_SUMMARY_SQL));
}

#[tokio::test]
async fn test_handlers_share_one_session() {
    let session = Arc::new(RecordingSession::default());
    let space = SpaceToolHandler::new(session.clone());
    let system = SystemToolHandler::new(session.clone());

    space
        .read_table_space(ReadTableSpaceInput::default())
        .await
        .unwrap();
    system.read_database_version().await.unwrap();

    assert_eq!(session.statements().len(), 2);
}
