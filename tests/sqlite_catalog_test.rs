//! End-to-end tool tests against an in-memory SQLite catalog.
//!
//! A `DBC` schema is attached to the single pooled connection and seeded
//! with the views the tools read.

use serde_json::{Value, json};
use td_dba_tools::config::SessionConfig;
use td_dba_tools::db::{CatalogSession, DbPool, QueryExecutor};
use td_dba_tools::models::{Statement, rows_to_records};
use td_dba_tools::tools::{
    ReadDatabaseSpaceInput, ReadTableSpaceInput, SpaceToolHandler, SystemToolHandler,
};

const CATALOG: &[&str] = &[
    "ATTACH DATABASE ':memory:' AS DBC",
    "CREATE TABLE DBC.AllSpaceV (DatabaseName TEXT, TableName TEXT, Vproc INTEGER, CurrentPerm INTEGER, PeakPerm INTEGER)",
    "INSERT INTO DBC.AllSpaceV VALUES
        ('Sales', 'Orders', 0, 1000, 1500),
        ('Sales', 'Orders', 1, 500, 700),
        ('Sales', 'Customers', 0, 200, 300),
        ('HR', 'Staff', 0, 50, 60)",
    "CREATE TABLE DBC.DiskSpaceV (DatabaseName TEXT, Vproc INTEGER, MaxPerm INTEGER, CurrentPerm INTEGER)",
    "INSERT INTO DBC.DiskSpaceV VALUES
        ('Sales', 0, 5368709120, 1342177280),
        ('Sales', 1, 5368709120, 1342177280),
        ('HR', 0, 1073741824, 805306368),
        ('Spool', 0, 0, 0)",
    "CREATE TABLE DBC.DBCInfoV (InfoKey VARCHAR(30), InfoData VARCHAR(30))",
    "INSERT INTO DBC.DBCInfoV VALUES
        ('VERSION', '17.20.03.09'),
        ('LANGUAGE SUPPORT MODE', 'Standard')",
];

async fn setup_catalog() -> QueryExecutor {
    let config = SessionConfig::parse("sqlite::memory:").unwrap();
    let executor = QueryExecutor::connect(&config).await.unwrap();

    let DbPool::SQLite(pool) = executor.pool() else {
        panic!("expected a SQLite pool");
    };
    for sql in CATALOG {
        sqlx::query(sql)
            .execute(pool)
            .await
            .unwrap_or_else(|e| panic!("catalog setup failed on `{sql}`: {e}"));
    }
    executor
}

fn parse(out: &str) -> Value {
    serde_json::from_str(out).unwrap()
}

#[tokio::test]
async fn test_table_space_all_tables_largest_first() {
    let handler = SpaceToolHandler::new(setup_catalog().await);

    let out = handler
        .read_table_space(ReadTableSpaceInput::default())
        .await
        .unwrap();

    assert_eq!(
        parse(&out)["results"],
        json!([
            {"DatabaseName": "Sales", "TableName": "Orders", "CurrentPerm1": 1500, "PeakPerm": 2200},
            {"DatabaseName": "Sales", "TableName": "Customers", "CurrentPerm1": 200, "PeakPerm": 300},
            {"DatabaseName": "HR", "TableName": "Staff", "CurrentPerm1": 50, "PeakPerm": 60}
        ])
    );
    assert!(out.contains(r#"{"DatabaseName":"Sales","TableName":"Orders","CurrentPerm1":1500,"PeakPerm":2200}"#));
}

#[tokio::test]
async fn test_table_space_for_one_database() {
    let handler = SpaceToolHandler::new(setup_catalog().await);

    let out = handler
        .read_table_space(ReadTableSpaceInput {
            db_name: Some("Sales".into()),
            table_name: Some(String::new()),
        })
        .await
        .unwrap();
    let value = parse(&out);

    assert_eq!(value["metadata"]["total_tables"], 2);
    assert_eq!(
        value["results"],
        json!([
            {"TableName": "Orders", "CurrentPerm1": 1500, "PeakPerm": 2200},
            {"TableName": "Customers", "CurrentPerm1": 200, "PeakPerm": 300}
        ])
    );
}

#[tokio::test]
async fn test_table_space_filter_is_not_interpolated() {
    let handler = SpaceToolHandler::new(setup_catalog().await);

    let out = handler
        .read_table_space(ReadTableSpaceInput {
            db_name: Some("Sales' OR '1'='1".into()),
            table_name: None,
        })
        .await
        .unwrap();

    assert_eq!(parse(&out)["metadata"]["total_tables"], 0);
}

#[tokio::test]
async fn test_database_space_fullest_first() {
    let handler = SpaceToolHandler::new(setup_catalog().await);

    let out = handler
        .read_database_space(ReadDatabaseSpaceInput::default())
        .await
        .unwrap();
    let value = parse(&out);
    let results = value["results"].as_array().unwrap();

    // Spool has no perm space and is excluded
    assert_eq!(value["metadata"]["total_databases"], 2);
    assert_eq!(results[0]["DatabaseName"], "HR");
    assert_eq!(results[0]["PercentUsed"].as_f64(), Some(75.0));
    assert_eq!(results[1]["DatabaseName"], "Sales");
    assert_eq!(results[1]["SpaceAllocated_GB"].as_f64(), Some(10.0));
    assert_eq!(results[1]["PercentUsed"].as_f64(), Some(25.0));
}

#[tokio::test]
async fn test_database_space_single_database() {
    let handler = SpaceToolHandler::new(setup_catalog().await);

    let out = handler
        .read_database_space(ReadDatabaseSpaceInput {
            db_name: Some("HR".into()),
        })
        .await
        .unwrap();
    let value = parse(&out);

    assert_eq!(value["metadata"]["db_name"], "HR");
    assert_eq!(value["metadata"]["total_databases"], 1);
    assert_eq!(value["results"][0]["DatabaseName"], "HR");
}

#[tokio::test]
async fn test_database_version() {
    let handler = SystemToolHandler::new(setup_catalog().await);

    let out = handler.read_database_version().await.unwrap();

    assert_eq!(
        out,
        r#"{"status":"success","metadata":{"tool_name":"read_database_version","total_rows":2},"results":[{"InfoKey":"VERSION","InfoData":"17.20.03.09"},{"InfoKey":"LANGUAGE SUPPORT MODE","InfoData":"Standard"}]}"#
    );
}

#[tokio::test]
async fn test_missing_view_is_a_database_error() {
    let handler = SystemToolHandler::new(setup_catalog().await);

    // Sys_Calendar is not attached
    let err = handler.read_resusage_summary().await.unwrap_err();

    assert!(matches!(err, td_dba_tools::DbError::Database { .. }));
}

#[tokio::test]
async fn test_driver_values_are_normalized() {
    let executor = setup_catalog().await;
    let DbPool::SQLite(pool) = executor.pool() else {
        panic!("expected a SQLite pool");
    };
    sqlx::query(
        "CREATE TABLE DBC.Samples (d DATE, ts DATETIME, amount REAL, flag BOOLEAN, payload BLOB, note TEXT)",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO DBC.Samples VALUES ('2024-01-15', '2024-01-15 08:30:00', 12.5, 1, X'68656C6C6F', NULL)",
    )
    .execute(pool)
    .await
    .unwrap();

    let result = executor
        .fetch_all(&Statement::new("SELECT * FROM DBC.Samples"))
        .await
        .unwrap();
    let records = rows_to_records(&result.columns, &result.rows);

    assert_eq!(
        Value::Object(records[0].clone()),
        json!({
            "d": "2024-01-15",
            "ts": "2024-01-15T08:30:00",
            "amount": 12.5,
            "flag": true,
            "payload": "hello",
            "note": null
        })
    );
}

#[tokio::test]
async fn test_file_catalog_with_session_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");
    let url = format!(
        "sqlite:{}?mode=rwc&max_connections=2&query_timeout=5",
        path.display()
    );

    let config = SessionConfig::parse(&url).unwrap();
    assert_eq!(config.pool_options.max_connections, Some(2));
    assert!(config.connection_string.ends_with("?mode=rwc"));

    let executor = QueryExecutor::connect(&config).await.unwrap();
    let result = executor
        .fetch_all(&Statement::new("SELECT 1 AS one"))
        .await
        .unwrap();

    assert_eq!(result.row_count(), 1);
    assert!(path.exists());
    executor.close().await;
}
