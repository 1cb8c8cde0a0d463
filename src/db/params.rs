//! Binding of statement parameters to backend-specific queries.

use crate::models::{QueryParam, Statement};
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};

macro_rules! bind_param {
    ($query:expr, $param:expr) => {
        match $param {
            QueryParam::Null => $query.bind(None::<String>),
            QueryParam::Bool(v) => $query.bind(*v),
            QueryParam::Int(v) => $query.bind(*v),
            QueryParam::Float(v) => $query.bind(*v),
            QueryParam::String(v) => $query.bind(v.as_str()),
        }
    };
}

pub(crate) fn mysql_query(statement: &Statement) -> Query<'_, MySql, MySqlArguments> {
    statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), |query, param| bind_param!(query, param))
}

pub(crate) fn postgres_query(statement: &Statement) -> Query<'_, Postgres, PgArguments> {
    statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), |query, param| bind_param!(query, param))
}

pub(crate) fn sqlite_query(statement: &Statement) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), |query, param| bind_param!(query, param))
}
