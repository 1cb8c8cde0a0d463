//! Statement execution over a sqlx pool.
//!
//! `QueryExecutor` is the [`CatalogSession`] used against catalog mirrors
//! reachable through sqlx. Every call fetches the complete result; the
//! pooled connection returns to the pool when the call finishes, whether
//! it succeeded or not.

use crate::config::SessionConfig;
use crate::db::builder::PlaceholderStyle;
use crate::db::params;
use crate::db::pool::DbPool;
use crate::db::session::CatalogSession;
use crate::db::types::result_set_from_rows;
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, ResultSet, Statement};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: DbPool,
    query_timeout: Option<Duration>,
}

impl QueryExecutor {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            query_timeout: None,
        }
    }

    /// Bound each statement by `query_timeout`.
    pub fn with_timeout(mut self, query_timeout: Option<Duration>) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Open a pool from `config` and wrap it.
    pub async fn connect(config: &SessionConfig) -> DbResult<Self> {
        let pool = DbPool::connect(config).await?;
        Ok(Self::new(pool).with_timeout(config.query_timeout))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn run(&self, statement: &Statement) -> DbResult<ResultSet> {
        let result = match &self.pool {
            DbPool::MySql(p) => params::mysql_query(statement)
                .fetch_all(p)
                .await
                .map(|rows| result_set_from_rows(&rows)),
            DbPool::Postgres(p) => params::postgres_query(statement)
                .fetch_all(p)
                .await
                .map(|rows| result_set_from_rows(&rows)),
            DbPool::SQLite(p) => params::sqlite_query(statement)
                .fetch_all(p)
                .await
                .map(|rows| result_set_from_rows(&rows)),
        };

        result.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => {
                let waited = self.pool.acquire_timeout().as_secs();
                warn!(timeout_secs = waited, "Timed out acquiring a pooled connection");
                DbError::timeout("connection pool acquire", waited)
            }
            e => e.into(),
        })
    }
}

impl CatalogSession for QueryExecutor {
    fn fetch_all(&self, statement: &Statement) -> impl Future<Output = DbResult<ResultSet>> + Send {
        async move {
            let start = Instant::now();
            debug!(
                sql = %statement.sql,
                param_types = ?statement.params.iter().map(QueryParam::type_name).collect::<Vec<_>>(),
                timeout_secs = ?self.query_timeout.map(|t| t.as_secs()),
                "Executing query"
            );

            let result = match self.query_timeout {
                Some(limit) => match timeout(limit, self.run(statement)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(timeout_secs = limit.as_secs(), "Query timed out");
                        Err(DbError::timeout("query execution", limit.as_secs()))
                    }
                },
                None => self.run(statement).await,
            }?;

            debug!(
                row_count = result.row_count(),
                execution_time_ms = start.elapsed().as_millis() as u64,
                "Query completed"
            );
            Ok(result)
        }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        match self.pool.db_type() {
            crate::db::DatabaseType::Postgres => PlaceholderStyle::Dollar,
            _ => PlaceholderStyle::QuestionMark,
        }
    }
}
