//! Postgres backing for the query pipeline.
//!
//! - [`PgExecutor`]: runs validated SQL in a read-only transaction with a
//!   statement timeout and a row cap
//! - [`describe_schema`]: table/column summary for the SQL generator
//! - [`PgAccessResolver`]: credential lookup against the portal users table

use aicp_core::DatabaseConfig;
use aicp_runtime::{QueryExecutor, QueryResult};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, Executor, PgPool, Statement};
use std::time::Duration;

mod access;
mod decode;
mod introspect;

pub use access::PgAccessResolver;
pub use introspect::{describe_schema, render_schema};

/// Open a pool sized from configuration and verify connectivity.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let url = config.connection_string()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&url)
        .await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!(max_connections = config.max_connections, "connected to database");
    Ok(pool)
}

pub(crate) fn quote_ident(ident: &str) -> anyhow::Result<String> {
    if ident.is_empty() {
        anyhow::bail!("empty identifier");
    }
    if !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!("invalid identifier '{ident}'");
    }
    Ok(format!("\"{ident}\""))
}

pub struct PgExecutor {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgExecutor {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    pub fn from_config(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self::new(pool, Duration::from_secs(config.statement_timeout_secs))
    }

    /// Round-trip a trivial statement; used by health checks.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    /// The statement runs behind a cursor inside a read-only transaction, so
    /// at most `row_cap + 1` rows ever leave the server. The extra row only
    /// signals truncation.
    async fn execute(&self, sql: &str, row_cap: usize) -> anyhow::Result<QueryResult> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        let statement = sql.trim().trim_end_matches(';');
        // Column names come from the statement description so that an empty
        // result still reports them.
        let columns: Vec<String> = (&mut *tx)
            .prepare(statement)
            .await?
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        sqlx::query(&format!("DECLARE aicp_result NO SCROLL CURSOR FOR {statement}"))
            .execute(&mut *tx)
            .await?;
        let rows = sqlx::query(&format!("FETCH FORWARD {} FROM aicp_result", row_cap + 1))
            .fetch_all(&mut *tx)
            .await?;
        tx.rollback().await?;

        let truncated = rows.len() > row_cap;
        let values = rows
            .iter()
            .take(row_cap)
            .map(decode::row_values)
            .collect::<anyhow::Result<Vec<_>>>()?;

        tracing::debug!(rows = values.len(), truncated, "statement fetched");
        Ok(QueryResult {
            columns,
            rows: values,
            truncated,
        })
    }
}
