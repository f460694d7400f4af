//! PostgreSQL executor backed by a sqlx pool

use crate::executor::{DbResponse, Executor, Statement};
use anyhow::anyhow;
use async_trait::async_trait;
use config::DatabaseConfig;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo};
use std::time::Duration;
use type_mapping::{Row, SqlValue};

/// [`Executor`] running statements on a shared [`PgPool`]
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized and timed by `config`
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&config.connection_string()).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial statement
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn query(&self, statement: &Statement) -> anyhow::Result<DbResponse> {
        let mut query = sqlx::query(&statement.text);
        for value in &statement.values {
            query = bind_value(query, value);
        }

        if returns_rows(&statement.text) {
            let rows = query.fetch_all(&self.pool).await?;
            let rows = rows.iter().map(decode_row).collect::<anyhow::Result<Vec<_>>>()?;
            Ok(DbResponse::from_rows(rows))
        } else {
            let result = query.execute(&self.pool).await?;
            Ok(DbResponse::affected(result.rows_affected()))
        }
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Whether a statement yields a result set rather than an affected-row count
pub fn returns_rows(text: &str) -> bool {
    let upper = text.trim_start().to_ascii_uppercase();
    upper.starts_with("SELECT")
        || upper.starts_with("WITH")
        || upper.starts_with("VALUES")
        || upper.starts_with("SHOW")
        || upper.contains(" RETURNING ")
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &SqlValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::BigInt(i) => query.bind(*i),
        SqlValue::SmallInt(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Boolean(b) => query.bind(*b),
        SqlValue::Uuid(u) => query.bind(*u),
        SqlValue::Timestamp(ts) => query.bind(*ts),
        SqlValue::Decimal(d) => query.bind(d.clone()),
        SqlValue::Json(v) => query.bind(v.clone()),
        SqlValue::Array(_) => query.bind(value.to_json()),
        SqlValue::Null => query.bind(Option::<String>::None),
    }
}

fn decode_row(row: &PgRow) -> anyhow::Result<Row> {
    let mut decoded = Row::with_capacity(row.len());

    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())
            .map_err(|e| anyhow!("column '{}': {}", column.name(), e))?;
        decoded.insert(column.name().to_string(), value);
    }

    Ok(decoded)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> anyhow::Result<SqlValue> {
    let value = match type_name {
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
            row.try_get::<Option<String>, _>(index)?.map(SqlValue::Text)
        }
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(SqlValue::SmallInt),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(SqlValue::Integer),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(SqlValue::BigInt),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|f| SqlValue::Float(f64::from(f))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(SqlValue::Float),
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(SqlValue::Boolean),
        "UUID" => row.try_get::<Option<uuid::Uuid>, _>(index)?.map(SqlValue::Uuid),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(SqlValue::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|ts| SqlValue::Timestamp(ts.and_utc())),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .map(SqlValue::Json),
        other => row
            .try_get::<Option<String>, _>(index)
            .map_err(|_| anyhow!("unsupported column type {}", other))?
            .map(SqlValue::Text),
    };

    Ok(value.unwrap_or(SqlValue::Null))
}
