//! Statement execution: the narrow seam between repositories and the database.

use crate::error::AppError;
use crate::sql::{to_positional, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::PgPool;

/// One result row, column name -> JSON value.
pub type Row = Map<String, Value>;

/// Runs named-placeholder statements built by [`crate::sql`].
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a statement that returns rows.
    async fn fetch(&self, q: &QueryBuf) -> Result<Vec<Row>, AppError>;

    /// Run a statement for its effect; returns affected rows.
    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError>;
}

/// PostgreSQL executor. Each statement checks a connection out of the pool for its
/// own duration only.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        PgExecutor { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn fetch(&self, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let (sql, values) = to_positional(&q.sql, &q.params)?;
        let mut query = sqlx::query(&sql);
        for v in &values {
            query = query.bind(PgBindValue::from_json(v));
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let (sql, values) = to_positional(&q.sql, &q.params)?;
        let mut query = sqlx::query(&sql);
        for v in &values {
            query = query.bind(PgBindValue::from_json(v));
        }
        let done = query.execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}

fn row_to_json(row: &PgRow) -> Row {
    use sqlx::{Column as _, Row as _};
    let mut map = Map::new();
    for col in row.columns() {
        map.insert(col.name().to_string(), cell_to_value(row, col));
    }
    map
}

/// Decoding chosen from a column's declared Postgres type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cell {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Bool,
    Text,
    Timestamp,
    TimestampTz,
    Date,
    Uuid,
    Json,
    Unsupported,
}

fn cell_kind(type_name: &str) -> Cell {
    match type_name {
        "INT2" => Cell::Int2,
        "INT4" => Cell::Int4,
        // BIGSERIAL ids and COUNT(*).
        "INT8" => Cell::Int8,
        "FLOAT4" => Cell::Float4,
        // SUM totals are cast to DOUBLE PRECISION.
        "FLOAT8" => Cell::Float8,
        "BOOL" => Cell::Bool,
        "VARCHAR" | "TEXT" | "BPCHAR" | "NAME" => Cell::Text,
        "TIMESTAMP" => Cell::Timestamp,
        "TIMESTAMPTZ" => Cell::TimestampTz,
        "DATE" => Cell::Date,
        "UUID" => Cell::Uuid,
        "JSON" | "JSONB" => Cell::Json,
        _ => Cell::Unsupported,
    }
}

/// Timestamps render as `YYYY-MM-DD HH:MM:SS`. SQL NULL and undecodable cells become null.
fn cell_to_value(row: &PgRow, col: &PgColumn) -> Value {
    use sqlx::{Column as _, Row as _, TypeInfo as _};
    const STAMP: &str = "%Y-%m-%d %H:%M:%S";

    let name = col.name();
    let type_name = col.type_info().name();
    let decoded: Result<Option<Value>, sqlx::Error> = match cell_kind(type_name) {
        Cell::Int2 => row.try_get::<Option<i16>, _>(name).map(|v| v.map(Value::from)),
        Cell::Int4 => row.try_get::<Option<i32>, _>(name).map(|v| v.map(Value::from)),
        Cell::Int8 => row.try_get::<Option<i64>, _>(name).map(|v| v.map(Value::from)),
        Cell::Float4 => row
            .try_get::<Option<f32>, _>(name)
            .map(|v| v.map(|n| Value::from(f64::from(n)))),
        Cell::Float8 => row.try_get::<Option<f64>, _>(name).map(|v| v.map(Value::from)),
        Cell::Bool => row.try_get::<Option<bool>, _>(name).map(|v| v.map(Value::Bool)),
        Cell::Text => row.try_get::<Option<String>, _>(name).map(|v| v.map(Value::String)),
        Cell::Timestamp => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(name)
            .map(|v| v.map(|d| Value::String(d.format(STAMP).to_string()))),
        Cell::TimestampTz => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name)
            .map(|v| v.map(|d| Value::String(d.format(STAMP).to_string()))),
        Cell::Date => row
            .try_get::<Option<chrono::NaiveDate>, _>(name)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))),
        Cell::Uuid => row
            .try_get::<Option<uuid::Uuid>, _>(name)
            .map(|v| v.map(|u| Value::String(u.to_string()))),
        Cell::Json => row.try_get::<Option<Value>, _>(name),
        Cell::Unsupported => {
            tracing::warn!(column = name, r#type = type_name, "unsupported column type");
            Ok(None)
        }
    };
    decoded.unwrap_or_else(|e| {
        tracing::warn!(column = name, error = %e, "column not decoded");
        None
    })
    .unwrap_or(Value::Null)
}
