//! PostgreSQL store: one data statement and one count statement per list request.

use crate::error::AppError;
use crate::query::sql::{count_rows, select_rows, QueryBuf};
use crate::query::{EntityQuery, PgBindValue};
use crate::store::{Row, Store};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_row(v: Value) -> Result<Row, AppError> {
    match v {
        Value::Object(m) => Ok(m),
        other => Err(AppError::Db(sqlx::Error::Decode(
            format!("expected JSON object row, got {}", other).into(),
        ))),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn fetch(&self, query: &EntityQuery<'_>) -> Result<Vec<Row>, AppError> {
        let QueryBuf { sql, params } = select_rows(query);
        tracing::debug!(sql = %sql, params = ?params, "query");
        let mut stmt = sqlx::query_scalar::<_, Value>(&sql);
        for p in &params {
            stmt = stmt.bind(PgBindValue::from_json(p));
        }
        let rows = stmt.fetch_all(&self.pool).await?;
        rows.into_iter().map(into_row).collect()
    }

    async fn count(&self, query: &EntityQuery<'_>) -> Result<u64, AppError> {
        let QueryBuf { sql, params } = count_rows(query);
        tracing::debug!(sql = %sql, params = ?params, "count");
        let mut stmt = sqlx::query_scalar::<_, i64>(&sql);
        for p in &params {
            stmt = stmt.bind(PgBindValue::from_json(p));
        }
        let n = stmt.fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}
