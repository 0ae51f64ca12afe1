//! Postgres-backed [`RecordStore`] storing rows as JSONB documents.
//!
//! Every collection shares one `records` table keyed by (collection, id).
//! Filters compile to `data->>'field'` comparisons; since dates are stored in
//! ISO form, range conditions on them are correct under text ordering. Range
//! conditions with numeric bounds are cast to `numeric` on both sides so they
//! order the way [`Filter::matches`] orders numbers.

use super::{Collection, Condition, Filter, FilterOp, RecordStore};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new connection pool against the given database.
    #[instrument(skip(database_url))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::StoreError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the records table if it does not exist yet.
    #[instrument(skip(self))]
    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                seq        BIGSERIAL,
                collection TEXT  NOT NULL,
                id         UUID  NOT NULL,
                data       JSONB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS records_collection_idx ON records (collection)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::StoreError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

/// Render a filter value the way `data->>'field'` renders the stored one.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for cond in filter.conditions() {
        match cond.op {
            FilterOp::Eq if cond.value.is_null() => {
                qb.push(" AND data->>");
                qb.push_bind(cond.field.clone());
                qb.push(" IS NULL");
            }
            FilterOp::Eq => {
                qb.push(" AND data->>");
                qb.push_bind(cond.field.clone());
                qb.push(" = ");
                qb.push_bind(as_text(&cond.value));
            }
            FilterOp::Gt => push_range(qb, cond, " > "),
            FilterOp::Gte => push_range(qb, cond, " >= "),
            FilterOp::Lt => push_range(qb, cond, " < "),
            FilterOp::Lte => push_range(qb, cond, " <= "),
            FilterOp::In => {
                let values: Vec<String> = cond
                    .value
                    .as_array()
                    .map(|set| set.iter().map(as_text).collect())
                    .unwrap_or_default();
                qb.push(" AND data->>");
                qb.push_bind(cond.field.clone());
                qb.push(" = ANY(");
                qb.push_bind(values);
                qb.push(")");
            }
        }
    }
}

/// Numeric bounds compare numerically, matching the in-memory backend;
/// everything else (ISO dates included) compares as text.
fn push_range(qb: &mut QueryBuilder<'_, Postgres>, cond: &Condition, op: &str) {
    if cond.value.is_number() {
        qb.push(" AND (data->>");
        qb.push_bind(cond.field.clone());
        qb.push(")::numeric");
        qb.push(op);
        qb.push_bind(as_text(&cond.value));
        qb.push("::numeric");
    } else {
        qb.push(" AND data->>");
        qb.push_bind(cond.field.clone());
        qb.push(op);
        qb.push_bind(as_text(&cond.value));
    }
}

fn row_id(row: &Value) -> Result<Uuid, AppError> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::StoreError(anyhow::anyhow!("row is missing a uuid `id` field")))
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, AppError> {
        let mut qb = QueryBuilder::new("SELECT data FROM records WHERE collection = ");
        qb.push_bind(collection.as_str());
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY seq");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| r.try_get::<Value, _>("data").map_err(AppError::from))
            .collect()
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Value, AppError> {
        let mut qb = QueryBuilder::new("SELECT data FROM records WHERE collection = ");
        qb.push_bind(collection.as_str());
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY seq LIMIT 1");

        let row = qb.build().fetch_optional(&self.pool).await?;
        match row {
            Some(r) => Ok(r.try_get::<Value, _>("data")?),
            None => Err(AppError::NotFound(anyhow::anyhow!(
                "no matching {} record",
                collection
            ))),
        }
    }

    async fn insert(
        &self,
        collection: Collection,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, AppError> {
        let mut tx = self.pool.begin().await?;
        for row in &rows {
            let id = row_id(row)?;
            sqlx::query("INSERT INTO records (collection, id, data) VALUES ($1, $2, $3)")
                .bind(collection.as_str())
                .bind(id)
                .bind(row)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(rows)
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, AppError> {
        if !patch.is_object() {
            return Err(AppError::StoreError(anyhow::anyhow!(
                "update patch must be a JSON object"
            )));
        }

        let mut qb = QueryBuilder::new("UPDATE records SET data = data || ");
        qb.push_bind(patch);
        qb.push(" WHERE collection = ");
        qb.push_bind(collection.as_str());
        push_filter(&mut qb, filter);
        qb.push(" RETURNING data");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| r.try_get::<Value, _>("data").map_err(AppError::from))
            .collect()
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, AppError> {
        let mut qb = QueryBuilder::new("DELETE FROM records WHERE collection = ");
        qb.push_bind(collection.as_str());
        push_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
