use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::debug;

use super::{attach_relation, local_keys, Record, StoreSession};
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::query_builder::SelectStatement;
use crate::schema::{EntitySchema, RelationDescriptor};

/// PostgreSQL-backed session; every row is fetched as a single JSON object
#[derive(Debug, Clone)]
pub struct PgSession {
    pool: PgPool,
}

impl PgSession {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool using the configured URL and connection limit
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .database_url()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_relation(
        &self,
        name: &str,
        relation: &RelationDescriptor,
        keys: Vec<String>,
    ) -> Result<(String, Vec<Record>), StoreError> {
        if keys.is_empty() {
            return Ok((name.to_string(), Vec::new()));
        }

        let mut query: QueryBuilder<'static, Postgres> = QueryBuilder::new(format!(
            "SELECT to_jsonb({table}.*) AS record FROM {table} WHERE {key}::text = ANY(",
            table = relation.target_table,
            key = relation.remote_key,
        ));
        query.push_bind(keys);
        query.push(")");

        debug!(relation = %name, sql = %query.sql(), "Loading relation");
        let rows = query.build().fetch_all(&self.pool).await?;
        let related = rows.iter().map(decode_record).collect::<Result<_, _>>()?;
        Ok((name.to_string(), related))
    }
}

fn decode_record(row: &PgRow) -> Result<Record, StoreError> {
    let Json(value): Json<Value> = row.try_get("record")?;
    Record::from_json(value)
}

#[async_trait]
impl StoreSession for PgSession {
    async fn fetch(
        &self,
        schema: &EntitySchema,
        statement: &SelectStatement,
    ) -> Result<Vec<Record>, StoreError> {
        let mut query = statement.to_query_builder(schema);
        debug!(entity = %schema.entity(), sql = %query.sql(), "Fetching rows");

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut records = rows
            .iter()
            .map(decode_record)
            .collect::<Result<Vec<_>, _>>()?;

        let loads = statement.relations().iter().filter_map(|name| {
            schema
                .relation(name)
                .map(|relation| self.load_relation(name, relation, local_keys(&records, relation)))
        });
        for (name, related) in try_join_all(loads).await? {
            if let Some(relation) = schema.relation(&name) {
                attach_relation(&mut records, &name, relation, related);
            }
        }

        Ok(records)
    }

    async fn count(
        &self,
        schema: &EntitySchema,
        statement: &SelectStatement,
    ) -> Result<i64, StoreError> {
        let mut query = statement.to_count_query_builder(schema);
        debug!(entity = %schema.entity(), sql = %query.sql(), "Counting rows");

        let row = query.build().fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }
}
