//! Service facade: runs a [`Repository`] operation, shapes the rows and logs the outcome.

use serde_json::Value;
use std::time::Instant;

use crate::config::QueryConfig;
use crate::error::QueryResult;
use crate::logging::log_query_operation;
use crate::models::{ComplexQuery, FlatQuery};
use crate::query_builder::{ConditionNode, FormattedFields};
use crate::repository::Repository;
use crate::schema::{Entity, SchemaRegistry};
use crate::shaper::{shape_paged, shape_record};
use crate::store::StoreSession;

/// Entry point a routing layer calls for one entity type
#[derive(Debug, Clone)]
pub struct EntityService<E: Entity> {
    repository: Repository<E>,
}

impl<E: Entity> EntityService<E> {
    pub fn new(registry: &SchemaRegistry, config: QueryConfig) -> Self {
        Self {
            repository: Repository::new(registry, config),
        }
    }

    pub fn repository(&self) -> &Repository<E> {
        &self.repository
    }

    /// Flat-form list shaped into `{count, items}`
    pub async fn list<S>(&self, session: &S, query: &FlatQuery) -> QueryResult<Value>
    where
        S: StoreSession + ?Sized,
    {
        self.list_with_condition(session, query, None).await
    }

    /// Flat-form list ANDed with a condition supplied by the call site
    pub async fn list_with_condition<S>(
        &self,
        session: &S,
        query: &FlatQuery,
        condition: Option<&ConditionNode>,
    ) -> QueryResult<Value>
    where
        S: StoreSession + ?Sized,
    {
        let started = Instant::now();
        let result = self.run_list(session, query, condition).await;
        self.log("list", query.params.len(), &result, started);
        result
    }

    async fn run_list<S>(
        &self,
        session: &S,
        query: &FlatQuery,
        condition: Option<&ConditionNode>,
    ) -> QueryResult<Value>
    where
        S: StoreSession + ?Sized,
    {
        let compiled = self.repository.compile_flat(query, condition)?;
        let paged = self.repository.execute(session, &compiled, query.count).await?;
        Ok(shape_paged(self.repository.schema(), &paged, &compiled.fields))
    }

    /// Condition-tree list shaped into `{count, items}`
    pub async fn complex_query<S>(&self, session: &S, query: &ComplexQuery) -> QueryResult<Value>
    where
        S: StoreSession + ?Sized,
    {
        let started = Instant::now();
        let result = self.run_complex(session, query).await;
        let predicates = usize::from(query.condition.is_some());
        self.log("complex_query", predicates, &result, started);
        result
    }

    async fn run_complex<S>(&self, session: &S, query: &ComplexQuery) -> QueryResult<Value>
    where
        S: StoreSession + ?Sized,
    {
        let compiled = self.repository.compile_complex(query)?;
        let paged = self.repository.execute(session, &compiled, query.count).await?;
        Ok(shape_paged(self.repository.schema(), &paged, &compiled.fields))
    }

    /// One row by primary key, every column included
    pub async fn get<S>(&self, session: &S, pk: &str) -> QueryResult<Option<Value>>
    where
        S: StoreSession + ?Sized,
    {
        let record = self.repository.get_by_pk(session, pk).await?;
        Ok(record.map(|record| {
            shape_record(self.repository.schema(), &record, &FormattedFields::default())
        }))
    }

    fn log(
        &self,
        operation: &str,
        predicates: usize,
        result: &QueryResult<Value>,
        started: Instant,
    ) {
        let status = match result {
            Ok(_) => "ok",
            Err(error) if error.is_client_error() => "rejected",
            Err(_) => "failed",
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).ok();
        log_query_operation(operation, E::NAME, predicates, status, duration_ms);
    }
}
