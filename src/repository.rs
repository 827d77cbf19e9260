//! # Paged Retrieval
//!
//! [`Repository`] composes the grammar, condition compiler, formatter and pagination into the
//! list-style operations. Every request is compiled into a [`SelectStatement`] before the
//! store is touched, so client errors never cost a round-trip.
//!
//! ```rust
//! use sieve_core::models::FlatQuery;
//! use sieve_core::repository::Repository;
//! use sieve_core::schema::SchemaRegistry;
//! use sieve_core::config::QueryConfig;
//! use sieve_core::test_utils::{seeded_store, Hero};
//!
//! # tokio_test::block_on(async {
//! let registry = SchemaRegistry::new();
//! let heroes = Repository::<Hero>::new(&registry, QueryConfig::default());
//! let store = seeded_store();
//!
//! let query = FlatQuery::from_pairs([("age__ge", "18"), ("count", "true")]).unwrap();
//! let page = heroes.list(&store, &query, None).await.unwrap();
//! assert_eq!(page.count, page.items.len() as i64);
//! # });
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::models::{ComplexQuery, FlatQuery, Paged};
use crate::query_builder::{
    build_conditions, format_fields, format_sort, CompileOptions, ConditionBuilder,
    ConditionNode, FieldSelection, FormattedFields, Pagination, Predicate, SelectStatement,
    SortOrder,
};
use crate::schema::{Entity, EntitySchema, SchemaRegistry};
use crate::store::{Record, StoreSession};

/// Inputs of the lower-level [`Repository::get_list`] primitive
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Flat `field` / `field__op` filters
    pub params: BTreeMap<String, Value>,
    /// Condition tree ANDed with the flat filters
    pub condition: Option<ConditionNode>,
    pub fields: FieldSelection,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    /// Defaults to 1
    pub page: Option<u32>,
    /// Defaults to the configured unbounded page size
    pub page_size: Option<u32>,
}

impl ListRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn condition(mut self, condition: ConditionNode) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn fields(mut self, fields: impl Into<FieldSelection>) -> Self {
        self.fields = fields.into();
        self
    }

    pub fn sort(mut self, sort_by: &str, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.to_string());
        self.sort_order = sort_order;
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }
}

/// A validated request ready for the store
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub statement: SelectStatement,
    /// Requested output fields, used to shape the fetched rows
    pub fields: FormattedFields,
}

/// Paged retrieval over one entity type
#[derive(Debug, Clone)]
pub struct Repository<E: Entity> {
    schema: Arc<EntitySchema>,
    config: QueryConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(registry: &SchemaRegistry, config: QueryConfig) -> Self {
        Self {
            schema: registry.schema_for::<E>(),
            config,
            _entity: PhantomData,
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    fn options(&self) -> CompileOptions {
        CompileOptions::from(&self.config)
    }

    /// Compile flat filters and an optional condition tree into one predicate list
    pub fn compile_predicates(
        &self,
        params: &BTreeMap<String, Value>,
        condition: Option<&ConditionNode>,
    ) -> QueryResult<Vec<Predicate>> {
        let mut predicates = build_conditions(&self.schema, params, self.options())?;
        let tree = ConditionBuilder::new(&self.schema)
            .with_options(self.options())
            .build(condition)?;
        predicates.extend(tree);
        Ok(predicates)
    }

    /// Validate and compile a request without touching the store
    pub fn compile(&self, request: &ListRequest) -> QueryResult<CompiledQuery> {
        let compiled = self.compile_inner(request);
        if let Err(ref error) = compiled {
            debug!(entity = %E::NAME, error = %error, "Rejected query");
        }
        compiled
    }

    fn compile_inner(&self, request: &ListRequest) -> QueryResult<CompiledQuery> {
        let predicates = self.compile_predicates(&request.params, request.condition.as_ref())?;
        let fields = format_fields(&self.schema, &request.fields);
        let sort = format_sort(&self.schema, request.sort_by.as_deref(), request.sort_order)?;
        let page = request.page.unwrap_or(1);
        let pagination = match request.page_size {
            Some(page_size) => Pagination::validated(page, page_size, &self.config)?,
            None => Pagination::unbounded(&self.config).on_page(page, &self.config)?,
        };

        debug!(
            entity = %E::NAME,
            predicates = predicates.len(),
            offset = pagination.offset(),
            limit = pagination.limit(),
            "Compiled query"
        );

        let statement = SelectStatement::new(self.schema.table())
            .select(self.projection(&fields))
            .where_all(predicates)
            .order_by(sort)
            .paginate(pagination)
            .with_relations(fields.relations.clone());

        Ok(CompiledQuery { statement, fields })
    }

    /// Columns to materialize: primary keys, requested scalars, and join keys of requested relations
    fn projection(&self, fields: &FormattedFields) -> Vec<String> {
        if fields.is_empty() {
            return Vec::new();
        }
        let join_keys = fields
            .relations
            .iter()
            .filter_map(|name| self.schema.relation(name))
            .map(|relation| relation.local_key.as_str());

        let mut columns: Vec<String> = Vec::new();
        for column in self
            .schema
            .primary_keys()
            .into_iter()
            .chain(fields.columns.iter().map(String::as_str))
            .chain(join_keys)
        {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
        columns
    }

    /// Run a compiled query: the optional count pass, then the bounded fetch
    pub async fn execute<S>(
        &self,
        session: &S,
        compiled: &CompiledQuery,
        count: bool,
    ) -> QueryResult<Paged<Record>>
    where
        S: StoreSession + ?Sized,
    {
        let total = if count {
            session.count(&self.schema, &compiled.statement).await?
        } else {
            Paged::<Record>::COUNT_NOT_COMPUTED
        };
        let items = session.fetch(&self.schema, &compiled.statement).await?;
        Ok(Paged::new(total, items))
    }

    /// List in the flat form, optionally ANDed with a caller-supplied condition
    pub async fn list<S>(
        &self,
        session: &S,
        query: &FlatQuery,
        condition: Option<&ConditionNode>,
    ) -> QueryResult<Paged<Record>>
    where
        S: StoreSession + ?Sized,
    {
        let compiled = self.compile_flat(query, condition)?;
        self.execute(session, &compiled, query.count).await
    }

    pub fn compile_flat(
        &self,
        query: &FlatQuery,
        condition: Option<&ConditionNode>,
    ) -> QueryResult<CompiledQuery> {
        self.compile(&ListRequest {
            params: query.filter_params(),
            condition: condition.cloned(),
            fields: query.field_selection(),
            sort_by: query.sort_by.clone(),
            sort_order: query.sort_order,
            page: Some(query.page),
            page_size: Some(query.page_size.unwrap_or(self.config.default_page_size)),
        })
    }

    /// List with a full condition tree and no flat parameters
    pub async fn complex_query<S>(
        &self,
        session: &S,
        query: &ComplexQuery,
    ) -> QueryResult<Paged<Record>>
    where
        S: StoreSession + ?Sized,
    {
        let compiled = self.compile_complex(query)?;
        self.execute(session, &compiled, query.count).await
    }

    pub fn compile_complex(&self, query: &ComplexQuery) -> QueryResult<CompiledQuery> {
        self.compile(&ListRequest {
            params: BTreeMap::new(),
            condition: query.condition.clone(),
            fields: query.field_selection(),
            sort_by: query.sort_by.clone(),
            sort_order: query.sort_order,
            page: Some(query.page),
            page_size: Some(query.page_size.unwrap_or(self.config.default_page_size)),
        })
    }

    /// Count rows matching flat filters and an optional condition tree
    pub async fn count<S>(
        &self,
        session: &S,
        params: &BTreeMap<String, Value>,
        condition: Option<&ConditionNode>,
    ) -> QueryResult<i64>
    where
        S: StoreSession + ?Sized,
    {
        let predicates = self.compile_predicates(params, condition)?;
        let statement = SelectStatement::new(self.schema.table()).where_all(predicates);
        Ok(session.count(&self.schema, &statement).await?)
    }

    /// True when at least one row matches
    pub async fn exists<S>(
        &self,
        session: &S,
        params: &BTreeMap<String, Value>,
        condition: Option<&ConditionNode>,
    ) -> QueryResult<bool>
    where
        S: StoreSession + ?Sized,
    {
        Ok(self.count(session, params, condition).await? > 0)
    }

    /// Fetch one window of matching rows
    pub async fn get_list<S>(&self, session: &S, request: &ListRequest) -> QueryResult<Vec<Record>>
    where
        S: StoreSession + ?Sized,
    {
        let compiled = self.compile(request)?;
        Ok(session.fetch(&self.schema, &compiled.statement).await?)
    }

    /// First matching row under the requested sort, if any
    pub async fn get_first<S>(
        &self,
        session: &S,
        request: &ListRequest,
    ) -> QueryResult<Option<Record>>
    where
        S: StoreSession + ?Sized,
    {
        let first = Pagination::first();
        let request = ListRequest {
            page: Some(first.page),
            page_size: Some(first.page_size),
            ..request.clone()
        };
        Ok(self.get_list(session, &request).await?.into_iter().next())
    }

    /// Look up one row by primary key; composite keys are comma-separated in declaration order
    pub async fn get_by_pk<S>(&self, session: &S, pk: &str) -> QueryResult<Option<Record>>
    where
        S: StoreSession + ?Sized,
    {
        let request = self.primary_key_request(pk)?;
        self.get_first(session, &request).await
    }

    fn primary_key_request(&self, pk: &str) -> QueryResult<ListRequest> {
        let keys = self.schema.primary_keys();
        if keys.is_empty() {
            return Err(QueryError::InvalidPrimaryKey {
                reason: format!("{} declares no primary key", E::NAME),
            });
        }
        let parts: Vec<&str> = if keys.len() > 1 {
            pk.split(',').map(str::trim).collect()
        } else {
            vec![pk.trim()]
        };
        if parts.len() != keys.len() || parts.iter().any(|part| part.is_empty()) {
            return Err(QueryError::InvalidPrimaryKey {
                reason: format!(
                    "expected {} component(s) ({}), got `{pk}`",
                    keys.len(),
                    keys.join(",")
                ),
            });
        }

        Ok(keys
            .into_iter()
            .zip(parts)
            .fold(ListRequest::new(), |request, (key, part)| {
                request.param(key, Value::String(part.to_string()))
            }))
    }
}
