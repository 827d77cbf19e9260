use sqlx::{Postgres, QueryBuilder};

use super::conditions::Predicate;
use super::format::SortKey;
use super::pagination::Pagination;
use crate::schema::EntitySchema;

/// A fully validated select over one entity table.
///
/// Statements are compiled before any store I/O happens, so a store only ever sees requests
/// whose fields, operators and pagination have already been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    table: String,
    /// Columns to materialize; empty selects every column
    columns: Vec<String>,
    predicates: Vec<Predicate>,
    order_by: Vec<SortKey>,
    pagination: Option<Pagination>,
    /// Relations to load one level deep after the main fetch
    relations: Vec<String>,
}

impl SelectStatement {
    /// Create a new statement for the given table
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            pagination: None,
            relations: Vec::new(),
        }
    }

    /// Set specific columns to select
    pub fn select(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Add a WHERE predicate; all predicates are ANDed
    pub fn where_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn where_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Add ORDER BY terms, applied in order
    pub fn order_by(mut self, keys: Vec<SortKey>) -> Self {
        self.order_by.extend(keys);
        self
    }

    /// Add pagination (LIMIT/OFFSET)
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_relations(mut self, relations: Vec<String>) -> Self {
        self.relations = relations;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.order_by
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    /// The WHERE clause as a single predicate, if any
    pub fn predicate(&self) -> Option<Predicate> {
        match self.predicates.as_slice() {
            [] => None,
            _ => Some(Predicate::and(self.predicates.clone())),
        }
    }

    /// Same filter without projection, ordering or pagination
    pub fn count_statement(&self) -> Self {
        let mut count = self.clone();
        count.columns.clear();
        count.order_by.clear();
        count.pagination = None;
        count.relations.clear();
        count
    }

    /// Build the SQL with values inlined; used for logging
    pub fn build_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.select_list(), self.table);

        if let Some(predicate) = self.predicate() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate.to_sql());
        }

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self.order_by.iter().map(SortKey::to_sql).collect();
            sql.push_str(&format!(" ORDER BY {}", keys.join(", ")));
        }

        if let Some(ref pagination) = self.pagination {
            sql.push_str(&pagination.to_sql());
        }

        sql
    }

    /// Build the row query with every value bound; each row is one `record` JSON object
    pub fn to_query_builder(&self, schema: &EntitySchema) -> QueryBuilder<'static, Postgres> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {} AS record FROM {}",
            self.json_record(),
            self.table
        ));
        self.push_where(&mut query, schema);

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self.order_by.iter().map(SortKey::to_sql).collect();
            query.push(format!(" ORDER BY {}", keys.join(", ")));
        }

        if let Some(pagination) = self.pagination {
            query.push(" LIMIT ");
            query.push_bind(pagination.limit() as i64);
            query.push(" OFFSET ");
            query.push_bind(pagination.offset() as i64);
        }

        query
    }

    /// Build `SELECT COUNT(*)` over the same filter
    pub fn to_count_query_builder(&self, schema: &EntitySchema) -> QueryBuilder<'static, Postgres> {
        let mut query = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.table));
        self.push_where(&mut query, schema);
        query
    }

    fn push_where(&self, query: &mut QueryBuilder<'static, Postgres>, schema: &EntitySchema) {
        if let Some(predicate) = self.predicate() {
            query.push(" WHERE ");
            predicate.push_sql(query, schema);
        }
    }

    fn select_list(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        }
    }

    fn json_record(&self) -> String {
        if self.columns.is_empty() {
            return format!("to_jsonb({}.*)", self.table);
        }
        let pairs: Vec<String> = self
            .columns
            .iter()
            .map(|column| format!("'{column}', {column}"))
            .collect();
        format!("jsonb_build_object({})", pairs.join(", "))
    }
}
