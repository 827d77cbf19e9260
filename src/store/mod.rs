//! # Data-Store Sessions
//!
//! A [`StoreSession`] executes compiled [`SelectStatement`]s. The engine only ever hands a
//! session statements that passed validation, and never retries or wraps store failures.
//!
//! Two sessions ship with the crate:
//!
//! - [`PgSession`] runs statements against PostgreSQL through a `sqlx` pool
//! - [`MemoryStore`] evaluates statements in-process over seeded JSON rows

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::error::StoreError;
use crate::query_builder::SelectStatement;
use crate::schema::{Cardinality, EntitySchema, RelationDescriptor};

pub use memory::MemoryStore;
pub use postgres::PgSession;

/// Executes compiled statements against a backend
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Fetch the rows selected by `statement`, with requested relations attached
    async fn fetch(
        &self,
        schema: &EntitySchema,
        statement: &SelectStatement,
    ) -> Result<Vec<Record>, StoreError>;

    /// Count the rows matching the statement's filter, ignoring its window
    async fn count(
        &self,
        schema: &EntitySchema,
        statement: &SelectStatement,
    ) -> Result<i64, StoreError>;
}

/// A loaded related value
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    Null,
    One(Box<Record>),
    Many(Vec<Record>),
    /// A value the store produced that is neither a record nor a list of records
    Opaque(Value),
}

impl RelationValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => RelationValue::Null,
            Value::Object(columns) => RelationValue::One(Box::new(Record::new(columns))),
            Value::Array(items) if items.iter().all(Value::is_object) => RelationValue::Many(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(columns) => Some(Record::new(columns)),
                        _ => None,
                    })
                    .collect(),
            ),
            other => RelationValue::Opaque(other),
        }
    }
}

/// One materialized row: scalar columns plus any relations loaded for it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Map<String, Value>,
    relations: BTreeMap<String, RelationValue>,
}

impl Record {
    pub fn new(columns: Map<String, Value>) -> Self {
        Self {
            columns,
            relations: BTreeMap::new(),
        }
    }

    /// Build a record from a JSON object row
    pub fn from_json(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(columns) => Ok(Self::new(columns)),
            other => Err(StoreError::Decode(format!(
                "expected a JSON object row, got `{other}`"
            ))),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> &Map<String, Value> {
        &self.columns
    }

    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> &BTreeMap<String, RelationValue> {
        &self.relations
    }

    pub fn set_relation(&mut self, name: &str, value: RelationValue) {
        self.relations.insert(name.to_string(), value);
    }

    /// Keep only the named columns
    pub fn project(&mut self, columns: &[String]) {
        self.columns.retain(|name, _| columns.contains(name));
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + self.relations.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        for (name, value) in &self.relations {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for RelationValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RelationValue::Null => serializer.serialize_none(),
            RelationValue::One(record) => record.serialize(serializer),
            RelationValue::Many(records) => records.serialize(serializer),
            RelationValue::Opaque(value) => value.serialize(serializer),
        }
    }
}

/// Text form of a join key; SQL NULL never joins
pub(crate) fn join_key(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Distinct join keys held by `records` in the relation's local column
pub(crate) fn local_keys(records: &[Record], relation: &RelationDescriptor) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for record in records {
        if let Some(key) = join_key(record.get(&relation.local_key)) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Attach `related` rows to each record by matching `local_key` against `remote_key`
pub(crate) fn attach_relation(
    records: &mut [Record],
    name: &str,
    relation: &RelationDescriptor,
    related: Vec<Record>,
) {
    let mut by_key: HashMap<String, Vec<Record>> = HashMap::new();
    for row in related {
        if let Some(key) = join_key(row.get(&relation.remote_key)) {
            by_key.entry(key).or_default().push(row);
        }
    }

    for record in records.iter_mut() {
        let matches = join_key(record.get(&relation.local_key))
            .and_then(|key| by_key.get(&key))
            .cloned()
            .unwrap_or_default();
        let value = match relation.cardinality {
            Cardinality::One => matches
                .into_iter()
                .next()
                .map_or(RelationValue::Null, |row| RelationValue::One(Box::new(row))),
            Cardinality::Many => RelationValue::Many(matches),
        };
        record.set_relation(name, value);
    }
}
