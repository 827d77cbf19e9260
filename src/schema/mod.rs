//! # Entity Schema Descriptors
//!
//! Static, read-only descriptions of an entity's columns, keys and relations. Every field
//! referenced by a filter, sort key or output-field request is resolved against one of these.
//!
//! Descriptors are authored by hand through [`EntitySchema::builder`] inside an
//! [`Entity::describe`] implementation and cached per type by a [`SchemaRegistry`].
//!
//! ```rust
//! use sieve_core::schema::{ColumnType, EntitySchema, RelationDescriptor};
//!
//! let schema = EntitySchema::builder("Hero", "hero")
//!     .primary_key("id", ColumnType::Integer)
//!     .indexed("name", ColumnType::Text)
//!     .column("age", ColumnType::Integer)
//!     .column("team_id", ColumnType::Integer)
//!     .relation("team", RelationDescriptor::one("Team", "team", "team_id", "id"))
//!     .build();
//!
//! assert_eq!(schema.primary_keys(), vec!["id"]);
//! assert!(schema.is_indexed("name"));
//! assert_eq!(schema.relation_fields(), vec!["team"]);
//! ```

pub mod registry;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{QueryError, QueryResult};

pub use registry::SchemaRegistry;

/// An entity type with a statically known schema
pub trait Entity: Send + Sync + 'static {
    /// Entity name used in logs and error messages
    const NAME: &'static str;

    /// Build the descriptor; called at most once per registry
    fn describe() -> EntitySchema;
}

/// Whether a field is a materialized column or a link to another entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    Relation,
}

/// Storage type of a scalar column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Json,
}

impl ColumnType {
    /// PostgreSQL type name used when casting bound text parameters
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "bigint",
            ColumnType::Float => "double precision",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamptz",
            ColumnType::Json => "jsonb",
        }
    }
}

/// How many related rows a relation resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    Many,
}

/// Link from one entity to another, loaded one level deep on request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub target_entity: String,
    pub target_table: String,
    /// Column on this entity holding the join value
    pub local_key: String,
    /// Column on the target entity matched against `local_key`
    pub remote_key: String,
    pub cardinality: Cardinality,
}

impl RelationDescriptor {
    /// Many-to-one (or one-to-one) relation, e.g. `hero.team_id -> team.id`
    pub fn one(target_entity: &str, target_table: &str, local_key: &str, remote_key: &str) -> Self {
        Self {
            target_entity: target_entity.to_string(),
            target_table: target_table.to_string(),
            local_key: local_key.to_string(),
            remote_key: remote_key.to_string(),
            cardinality: Cardinality::One,
        }
    }

    /// One-to-many relation, e.g. `team.id -> hero.team_id`
    pub fn many(
        target_entity: &str,
        target_table: &str,
        local_key: &str,
        remote_key: &str,
    ) -> Self {
        Self {
            cardinality: Cardinality::Many,
            ..Self::one(target_entity, target_table, local_key, remote_key)
        }
    }
}

/// A single field of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub indexed: bool,
    pub primary_key: bool,
    pub relation: Option<RelationDescriptor>,
}

impl FieldDescriptor {
    pub fn kind(&self) -> FieldKind {
        if self.relation.is_some() {
            FieldKind::Relation
        } else {
            FieldKind::Scalar
        }
    }

    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }
}

/// Immutable description of an entity's fields, keys and relations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    entity: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    positions: HashMap<String, usize>,
}

impl EntitySchema {
    pub fn builder(entity: &str, table: &str) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            schema: EntitySchema {
                entity: entity.to_string(),
                table: table.to_string(),
                fields: Vec::new(),
                positions: HashMap::new(),
            },
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Every field name, in declaration order
    pub fn fields(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.positions.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Scalar column names, in declaration order
    pub fn scalar_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| !f.is_relation())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Relation field names, in declaration order
    pub fn relation_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_relation())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Primary key columns, in declaration order (composite keys have several)
    pub fn primary_keys(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn is_indexed(&self, field: &str) -> bool {
        self.field(field).is_some_and(|f| f.indexed || f.primary_key)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.field(name).and_then(|f| f.relation.as_ref())
    }

    /// Resolve a field that must be a filterable scalar column
    pub fn scalar_field(&self, name: &str) -> QueryResult<&FieldDescriptor> {
        match self.field(name) {
            Some(field) if field.is_relation() => Err(QueryError::RelationNotFilterable {
                field: name.to_string(),
            }),
            Some(field) => Ok(field),
            None => Err(QueryError::field_not_found(name)),
        }
    }
}

/// Builder for [`EntitySchema`]; redeclaring a name replaces the earlier declaration in place
#[derive(Debug)]
pub struct EntitySchemaBuilder {
    schema: EntitySchema,
}

impl EntitySchemaBuilder {
    pub fn primary_key(self, name: &str, column_type: ColumnType) -> Self {
        self.push(FieldDescriptor {
            name: name.to_string(),
            column_type,
            indexed: true,
            primary_key: true,
            relation: None,
        })
    }

    pub fn indexed(self, name: &str, column_type: ColumnType) -> Self {
        self.push(FieldDescriptor {
            name: name.to_string(),
            column_type,
            indexed: true,
            primary_key: false,
            relation: None,
        })
    }

    pub fn column(self, name: &str, column_type: ColumnType) -> Self {
        self.push(FieldDescriptor {
            name: name.to_string(),
            column_type,
            indexed: false,
            primary_key: false,
            relation: None,
        })
    }

    pub fn relation(self, name: &str, relation: RelationDescriptor) -> Self {
        self.push(FieldDescriptor {
            name: name.to_string(),
            column_type: ColumnType::Json,
            indexed: false,
            primary_key: false,
            relation: Some(relation),
        })
    }

    fn push(mut self, field: FieldDescriptor) -> Self {
        match self.schema.positions.get(&field.name) {
            Some(&idx) => self.schema.fields[idx] = field,
            None => {
                self.schema
                    .positions
                    .insert(field.name.clone(), self.schema.fields.len());
                self.schema.fields.push(field);
            }
        }
        self
    }

    pub fn build(self) -> EntitySchema {
        self.schema
    }
}
