//! # Result Shaper
//!
//! Serializes fetched rows into response payloads. When a field selection was given, each row
//! keeps its primary keys and the requested fields; join keys fetched only to load relations
//! are dropped. Relation values are shaped recursively:
//!
//! - null relation → `null`
//! - a single related record → that record's object
//! - a collection of related records → a list of objects
//! - anything else → its string form, so un-modeled relation shapes degrade instead of failing

use serde_json::{Map, Value};

use crate::models::Paged;
use crate::query_builder::FormattedFields;
use crate::schema::EntitySchema;
use crate::store::{Record, RelationValue};

/// Shape one relation value
pub fn shape_relation(value: &RelationValue) -> Value {
    match value {
        RelationValue::Null => Value::Null,
        RelationValue::One(record) => dump_record(record),
        RelationValue::Many(records) => Value::Array(records.iter().map(dump_record).collect()),
        RelationValue::Opaque(Value::String(text)) => Value::String(text.clone()),
        RelationValue::Opaque(other) => Value::String(other.to_string()),
    }
}

/// Every column and loaded relation of a record
fn dump_record(record: &Record) -> Value {
    let mut object = record.columns().clone();
    for (name, value) in record.relations() {
        object.insert(name.clone(), shape_relation(value));
    }
    Value::Object(object)
}

/// Shape one fetched row according to the requested fields
pub fn shape_record(schema: &EntitySchema, record: &Record, fields: &FormattedFields) -> Value {
    if fields.is_empty() {
        return dump_record(record);
    }

    let mut object = Map::new();
    let scalars = schema
        .primary_keys()
        .into_iter()
        .chain(fields.columns.iter().map(String::as_str));
    for name in scalars {
        if let Some(value) = record.get(name) {
            object.insert(name.to_string(), value.clone());
        }
    }
    for name in &fields.relations {
        let value = record
            .relation(name)
            .map_or(Value::Null, shape_relation);
        object.insert(name.clone(), value);
    }
    Value::Object(object)
}

/// Shape a paged result into `{count, items}` JSON
pub fn shape_paged(schema: &EntitySchema, paged: &Paged<Record>, fields: &FormattedFields) -> Value {
    let items: Vec<Value> = paged
        .items
        .iter()
        .map(|record| shape_record(schema, record, fields))
        .collect();
    serde_json::json!({
        "count": paged.count,
        "items": items,
    })
}
