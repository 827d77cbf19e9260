//! Flat query parameter compilation.
//!
//! Every parameter becomes one predicate; the resulting list is implicitly ANDed. Parameters
//! with a null value are skipped, mirroring an unset query-string key.

use serde_json::Value;
use std::collections::BTreeMap;

use super::condition_builder::{compile_operator, CompileOptions, Grammar};
use super::conditions::Predicate;
use super::operators::parse_flat_key;
use crate::error::{QueryError, QueryResult};
use crate::schema::EntitySchema;

/// Compile flat `field` / `field__op` parameters into predicates
pub fn build_conditions(
    schema: &EntitySchema,
    params: &BTreeMap<String, Value>,
    options: CompileOptions,
) -> QueryResult<Vec<Predicate>> {
    let mut conditions = Vec::with_capacity(params.len());
    for (key, value) in params {
        if value.is_null() {
            continue;
        }
        let flat = parse_flat_key(key, schema)?;
        let field = schema.field(flat.field).ok_or_else(|| QueryError::field_not_found(key))?;
        if field.is_relation() {
            return Err(QueryError::RelationNotFilterable {
                field: key.clone(),
            });
        }
        conditions.push(compile_operator(
            field,
            flat.operator,
            value,
            Grammar::Flat,
            options,
        )?);
    }
    Ok(conditions)
}
