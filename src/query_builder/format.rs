//! Field selection and sort formatting.
//!
//! The two validate differently on purpose: selecting an unknown output field is harmless and
//! silently dropped, while sorting on one is a caller error.

use serde::{Deserialize, Serialize};

use super::operators::SortOrder;
use crate::error::{QueryError, QueryResult};
use crate::schema::EntitySchema;

/// Split a comma-separated string, trimming items and dropping empty ones
pub fn split_comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Requested output fields, either `"id,name"` or `["id", "name"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSelection {
    List(Vec<String>),
    Csv(String),
}

impl FieldSelection {
    pub fn names(&self) -> Vec<String> {
        match self {
            FieldSelection::List(names) => names
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            FieldSelection::Csv(raw) => split_comma_separated(raw),
        }
    }
}

impl Default for FieldSelection {
    fn default() -> Self {
        FieldSelection::List(Vec::new())
    }
}

impl From<&str> for FieldSelection {
    fn from(raw: &str) -> Self {
        FieldSelection::Csv(raw.to_string())
    }
}

impl From<Vec<String>> for FieldSelection {
    fn from(names: Vec<String>) -> Self {
        FieldSelection::List(names)
    }
}

/// Requested fields split by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedFields {
    /// Scalar columns to materialize
    pub columns: Vec<String>,
    /// Relations to load one level deep
    pub relations: Vec<String>,
}

impl FormattedFields {
    /// Nothing requested: materialize every column and load no relations
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.relations.is_empty()
    }
}

/// Classify requested fields into scalar columns and relations, dropping unknown names
pub fn format_fields(schema: &EntitySchema, requested: &FieldSelection) -> FormattedFields {
    let mut formatted = FormattedFields::default();
    for name in requested.names() {
        let Some(field) = schema.field(&name) else {
            continue;
        };
        let bucket = if field.is_relation() {
            &mut formatted.relations
        } else {
            &mut formatted.columns
        };
        if !bucket.contains(&name) {
            bucket.push(name);
        }
    }
    formatted
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.field, self.order.to_sql())
    }
}

/// Validate comma-separated sort fields and apply `order` to each of them
pub fn format_sort(
    schema: &EntitySchema,
    sort_by: Option<&str>,
    order: SortOrder,
) -> QueryResult<Vec<SortKey>> {
    let Some(sort_by) = sort_by else {
        return Ok(Vec::new());
    };

    split_comma_separated(sort_by)
        .into_iter()
        .map(|field| match schema.field(&field) {
            Some(descriptor) if !descriptor.is_relation() => Ok(SortKey { field, order }),
            _ => Err(QueryError::InvalidSortField { field }),
        })
        .collect()
}
