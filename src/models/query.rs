//! Request and response shapes consumed by the retrieval operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{QueryError, QueryResult};
use crate::query_builder::{ConditionNode, FieldSelection, SortOrder};

/// Keys of a flat query that are never treated as filters
pub const RESERVED_QUERY_KEYS: [&str; 6] =
    ["page", "page_size", "sort_by", "sort_order", "fields", "count"];

fn default_page() -> u32 {
    1
}

/// A list request in the flat `field` / `field__op` form.
///
/// Any key that is not one of [`RESERVED_QUERY_KEYS`] lands in `params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    /// Falls back to the configured default page size
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Comma-separated output fields
    #[serde(default)]
    pub fields: String,
    #[serde(default)]
    pub count: bool,
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
    #[serde(skip)]
    excluded: Vec<String>,
}

impl Default for FlatQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
            fields: String::new(),
            count: false,
            params: BTreeMap::new(),
            excluded: Vec::new(),
        }
    }
}

impl FlatQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw query-string pairs, parsing the reserved keys
    pub fn from_pairs<I, K, V>(pairs: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            match key.as_str() {
                "page" => query.page = parse_number(&key, &value)?,
                "page_size" => query.page_size = Some(parse_number(&key, &value)?),
                "sort_by" => query.sort_by = Some(value),
                "sort_order" => query.sort_order = value.parse()?,
                "fields" => query.fields = value,
                "count" => query.count = parse_flag(&key, &value)?,
                _ => {
                    query.params.insert(key, Value::String(value));
                }
            }
        }
        Ok(query)
    }

    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = Some(page_size);
        self
    }

    pub fn with_sort(mut self, sort_by: &str, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.to_string());
        self.sort_order = sort_order;
        self
    }

    pub fn with_fields(mut self, fields: &str) -> Self {
        self.fields = fields.to_string();
        self
    }

    pub fn with_count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    /// Declare extra keys accepted on the request but never compiled as filters
    pub fn exclude_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Filter parameters with excluded keys removed
    pub fn filter_params(&self) -> BTreeMap<String, Value> {
        self.params
            .iter()
            .filter(|(key, _)| !self.excluded.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn field_selection(&self) -> FieldSelection {
        FieldSelection::Csv(self.fields.clone())
    }
}

fn parse_number(key: &str, value: &str) -> QueryResult<u32> {
    value.trim().parse().map_err(|_| {
        QueryError::invalid_pagination(format!(
            "{key} must be a non-negative integer, got `{value}`"
        ))
    })
}

fn parse_flag(key: &str, value: &str) -> QueryResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(QueryError::invalid_value(
            key,
            format!("expected a boolean, got `{value}`"),
        )),
    }
}

/// A list request carrying a full condition tree instead of flat parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComplexQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub count: bool,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub condition: Option<ConditionNode>,
}

impl Default for ComplexQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
            count: false,
            fields: Vec::new(),
            condition: None,
        }
    }
}

impl ComplexQuery {
    pub fn field_selection(&self) -> FieldSelection {
        FieldSelection::List(self.fields.clone())
    }
}

/// `{count, items}` envelope returned by every list-style operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    /// Total matching rows, or [`Paged::COUNT_NOT_COMPUTED`]
    pub count: i64,
    pub items: Vec<T>,
}

impl<T> Paged<T> {
    /// Sentinel meaning the caller did not ask for a total
    pub const COUNT_NOT_COMPUTED: i64 = -1;

    pub fn new(count: i64, items: Vec<T>) -> Self {
        Self { count, items }
    }

    pub fn is_counted(&self) -> bool {
        self.count != Self::COUNT_NOT_COMPUTED
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            count: self.count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Response envelope a routing layer returns to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn from_error(error: &QueryError) -> Self {
        Self {
            code: error.status_code(),
            message: error.to_string(),
            data: None,
        }
    }
}
