//! In-process store that evaluates compiled statements over seeded JSON rows.
//!
//! Comparison follows SQL closely enough for tests and local use: NULL never compares, numeric
//! text compares numerically, and timestamps compare chronologically whether written with a
//! `T` or a space separator.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use tracing::debug;

use super::{attach_relation, Record, StoreSession};
use crate::error::StoreError;
use crate::query_builder::{Comparison, Predicate, SelectStatement, SortOrder};
use crate::schema::EntitySchema;

/// Thread-safe in-memory tables keyed by table name
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
    fetch_calls: AtomicUsize,
    count_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one JSON object row to `table`
    pub fn insert(&self, table: &str, row: Value) -> Result<(), StoreError> {
        self.insert_record(table, Record::from_json(row)?);
        Ok(())
    }

    pub fn insert_record(&self, table: &str, record: Record) {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(record);
    }

    pub fn insert_many(
        &self,
        table: &str,
        rows: impl IntoIterator<Item = Value>,
    ) -> Result<(), StoreError> {
        rows.into_iter().try_for_each(|row| self.insert(table, row))
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }

    /// Number of `fetch` calls received so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of `count` calls received so far
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(AtomicOrdering::SeqCst)
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn matching_rows(&self, table: &str, predicate: Option<&Predicate>) -> Vec<Record> {
        let tables = self.tables.read();
        tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| predicate.map_or(true, |p| evaluate(p, row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl StoreSession for MemoryStore {
    async fn fetch(
        &self,
        schema: &EntitySchema,
        statement: &SelectStatement,
    ) -> Result<Vec<Record>, StoreError> {
        self.fetch_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_available()?;
        debug!(entity = %schema.entity(), sql = %statement.build_sql(), "Fetching rows");

        let predicate = statement.predicate();
        let mut rows = self.matching_rows(statement.table(), predicate.as_ref());

        let keys = statement.sort_keys();
        if !keys.is_empty() {
            rows.sort_by(|a, b| {
                keys.iter()
                    .map(|key| {
                        let ordering = sort_cmp(a.get(&key.field), b.get(&key.field));
                        match key.order {
                            SortOrder::Asc => ordering,
                            SortOrder::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let mut rows: Vec<Record> = match statement.pagination() {
            Some(window) => rows
                .into_iter()
                .skip(usize::try_from(window.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(window.limit()).unwrap_or(usize::MAX))
                .collect(),
            None => rows,
        };

        if !statement.columns().is_empty() {
            for row in &mut rows {
                row.project(statement.columns());
            }
        }

        for name in statement.relations() {
            let Some(relation) = schema.relation(name) else {
                continue;
            };
            let related = self.matching_rows(&relation.target_table, None);
            attach_relation(&mut rows, name, relation, related);
        }

        Ok(rows)
    }

    async fn count(
        &self,
        schema: &EntitySchema,
        statement: &SelectStatement,
    ) -> Result<i64, StoreError> {
        self.count_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_available()?;
        debug!(
            entity = %schema.entity(),
            sql = %statement.count_statement().build_sql(),
            "Counting rows"
        );

        let predicate = statement.predicate();
        let matched = self.matching_rows(statement.table(), predicate.as_ref()).len();
        Ok(i64::try_from(matched).unwrap_or(i64::MAX))
    }
}

static NULL: Value = Value::Null;

fn column<'r>(row: &'r Record, field: &str) -> &'r Value {
    row.get(field).unwrap_or(&NULL)
}

/// Evaluate a predicate against one row
pub fn evaluate(predicate: &Predicate, row: &Record) -> bool {
    match predicate {
        Predicate::Compare { field, op, value } => compare(column(row, field), *op, value),
        Predicate::In { field, values } => {
            let actual = column(row, field);
            !actual.is_null()
                && values
                    .iter()
                    .any(|v| loose_cmp(actual, v) == Some(Ordering::Equal))
        }
        Predicate::NotIn { field, values } => {
            let actual = column(row, field);
            !actual.is_null()
                && values
                    .iter()
                    .all(|v| loose_cmp(actual, v) != Some(Ordering::Equal))
        }
        Predicate::JsonContains { field, value } => {
            let needle = Value::String(value.clone());
            match column(row, field) {
                Value::Array(items) => items.contains(&needle),
                other => *other == needle,
            }
        }
        Predicate::Like { field, pattern } => match column(row, field) {
            Value::Null => false,
            Value::String(text) => like_match(text, pattern),
            other => like_match(&other.to_string(), pattern),
        },
        Predicate::And(predicates) => predicates.iter().all(|p| evaluate(p, row)),
        Predicate::Or(predicates) => predicates.iter().any(|p| evaluate(p, row)),
    }
}

fn compare(actual: &Value, op: Comparison, expected: &Value) -> bool {
    if expected.is_null() {
        return match op {
            Comparison::Eq => actual.is_null(),
            Comparison::Ne => !actual.is_null(),
            _ => false,
        };
    }
    if actual.is_null() {
        return false;
    }
    let Some(ordering) = loose_cmp(actual, expected) else {
        return false;
    };
    match op {
        Comparison::Eq => ordering == Ordering::Equal,
        Comparison::Ne => ordering != Ordering::Equal,
        Comparison::Lt => ordering == Ordering::Less,
        Comparison::Gt => ordering == Ordering::Greater,
        Comparison::Le => ordering != Ordering::Greater,
        Comparison::Ge => ordering != Ordering::Less,
    }
}

/// Compare two JSON values the way a typed column would after casting text parameters
fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(s)) => x.as_f64()?.partial_cmp(&s.trim().parse().ok()?),
        (Value::String(s), Value::Number(y)) => {
            s.trim().parse::<f64>().ok()?.partial_cmp(&y.as_f64()?)
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::String(s)) | (Value::String(s), Value::Bool(x)) => {
            let parsed = parse_bool(s)?;
            let ordering = x.cmp(&parsed);
            Some(if matches!(a, Value::Bool(_)) {
                ordering
            } else {
                ordering.reverse()
            })
        }
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => Some(tx.cmp(&ty)),
            _ => Some(x.cmp(y)),
        },
        _ => (a == b).then_some(Ordering::Equal),
    }
}

/// Total order for sorting; NULLs sort last in ascending order
fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => type_rank(x)
            .cmp(&type_rank(y))
            .then_with(|| same_type_cmp(x, y)),
    }
}

/// Sort rank of a JSON type; timestamps sort before other strings
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(s) if parse_timestamp(s).is_some() => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order between two values of the same rank
fn same_type_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx.total_cmp(&fy),
            _ => x.to_string().cmp(&y.to_string()),
        },
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// SQL LIKE with `%`, `_` and backslash escapes
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_from(&text, &pattern)
}

fn like_from(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|skip| like_from(&text[skip..], rest)),
        Some(('_', rest)) => !text.is_empty() && like_from(&text[1..], rest),
        Some(('\\', rest)) if !rest.is_empty() => {
            text.first() == rest.first() && like_from(&text[1..], &rest[1..])
        }
        Some((ch, rest)) => text.first() == Some(ch) && like_from(&text[1..], rest),
    }
}
