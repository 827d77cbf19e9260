use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use crate::schema::{ColumnType, EntitySchema};

/// Comparison operators that compile to a binary SQL comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparison {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Lt => "<",
            Comparison::Gt => ">",
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
        }
    }
}

/// Backend-neutral boolean expression compiled from flat parameters or a condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: String,
        op: Comparison,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    /// Always rendered as `NOT (field IN (...))`
    NotIn {
        field: String,
        values: Vec<Value>,
    },
    /// Array/document containment of a scalar, evaluated by the backend
    JsonContains {
        field: String,
        value: String,
    },
    /// `pattern` is a complete LIKE pattern, wildcards included
    Like {
        field: String,
        pattern: String,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(field: &str, op: Comparison, value: Value) -> Self {
        Predicate::Compare {
            field: field.to_string(),
            op,
            value,
        }
    }

    pub fn eq(field: &str, value: Value) -> Self {
        Self::compare(field, Comparison::Eq, value)
    }

    /// Substring match with wildcards on both ends; LIKE metacharacters in `needle` are escaped
    pub fn contains(field: &str, needle: &str) -> Self {
        Predicate::Like {
            field: field.to_string(),
            pattern: format!("%{}%", like_escape(needle)),
        }
    }

    /// Conjunction that collapses a single operand to itself
    pub fn and(mut predicates: Vec<Predicate>) -> Self {
        if predicates.len() == 1 {
            predicates.remove(0)
        } else {
            Predicate::And(predicates)
        }
    }

    /// Disjunction that collapses a single operand to itself
    pub fn or(mut predicates: Vec<Predicate>) -> Self {
        if predicates.len() == 1 {
            predicates.remove(0)
        } else {
            Predicate::Or(predicates)
        }
    }

    /// Render with values inlined; used for logging and assertions
    pub fn to_sql(&self) -> String {
        match self {
            Predicate::Compare { field, op, value } => {
                if value.is_null() {
                    null_comparison(field, *op).to_string()
                } else {
                    format!("{} {} {}", field, op.to_sql(), format_value(value))
                }
            }
            Predicate::In { field, values } => {
                if values.is_empty() {
                    return "1=0".to_string();
                }
                let value_list = values
                    .iter()
                    .map(format_value)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{field} IN ({value_list})")
            }
            Predicate::NotIn { field, values } => {
                if values.is_empty() {
                    return "1=1".to_string();
                }
                let value_list = values
                    .iter()
                    .map(format_value)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("NOT ({field} IN ({value_list}))")
            }
            Predicate::JsonContains { field, value } => {
                format!("{} @> {}", field, format_json_scalar(value))
            }
            Predicate::Like { field, pattern } => {
                format!("{} LIKE {}", field, format_value(&Value::String(pattern.clone())))
            }
            Predicate::And(predicates) => join_sql(predicates, " AND ", "1=1"),
            Predicate::Or(predicates) => join_sql(predicates, " OR ", "1=0"),
        }
    }

    /// Render into a sqlx query with every value bound as a parameter.
    ///
    /// String values compared against non-text columns are cast to the column's type, so
    /// raw query-string values work against typed columns.
    pub fn push_sql(&self, query: &mut QueryBuilder<'static, Postgres>, schema: &EntitySchema) {
        match self {
            Predicate::Compare { field, op, value } => {
                if value.is_null() {
                    query.push(null_comparison(field, *op));
                } else {
                    query.push(format!("{} {} ", field, op.to_sql()));
                    push_value(query, schema, field, value);
                }
            }
            Predicate::In { field, values } => {
                if values.is_empty() {
                    query.push("1=0");
                } else {
                    query.push(format!("{field} IN ("));
                    push_value_list(query, schema, field, values);
                    query.push(")");
                }
            }
            Predicate::NotIn { field, values } => {
                if values.is_empty() {
                    query.push("1=1");
                } else {
                    query.push(format!("NOT ({field} IN ("));
                    push_value_list(query, schema, field, values);
                    query.push("))");
                }
            }
            Predicate::JsonContains { field, value } => {
                query.push(format!("{field} @> "));
                query.push_bind(Value::String(value.clone()).to_string());
                query.push("::jsonb");
            }
            Predicate::Like { field, pattern } => {
                query.push(format!("{field} LIKE "));
                query.push_bind(pattern.clone());
            }
            Predicate::And(predicates) => push_joined(query, schema, predicates, " AND ", "1=1"),
            Predicate::Or(predicates) => push_joined(query, schema, predicates, " OR ", "1=0"),
        }
    }
}

fn null_comparison(field: &str, op: Comparison) -> String {
    match op {
        Comparison::Eq => format!("{field} IS NULL"),
        Comparison::Ne => format!("{field} IS NOT NULL"),
        // Ordering against NULL is never true
        _ => "1=0".to_string(),
    }
}

fn join_sql(predicates: &[Predicate], separator: &str, empty: &str) -> String {
    match predicates {
        [] => empty.to_string(),
        [single] => single.to_sql(),
        _ => {
            let parts: Vec<String> = predicates.iter().map(Predicate::to_sql).collect();
            format!("({})", parts.join(separator))
        }
    }
}

fn push_joined(
    query: &mut QueryBuilder<'static, Postgres>,
    schema: &EntitySchema,
    predicates: &[Predicate],
    separator: &str,
    empty: &str,
) {
    match predicates {
        [] => {
            query.push(empty);
        }
        [single] => single.push_sql(query, schema),
        _ => {
            query.push("(");
            for (idx, predicate) in predicates.iter().enumerate() {
                if idx > 0 {
                    query.push(separator);
                }
                predicate.push_sql(query, schema);
            }
            query.push(")");
        }
    }
}

fn push_value_list(
    query: &mut QueryBuilder<'static, Postgres>,
    schema: &EntitySchema,
    field: &str,
    values: &[Value],
) {
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            query.push(", ");
        }
        push_value(query, schema, field, value);
    }
}

fn push_value(
    query: &mut QueryBuilder<'static, Postgres>,
    schema: &EntitySchema,
    field: &str,
    value: &Value,
) {
    let column_type = schema
        .field(field)
        .map(|f| f.column_type)
        .unwrap_or_default();
    match value {
        Value::Null => {
            query.push("NULL");
        }
        // Text columns compare against the scalar's text form
        Value::Bool(_) | Value::Number(_) if column_type == ColumnType::Text => {
            query.push_bind(value.to_string());
            query.push("::text");
        }
        Value::Bool(b) => {
            query.push_bind(*b);
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.push_bind(i);
            } else if let Some(f) = n.as_f64() {
                query.push_bind(f);
            } else {
                query.push_bind(n.to_string());
            }
        }
        Value::String(s) => {
            query.push_bind(s.clone());
            if column_type != ColumnType::Text {
                query.push(format!("::{}", column_type.sql_type()));
            }
        }
        Value::Array(_) | Value::Object(_) => {
            query.push_bind(sqlx::types::Json(value.clone()));
        }
    }
}

/// Escape LIKE metacharacters so `s` matches literally
pub fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

/// Format a JSON value for SQL
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        _ => format!("'{}'", value.to_string().replace('\'', "''")),
    }
}

/// Format a scalar as a JSON string literal for containment checks
fn format_json_scalar(value: &str) -> String {
    format!(
        "'{}'::jsonb",
        Value::String(value.to_string()).to_string().replace('\'', "''")
    )
}
