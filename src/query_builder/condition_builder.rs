//! # Condition Compiler
//!
//! Compiles condition trees into [`Predicate`]s. A tree node is either a single
//! [`ConditionLeaf`] or a [`LogicGroup`] combining nested nodes:
//!
//! ```json
//! {"and_": [{"field": "team_id", "operator": "eq", "value": 1},
//!           {"or_": [{"field": "name", "operator": "like", "value": "浩"},
//!                    {"field": "age", "operator": "ge", "value": 18}]}]}
//! ```
//!
//! Group semantics:
//! - an absent or empty branch contributes nothing (vacuously true)
//! - nested groups that compile to nothing are dropped from their parent's branch
//! - when both `and_` and `or_` are present they form two independent sub-expressions that are
//!   ANDed together; their children are never interleaved

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::conditions::{Comparison, Predicate};
use super::format::split_comma_separated;
use super::operators::Operator;
use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::schema::{ColumnType, EntitySchema, FieldDescriptor};

/// A single field/operator/value filter atom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionLeaf {
    pub field: String,
    #[serde(default)]
    pub operator: Operator,
    pub value: Value,
}

impl ConditionLeaf {
    pub fn new(field: &str, operator: Operator, value: Value) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
        }
    }
}

/// Recursive AND/OR combination of leaves and nested groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogicGroup {
    #[serde(default, rename = "and_", skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<ConditionNode>>,
    #[serde(default, rename = "or_", skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<ConditionNode>>,
}

impl LogicGroup {
    pub fn all(nodes: Vec<ConditionNode>) -> Self {
        Self {
            and: Some(nodes),
            or: None,
        }
    }

    pub fn any(nodes: Vec<ConditionNode>) -> Self {
        Self {
            and: None,
            or: Some(nodes),
        }
    }
}

/// A condition tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Leaf(ConditionLeaf),
    Group(LogicGroup),
}

impl From<ConditionLeaf> for ConditionNode {
    fn from(leaf: ConditionLeaf) -> Self {
        ConditionNode::Leaf(leaf)
    }
}

impl From<LogicGroup> for ConditionNode {
    fn from(group: LogicGroup) -> Self {
        ConditionNode::Group(group)
    }
}

/// Grammar switches that vary by storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Rewrite a single-value flat `in` to equality
    pub single_value_in_as_eq: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            single_value_in_as_eq: true,
        }
    }
}

impl From<&QueryConfig> for CompileOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            single_value_in_as_eq: config.single_value_in_as_eq,
        }
    }
}

/// Which input grammar an operator is being compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Grammar {
    Flat,
    Tree,
}

/// Compiles condition trees against one entity schema
#[derive(Debug, Clone, Copy)]
pub struct ConditionBuilder<'a> {
    schema: &'a EntitySchema,
    options: CompileOptions,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(schema: &'a EntitySchema) -> Self {
        Self {
            schema,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile an optional tree; `None` means "no predicate" (matches everything)
    pub fn build(&self, node: Option<&ConditionNode>) -> QueryResult<Option<Predicate>> {
        match node {
            None => Ok(None),
            Some(ConditionNode::Leaf(leaf)) => self.build_leaf(leaf).map(Some),
            Some(ConditionNode::Group(group)) => self.build_group(group),
        }
    }

    pub fn build_leaf(&self, leaf: &ConditionLeaf) -> QueryResult<Predicate> {
        let field = self.schema.scalar_field(&leaf.field)?;
        compile_operator(field, leaf.operator, &leaf.value, Grammar::Tree, self.options)
    }

    pub fn build_group(&self, group: &LogicGroup) -> QueryResult<Option<Predicate>> {
        let mut outer = Vec::with_capacity(2);
        if let Some(items) = group.and.as_deref() {
            if let Some(clause) = self.process_conditions(items, Predicate::and)? {
                outer.push(clause);
            }
        }
        if let Some(items) = group.or.as_deref() {
            if let Some(clause) = self.process_conditions(items, Predicate::or)? {
                outer.push(clause);
            }
        }

        if outer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Predicate::and(outer)))
        }
    }

    fn process_conditions(
        &self,
        items: &[ConditionNode],
        combine: fn(Vec<Predicate>) -> Predicate,
    ) -> QueryResult<Option<Predicate>> {
        let mut clauses = Vec::with_capacity(items.len());
        for item in items {
            if let Some(clause) = self.build(Some(item))? {
                clauses.push(clause);
            }
        }

        if clauses.is_empty() {
            Ok(None)
        } else {
            Ok(Some(combine(clauses)))
        }
    }
}

/// Compile one operator application; shared by the flat and tree grammars
pub(crate) fn compile_operator(
    field: &FieldDescriptor,
    operator: Operator,
    value: &Value,
    grammar: Grammar,
    options: CompileOptions,
) -> QueryResult<Predicate> {
    let name = field.name.as_str();
    let predicate = match operator {
        Operator::Eq => Predicate::compare(name, Comparison::Eq, value.clone()),
        Operator::Ne => Predicate::compare(name, Comparison::Ne, value.clone()),
        Operator::Lt => Predicate::compare(name, Comparison::Lt, value.clone()),
        Operator::Gt => Predicate::compare(name, Comparison::Gt, value.clone()),
        Operator::Le => Predicate::compare(name, Comparison::Le, value.clone()),
        Operator::Ge => Predicate::compare(name, Comparison::Ge, value.clone()),
        Operator::In => {
            let mut values = multi_values(field, value)?;
            // Single-element set membership is unreliable on some backends
            if grammar == Grammar::Flat && options.single_value_in_as_eq && values.len() == 1 {
                Predicate::eq(name, values.remove(0))
            } else {
                Predicate::In {
                    field: name.to_string(),
                    values,
                }
            }
        }
        Operator::NotIn => Predicate::NotIn {
            field: name.to_string(),
            values: multi_values(field, value)?,
        },
        Operator::JsonContains => Predicate::JsonContains {
            field: name.to_string(),
            value: scalar_text(name, value)?,
        },
        Operator::Like => Predicate::contains(name, &scalar_text(name, value)?),
    };
    Ok(predicate)
}

/// Values for `in`/`not_in`: a sequence as-is, or a comma-separated string split and typed
/// according to the column
fn multi_values(field: &FieldDescriptor, value: &Value) -> QueryResult<Vec<Value>> {
    match value {
        Value::Array(values) => Ok(values.clone()),
        Value::String(raw) => split_comma_separated(raw)
            .into_iter()
            .map(|item| coerce_text(field, item))
            .collect(),
        other => Err(QueryError::invalid_value(
            &field.name,
            format!("expected a list or comma-separated string, got `{other}`"),
        )),
    }
}

/// Type a value produced by splitting a comma-separated string
fn coerce_text(field: &FieldDescriptor, item: String) -> QueryResult<Value> {
    let invalid = |kind: &str| {
        QueryError::invalid_value(&field.name, format!("`{item}` is not a valid {kind}"))
    };
    match field.column_type {
        ColumnType::Integer => item
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid("integer")),
        ColumnType::Float => item
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("number")),
        ColumnType::Boolean => match item.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid("boolean")),
        },
        ColumnType::Text | ColumnType::Timestamp | ColumnType::Json => {
            Ok(Value::String(item.clone()))
        }
    }
}

/// Raw text handed to `like` and `json_contains`
fn scalar_text(field: &str, value: &Value) -> QueryResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(QueryError::invalid_value(
            field,
            format!("expected a scalar value, got `{other}`"),
        )),
    }
}
