//! # Operator Grammar
//!
//! The fixed operator vocabulary shared by condition leaves and flat query parameters, plus
//! the flat-parameter naming convention:
//!
//! - `field` filters `field` for equality
//! - `field__op` filters `field` with `op`, where `op` is one of
//!   `in`, `not_in`, `lt`, `gt`, `le`, `ge`, `json_contains`
//!
//! `eq`, `ne` and `like` are reachable only through condition leaves. Once a key is parsed,
//! dispatch happens on [`Operator`], never on the suffix string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, QueryResult};
use crate::schema::EntitySchema;

/// Separator between field name and operator in flat parameter keys
pub const FLAT_OPERATOR_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[default]
    Eq,
    Ne,
    In,
    NotIn,
    Lt,
    Gt,
    Le,
    Ge,
    JsonContains,
    Like,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Ne,
        Operator::In,
        Operator::NotIn,
        Operator::Lt,
        Operator::Gt,
        Operator::Le,
        Operator::Ge,
        Operator::JsonContains,
        Operator::Like,
    ];

    /// Operators accepted as a `field__op` suffix
    pub const FLAT_SUFFIXES: [Operator; 7] = [
        Operator::In,
        Operator::NotIn,
        Operator::Lt,
        Operator::Gt,
        Operator::Le,
        Operator::Ge,
        Operator::JsonContains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
            Operator::Le => "le",
            Operator::Ge => "ge",
            Operator::JsonContains => "json_contains",
            Operator::Like => "like",
        }
    }

    /// Operator for a flat-parameter suffix, if the suffix is part of the flat grammar
    pub fn from_suffix(suffix: &str) -> Option<Operator> {
        Self::FLAT_SUFFIXES
            .into_iter()
            .find(|op| op.as_str() == suffix)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| QueryError::invalid_value("operator", format!("unknown operator `{s}`")))
    }
}

/// Direction applied uniformly to every sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(QueryError::invalid_value(
                "sort_order",
                format!("expected `asc` or `desc`, got `{other}`"),
            )),
        }
    }
}

/// A flat parameter key resolved to a field and operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatKey<'a> {
    pub field: &'a str,
    pub operator: Operator,
}

/// Parse a flat parameter key against `schema`.
///
/// A key naming an existing field is an equality filter, even if it contains the separator.
/// A key without the separator that names no field is `FieldNotFound`. Otherwise the key must
/// be `<field>__<op>` with a flat-grammar suffix and an existing field.
pub fn parse_flat_key<'a>(key: &'a str, schema: &EntitySchema) -> QueryResult<FlatKey<'a>> {
    if schema.has_field(key) {
        return Ok(FlatKey {
            field: key,
            operator: Operator::Eq,
        });
    }
    let Some((field, suffix)) = key.rsplit_once(FLAT_OPERATOR_SEPARATOR) else {
        return Err(QueryError::field_not_found(key));
    };
    let operator = Operator::from_suffix(suffix)
        .filter(|_| is_identifier(field))
        .ok_or_else(|| QueryError::unsupported_operator(key))?;

    if !schema.has_field(field) {
        return Err(QueryError::field_not_found(key));
    }

    Ok(FlatKey { field, operator })
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}
