//! # Query Builder System
//!
//! Compiles caller-supplied filters, sort keys, field selections and pagination into a
//! backend-neutral [`SelectStatement`].
//!
//! ## Key Components
//!
//! - [`operators`] - Operator vocabulary and `field__op` key parsing
//! - [`conditions`] - [`Predicate`] expressions with inline and bound SQL rendering
//! - [`params`] - Flat parameter grammar (`?name=x&age__in=3,4`)
//! - [`condition_builder`] - Condition tree grammar (`{"and_": [...], "or_": [...]}`)
//! - [`format`] - Output field classification and sort validation
//! - [`pagination`] - Page-based LIMIT/OFFSET windows
//! - [`builder`] - The compiled [`SelectStatement`]
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use serde_json::json;
//! use sieve_core::query_builder::{build_conditions, CompileOptions, SelectStatement};
//! use sieve_core::test_utils::hero_schema;
//!
//! let schema = hero_schema();
//! let mut params = BTreeMap::new();
//! params.insert("age__in".to_string(), json!("3,4"));
//!
//! let predicates = build_conditions(&schema, &params, CompileOptions::default()).unwrap();
//! let statement = SelectStatement::new(schema.table()).where_all(predicates);
//! assert_eq!(statement.build_sql(), "SELECT * FROM hero WHERE age IN (3, 4)");
//! ```

pub mod builder;
pub mod condition_builder;
pub mod conditions;
pub mod format;
pub mod operators;
pub mod pagination;
pub mod params;

pub use builder::SelectStatement;
pub use condition_builder::{
    CompileOptions, ConditionBuilder, ConditionLeaf, ConditionNode, LogicGroup,
};
pub use conditions::{like_escape, Comparison, Predicate};
pub use format::{
    format_fields, format_sort, split_comma_separated, FieldSelection, FormattedFields, SortKey,
};
pub use operators::{parse_flat_key, FlatKey, Operator, SortOrder};
pub use pagination::Pagination;
pub use params::build_conditions;
