#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Sieve Core
//!
//! Query-predicate compiler and paged retrieval engine for schema-described tabular entities.
//!
//! ## Overview
//!
//! Callers describe what they want with either flat query parameters
//! (`?name=n1&age__in=3,4&sort_by=age&sort_order=desc`) or a nested AND/OR condition tree.
//! The engine validates every referenced field against a statically registered entity
//! schema, compiles the request into a backend-neutral statement, and runs it through a
//! caller-supplied store session, returning a `{count, items}` page.
//!
//! ## Module Organization
//!
//! - [`schema`] - Entity schema descriptors and the at-most-once schema registry
//! - [`query_builder`] - Operator grammar, predicate compilation, sort/field formatting, pagination
//! - [`models`] - Request and response shapes (`FlatQuery`, `ComplexQuery`, `Paged`, `ApiResponse`)
//! - [`store`] - Store session trait with PostgreSQL and in-memory implementations
//! - [`repository`] - Paged retrieval operations (`list`, `complex_query`, `count`, `get_list`, `get_first`)
//! - [`shaper`] - Result shaping, including relation values
//! - [`service`] - Facade that runs, shapes and logs an operation
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use sieve_core::config::QueryConfig;
//! use sieve_core::models::ComplexQuery;
//! use sieve_core::schema::SchemaRegistry;
//! use sieve_core::service::EntityService;
//! use sieve_core::test_utils::{seeded_store, Hero};
//!
//! # tokio_test::block_on(async {
//! let registry = SchemaRegistry::new();
//! let heroes = EntityService::<Hero>::new(&registry, QueryConfig::default());
//!
//! let query: ComplexQuery = serde_json::from_value(serde_json::json!({
//!     "fields": ["name", "age"],
//!     "count": true,
//!     "condition": {"or_": [
//!         {"field": "name", "operator": "like", "value": "浩"},
//!         {"field": "age", "operator": "ge", "value": 40}
//!     ]}
//! }))
//! .unwrap();
//!
//! let page = heroes.complex_query(&seeded_store(), &query).await.unwrap();
//! assert_eq!(page["count"], 3);
//! # });
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests, including integration tests against the in-memory store
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod schema;
pub mod service;
pub mod shaper;
pub mod store;
pub mod test_utils;

pub use config::{ConfigManager, DatabaseConfig, QueryConfig, SieveConfig};
pub use error::{QueryError, QueryResult, StoreError};
pub use models::{ApiResponse, ComplexQuery, FlatQuery, Paged};
pub use query_builder::{
    ConditionLeaf, ConditionNode, LogicGroup, Operator, Predicate, SelectStatement, SortOrder,
};
pub use repository::{ListRequest, Repository};
pub use schema::{Entity, EntitySchema, SchemaRegistry};
pub use service::EntityService;
pub use store::{MemoryStore, PgSession, Record, RelationValue, StoreSession};
