//! Repository Tests Module
//!
//! Paged retrieval against the seeded in-memory store, plus PostgreSQL round-trips that run
//! only when a database is available.

pub mod complex_query;
pub mod list;
pub mod postgres;
