pub mod query;

// Re-export query shapes for easy access
pub use query::{ApiResponse, ComplexQuery, FlatQuery, Paged, RESERVED_QUERY_KEYS};
