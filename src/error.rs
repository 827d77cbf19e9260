//! # Error Types
//!
//! Query errors are split into two families:
//!
//! - **Client errors** (unknown fields, bad operator suffixes, malformed values, out-of-range
//!   pagination). These are raised while compiling a request, before anything is sent to the
//!   store, and always name the offending field or key.
//! - **Store errors** raised by a [`StoreSession`](crate::store::StoreSession). These are
//!   propagated unchanged; retrying them is the session's concern.

use thiserror::Error;

/// Errors raised by a data-store session while executing a compiled statement
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Failed to decode row: {0}")]
    Decode(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Errors raised while compiling or executing a query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Field `{field}` does not exist")]
    FieldNotFound { field: String },

    #[error("Field `{field}` is a relation and cannot be used as a filter")]
    RelationNotFilterable { field: String },

    #[error("Unknown field or unsupported operator in query parameter `{key}`")]
    UnsupportedOperator { key: String },

    #[error("Invalid sort_by field: `{field}`")]
    InvalidSortField { field: String },

    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid pagination: {reason}")]
    InvalidPagination { reason: String },

    #[error("Invalid primary key: {reason}")]
    InvalidPrimaryKey { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn field_not_found(field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            field: field.into(),
        }
    }

    pub fn unsupported_operator(key: impl Into<String>) -> Self {
        Self::UnsupportedOperator { key: key.into() }
    }

    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_pagination(reason: impl Into<String>) -> Self {
        Self::InvalidPagination {
            reason: reason.into(),
        }
    }

    /// True for errors caused by the request itself rather than the store
    pub fn is_client_error(&self) -> bool {
        !matches!(self, QueryError::Store(_))
    }

    /// True when a filter or sort referenced a field the entity cannot filter on
    pub fn is_field_not_found(&self) -> bool {
        matches!(
            self,
            QueryError::FieldNotFound { .. }
                | QueryError::RelationNotFilterable { .. }
                | QueryError::InvalidSortField { .. }
        )
    }

    /// HTTP-style status code a routing layer should answer with
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
