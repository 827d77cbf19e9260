use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};

/// Page size applied to flat queries that do not name one
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Highest page number accepted
pub const MAX_PAGE: u32 = 1000;
/// Largest page size accepted
pub const MAX_PAGE_SIZE: u32 = 1_000_000;
/// Page size meaning "every matching row" for helper call sites
pub const UNBOUNDED_PAGE_SIZE: u32 = 1_000_000;

/// Page-based window over a result set (1-indexed pages)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// Create pagination with page number and page size, without bounds checks
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Create pagination after checking it against the configured bounds
    pub fn validated(page: u32, page_size: u32, config: &QueryConfig) -> QueryResult<Self> {
        check_page(page, config)?;
        if page_size > config.max_page_size {
            return Err(QueryError::invalid_pagination(format!(
                "page_size must be between 0 and {}, got {page_size}",
                config.max_page_size
            )));
        }
        Ok(Self::new(page, page_size))
    }

    /// First matching row only
    pub fn first() -> Self {
        Self::new(1, 1)
    }

    /// Every matching row, up to the configured unbounded page size
    pub fn unbounded(config: &QueryConfig) -> Self {
        Self::new(1, config.unbounded_page_size)
    }

    /// Move this window to `page`; only the page number is bounds-checked
    pub fn on_page(self, page: u32, config: &QueryConfig) -> QueryResult<Self> {
        check_page(page, config)?;
        Ok(Self { page, ..self })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        format!(" LIMIT {} OFFSET {}", self.limit(), self.offset())
    }
}

fn check_page(page: u32, config: &QueryConfig) -> QueryResult<()> {
    if page < 1 || page > config.max_page {
        return Err(QueryError::invalid_pagination(format!(
            "page must be between 1 and {}, got {page}",
            config.max_page
        )));
    }
    Ok(())
}
