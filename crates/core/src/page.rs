//! Offset pagination arithmetic.
//!
//! `page` is 1-based. Missing, zero or negative inputs fall back to
//! [`PageRequest::DEFAULT_PAGE`] / [`PageRequest::DEFAULT_LIMIT`]. Limits
//! above [`PageRequest::MAX_LIMIT`] are capped, and offsets never exceed
//! `i64::MAX` so every store can represent them.

use serde::{Deserialize, Serialize};

/// A normalized page request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u64 = 1;
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 1000;

    /// Normalize raw caller input.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let positive = |v: Option<i64>, default: u64| match v {
            Some(v) if v > 0 => v as u64,
            _ => default,
        };
        Self {
            page: positive(page, Self::DEFAULT_PAGE),
            limit: positive(limit, Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT),
        }
    }

    /// Parse query-string values leniently: anything that is not a positive
    /// integer falls back to the defaults.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let int = |v: Option<&str>| v.and_then(|s| s.trim().parse::<i64>().ok());
        Self::new(int(page), int(limit))
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of matching records to skip.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned alongside a page of records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total_count: u64) -> Self {
        Self {
            page: request.page(),
            limit: request.limit(),
            total_count,
            total_pages: total_count.div_ceil(request.limit()),
        }
    }
}

/// One page of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
