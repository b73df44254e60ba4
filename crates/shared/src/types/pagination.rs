//! Limit/offset pagination for ledger listings.

use serde::{Deserialize, Serialize};

/// Request parameters for paginated queries.
///
/// Bounds are signed so that negative input coming from callers can be rejected
/// explicitly instead of wrapping around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of rows to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of rows to skip.
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Rejected pagination bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// Limit below zero.
    #[error("limit must not be negative (got {0})")]
    NegativeLimit(i64),

    /// Offset below zero.
    #[error("offset must not be negative (got {0})")]
    NegativeOffset(i64),

    /// Limit above the allowed page size.
    #[error("limit {limit} exceeds the maximum of {max}")]
    LimitTooLarge {
        /// Requested limit.
        limit: i64,
        /// Maximum allowed limit.
        max: i64,
    },
}

impl PageRequest {
    /// Largest page a caller may request.
    pub const MAX_LIMIT: i64 = 500;

    /// Creates a page request.
    #[must_use]
    pub const fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Checks the bounds before any storage access.
    pub fn validate(&self) -> Result<(), PaginationError> {
        if self.limit < 0 {
            return Err(PaginationError::NegativeLimit(self.limit));
        }
        if self.offset < 0 {
            return Err(PaginationError::NegativeOffset(self.offset));
        }
        if self.limit > Self::MAX_LIMIT {
            return Err(PaginationError::LimitTooLarge {
                limit: self.limit,
                max: Self::MAX_LIMIT,
            });
        }
        Ok(())
    }

    /// Returns the limit for database queries. Negative values clamp to zero.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::try_from(self.limit).unwrap_or(0)
    }

    /// Returns the offset for database queries. Negative values clamp to zero.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::try_from(self.offset).unwrap_or(0)
    }
}

/// A page of rows plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The rows in this page.
    pub rows: Vec<T>,
    /// Total number of matching rows across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub fn new(rows: Vec<T>, total: u64) -> Self {
        Self { rows, total }
    }

    /// An empty page with a zero total.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
        }
    }

    /// Maps the rows, keeping the total.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            rows: self.rows.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}
