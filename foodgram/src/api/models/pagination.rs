//! `?skip=&limit=` query parameters and the `{data, total_count, skip, limit}` envelope used by
//! the user, subscription and recipe lists. Tags and ingredients are returned unpaginated.

use crate::config::PaginationConfig;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Offset window requested by the client. Both fields arrive as strings in the query.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Rows to skip; negative values count as 0
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub skip: Option<i64>,

    /// Page size, clamped to `1..=pagination.max_limit` (default 6)
    #[param(default = 6, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self, config: &PaginationConfig) -> i64 {
        self.limit.unwrap_or(config.default_limit).clamp(1, config.max_limit)
    }

    /// `(skip, limit)` after defaults and clamping.
    #[inline]
    pub fn params(&self, config: &PaginationConfig) -> (i64, i64) {
        (self.skip(), self.limit(config))
    }
}

/// One page of a list plus the size of the whole result set.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    pub data: Vec<T>,
    /// Rows matching the filters, ignoring `skip` and `limit`
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            data,
            total_count,
            skip,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_config() {
        let config = PaginationConfig::default();
        let pagination = Pagination::default();
        assert_eq!(pagination.params(&config), (0, 6));
    }

    #[test]
    fn test_limit_is_clamped() {
        let config = PaginationConfig::default();
        let too_big = Pagination {
            skip: Some(-4),
            limit: Some(10_000),
        };
        assert_eq!(too_big.params(&config), (0, 100));

        let zero = Pagination {
            skip: None,
            limit: Some(0),
        };
        assert_eq!(zero.limit(&config), 1);
    }

    #[test]
    fn test_parses_from_query_string() {
        let pagination: Pagination = serde_urlencoded::from_str("skip=12&limit=3").unwrap();
        assert_eq!(pagination.skip, Some(12));
        assert_eq!(pagination.limit, Some(3));
    }
}
