//! Validated request intents consumed by the builder.

use serde_json::{Map, Value};

/// Sort direction; ascending unless the caller asked for `desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse a caller-supplied direction; anything but `desc` is ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Parameters of a list operation, already extracted from the query string.
///
/// `page` and `page_size` arrive as requested; the builder clamps them.
/// Filters keep their query-string order so generated SQL is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// `(column, raw_value)` pairs from `filter.{column}={op}:{value}`.
    pub filters: Vec<(String, String)>,
    pub page: i64,
    pub page_size: i64,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    /// Explicit column projection; `None` means `*`.
    pub select: Option<Vec<String>>,
    pub search: Option<String>,
    /// Restrict search to these columns; `None` means all textual columns.
    pub search_columns: Option<Vec<String>>,
}

/// Write-side payload: one record or a batch.
///
/// An explicit JSON null is preserved as a bound NULL; a key that is absent
/// altogether is what triggers `updated_at` auto-fill and bulk NULL fill.
#[derive(Debug, Clone)]
pub enum WritePayload {
    Single(Map<String, Value>),
    Bulk(Vec<Map<String, Value>>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("DESC"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Asc);
    }
}
