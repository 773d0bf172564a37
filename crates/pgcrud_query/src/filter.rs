//! The `operator:value` filter grammar.

/// A parsed filter operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    /// `IS NULL` / `IS NOT NULL`, selected by the operand.
    Is,
    /// Comma-separated list membership.
    In,
}

impl FilterOp {
    /// SQL comparison token for the scalar operators.
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Like => "LIKE",
            FilterOp::Ilike => "ILIKE",
            // Realized structurally, not as a binary comparison.
            FilterOp::Is | FilterOp::In => unreachable!("structural operator"),
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "eq" => Some(FilterOp::Eq),
            "neq" => Some(FilterOp::Neq),
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "like" => Some(FilterOp::Like),
            "ilike" => Some(FilterOp::Ilike),
            "is" => Some(FilterOp::Is),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }
}

/// Split a raw filter value into operator and operand.
///
/// If the text before the first colon is a known operator it applies;
/// otherwise the whole value is an equality operand. `eq:a:b` therefore
/// yields operand `a:b`, while `approx:5` yields operand `approx:5`.
pub fn parse_filter(raw: &str) -> (FilterOp, &str) {
    if let Some((prefix, operand)) = raw.split_once(':') {
        if let Some(op) = FilterOp::from_prefix(prefix) {
            return (op, operand);
        }
    }
    (FilterOp::Eq, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_operators() {
        assert_eq!(parse_filter("eq:Alice"), (FilterOp::Eq, "Alice"));
        assert_eq!(parse_filter("neq:5"), (FilterOp::Neq, "5"));
        assert_eq!(parse_filter("gte:2024-01-01"), (FilterOp::Gte, "2024-01-01"));
        assert_eq!(parse_filter("ilike:%bob%"), (FilterOp::Ilike, "%bob%"));
        assert_eq!(parse_filter("is:null"), (FilterOp::Is, "null"));
        assert_eq!(parse_filter("in:a,b,c"), (FilterOp::In, "a,b,c"));
    }

    #[test]
    fn test_unknown_prefix_is_equality_operand() {
        assert_eq!(parse_filter("approx:5"), (FilterOp::Eq, "approx:5"));
        assert_eq!(parse_filter("Alice"), (FilterOp::Eq, "Alice"));
        // Colon inside the operand survives.
        assert_eq!(parse_filter("eq:a:b"), (FilterOp::Eq, "a:b"));
    }

    #[test]
    fn test_empty_value() {
        assert_eq!(parse_filter(""), (FilterOp::Eq, ""));
        assert_eq!(parse_filter("in:"), (FilterOp::In, ""));
    }
}
