// Comparison semantics for `where` operators. Both sides are display strings.

use std::cmp::Ordering;

use crate::ast::Operator;

/// Evaluate `candidate OP value`.
pub fn compare(op: Operator, candidate: &str, value: &str) -> bool {
    match op {
        Operator::Eq => candidate == value,
        Operator::Neq => candidate != value,
        Operator::Gt => compare_numeric(candidate, value) == Ordering::Greater,
        Operator::Lt => compare_numeric(candidate, value) == Ordering::Less,
        Operator::Gte => compare_numeric(candidate, value) != Ordering::Less,
        Operator::Lte => compare_numeric(candidate, value) != Ordering::Greater,
        Operator::Like => like(candidate, value),
        Operator::And => false,
    }
}

/// Numeric comparison when both sides parse as finite numbers, ordinal
/// otherwise. Spellings such as `NaN` or `inf` stay strings.
pub fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (finite(a), finite(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Case-insensitive substring containment.
pub fn like(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_when_both_parse() {
        assert!(compare(Operator::Gt, "10", "9"));
        assert!(compare(Operator::Lt, "2.5", "10"));
        assert!(compare(Operator::Gte, "3", "3.0"));
        assert!(compare(Operator::Lte, "-1", "0"));
    }

    #[test]
    fn non_finite_spellings_compare_as_text() {
        // As floats, NaN would compare equal and inf greater than everything.
        assert!(compare(Operator::Lt, "Inf", "Nan"));
        assert!(compare(Operator::Lt, "infinity", "zebra"));
        assert!(compare(Operator::Gt, "nan", "5"));
        assert!(!compare(Operator::Gte, "-inf", "0"));
        assert_eq!(compare_numeric("NaN", "NaN"), Ordering::Equal);
    }

    #[test]
    fn ordinal_fallback() {
        // "10" < "9" ordinally once one side is not numeric.
        assert!(compare(Operator::Gt, "b", "a"));
        assert!(compare(Operator::Lt, "10", "9x"));
        assert!(compare(Operator::Gt, "apple", ""));
    }

    #[test]
    fn equality_is_string_equality() {
        assert!(compare(Operator::Eq, "3", "3"));
        assert!(!compare(Operator::Eq, "3", "3.0"));
        assert!(compare(Operator::Neq, "3", "3.0"));
    }

    #[test]
    fn like_ignores_case() {
        assert!(compare(Operator::Like, "Golden Retriever", "retr"));
        assert!(!compare(Operator::Like, "Poodle", "retr"));
    }
}
