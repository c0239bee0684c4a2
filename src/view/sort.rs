//! Numeric-prefix-aware cell ordering.

use std::cmp::Ordering;

/// How a cell value classifies for ordering. Variants are declared in rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CellClass {
    /// The whole trimmed value is a run of digits
    Number,
    /// Digits followed by other text
    NumericPrefix,
    Text,
}

struct SortKey<'a> {
    class: CellClass,
    digits: &'a str,
}

impl<'a> SortKey<'a> {
    fn of(value: &'a str) -> Self {
        let trimmed = value.trim_start();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let digits = &trimmed[..end];
        let class = if digits.is_empty() {
            CellClass::Text
        } else if trimmed[end..].trim().is_empty() {
            CellClass::Number
        } else {
            CellClass::NumericPrefix
        };
        Self { class, digits }
    }
}

/// Compare two cell values for sorting.
///
/// Whole numbers come first, then values that start with a number, then
/// everything else. Numbers compare by value with no size limit; ties and
/// plain text fall back to lexicographic comparison of the full value.
///
/// The whole-number tier outranks the prefix value: `"30"` sorts before
/// `"20a"`, unlike a comparison of numeric prefixes alone.
pub fn compare_cells(left: &str, right: &str) -> Ordering {
    let a = SortKey::of(left);
    let b = SortKey::of(right);
    a.class
        .cmp(&b.class)
        .then_with(|| match a.class {
            CellClass::Text => Ordering::Equal,
            _ => compare_digits(a.digits, b.digits),
        })
        .then_with(|| left.cmp(right))
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(values: &[&str]) -> Vec<String> {
        let mut values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        values.sort_by(|a, b| compare_cells(a, b));
        values
    }

    #[test]
    fn test_numbers_before_prefixed_before_text() {
        assert_eq!(sorted(&["10", "2", "abc", "1a"]), vec!["2", "10", "1a", "abc"]);
    }

    #[test]
    fn test_whole_number_ranks_before_smaller_prefix() {
        assert_eq!(compare_cells("30", "20a"), Ordering::Less);
        assert_eq!(sorted(&["20a", "30", "3b"]), vec!["30", "3b", "20a"]);
    }

    #[test]
    fn test_large_numbers_do_not_overflow() {
        assert_eq!(
            sorted(&["123456789012345678901234567890", "99", "007"]),
            vec!["007", "99", "123456789012345678901234567890"]
        );
    }

    #[test]
    fn test_prefixed_values_compare_numerically_then_textually() {
        assert_eq!(
            sorted(&["10 apples", "9 pears", "10 apple", " 2x"]),
            vec![" 2x", "9 pears", "10 apple", "10 apples"]
        );
    }

    #[test]
    fn test_text_is_lexicographic() {
        assert_eq!(sorted(&["b", "B", "a", ""]), vec!["", "B", "a", "b"]);
    }

    #[test]
    fn test_equal_numbers_fall_back_to_text() {
        assert_eq!(compare_cells("01", "1"), Ordering::Less);
        assert_eq!(compare_cells("5", "5"), Ordering::Equal);
        assert_eq!(compare_cells(" 5 ", "5"), Ordering::Less);
    }
}
