//! Word filters for list operations.

/// Keep the items containing every space-separated word of `filter`.
///
/// Matching is by substring, case-sensitive. An empty filter keeps
/// everything.
pub fn apply_filter<S: AsRef<str>>(items: &[S], filter: &str) -> Vec<String> {
    let words: Vec<&str> = filter.split_whitespace().collect();
    items
        .iter()
        .map(|item| item.as_ref())
        .filter(|item| words.iter().all(|word| item.contains(word)))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_words_must_match() {
        let items = ["TestString1", "FilteredString", "TestString2"];
        assert_eq!(apply_filter(&items, "Str ing1 est"), vec!["TestString1"]);
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let items = ["one", "two"];
        assert_eq!(apply_filter(&items, ""), vec!["one", "two"]);
    }

    #[test]
    fn test_no_match_yields_empty_list() {
        let items = ["one", "two"];
        assert!(apply_filter(&items, "three").is_empty());
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let items = ["Device", "device"];
        assert_eq!(apply_filter(&items, "Dev"), vec!["Device"]);
    }
}
