//! Wildcard matching for identifier patterns.
//!
//! Pack and component requirements may use `*` and `?` in vendor and name
//! positions. Identifier strings never contain path separators, so the
//! default glob match options apply as-is.

use glob::Pattern;

/// True when `pattern` contains glob metacharacters
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Match `text` against a `*`/`?` pattern.
///
/// A pattern without metacharacters degrades to literal equality, and a
/// malformed pattern never matches anything but itself.
pub fn matches(pattern: &str, text: &str) -> bool {
    if !has_wildcards(pattern) {
        return pattern == text;
    }
    match Pattern::new(pattern) {
        Ok(p) => p.matches(text),
        Err(_) => pattern == text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern_is_equality() {
        assert!(matches("ARM::CMSIS", "ARM::CMSIS"));
        assert!(!matches("ARM::CMSIS", "ARM::CMSIS-Driver"));
    }

    #[test]
    fn test_star_spans_delimiters() {
        assert!(matches("ARM::*", "ARM::RteTest_DFP"));
        assert!(matches("*Gen*", "RteTestGenerator"));
        assert!(!matches("keil::*", "ARM::RteTest_DFP"));
    }

    #[test]
    fn test_question_mark_matches_single_character() {
        assert!(matches("RteTest_ARMCM?", "RteTest_ARMCM0"));
        assert!(!matches("RteTest_ARMCM?", "RteTest_ARMCM0_Dual"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!matches("arm::*", "ARM::RteTest_DFP"));
    }

    #[test]
    fn test_has_wildcards() {
        assert!(has_wildcards("ARM::*"));
        assert!(has_wildcards("CM?"));
        assert!(!has_wildcards("ARM::RteTest_DFP"));
    }
}
