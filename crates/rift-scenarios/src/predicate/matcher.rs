//! Core matching result and helpers shared by all pattern types.

use super::error::PatternError;
use super::string_pattern::StringValuePattern;
use regex::Regex;

/// Binary outcome of evaluating a pattern against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Exact,
    NoMatch,
}

impl MatchResult {
    #[inline]
    pub fn from_bool(matched: bool) -> Self {
        if matched {
            MatchResult::Exact
        } else {
            MatchResult::NoMatch
        }
    }

    #[inline]
    pub fn is_exact(self) -> bool {
        self == MatchResult::Exact
    }
}

/// Compile a regex that must match the whole input, not just a substring.
pub fn compile_full_match(pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| PatternError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Match a multi-valued field (headers, query parameters).
///
/// A missing field is handed to the pattern as `None`, so only `absent` and
/// `anything` match it. Otherwise any single value matching is enough.
pub fn match_multi_value(pattern: &StringValuePattern, values: &[&str]) -> bool {
    if values.is_empty() {
        return pattern.matches(None);
    }
    values.iter().any(|v| pattern.matches(Some(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_match_is_anchored() {
        let re = compile_full_match(r"/test\w*").unwrap();
        assert!(re.is_match("/testUrl"));
        assert!(!re.is_match("/api/testUrl"));
        assert!(!re.is_match("/testUrl/more"));
    }

    #[test]
    fn test_full_match_alternation_stays_anchored() {
        let re = compile_full_match("a|b").unwrap();
        assert!(re.is_match("a"));
        assert!(!re.is_match("ab"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = compile_full_match("(unclosed").unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex { .. }));
    }

    #[test]
    fn test_multi_value_any_value_matches() {
        let pattern = StringValuePattern::from_value(&json!({"equalTo": "b"})).unwrap();
        assert!(match_multi_value(&pattern, &["a", "b"]));
        assert!(!match_multi_value(&pattern, &["a"]));
        assert!(!match_multi_value(&pattern, &[]));
    }

    #[test]
    fn test_multi_value_absent() {
        let pattern = StringValuePattern::from_value(&json!({"absent": true})).unwrap();
        assert!(match_multi_value(&pattern, &[]));
        assert!(!match_multi_value(&pattern, &["x"]));
    }
}
