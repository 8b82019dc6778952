//! Request parameter validation
//!
//! Raw query-string values go in, bounded [`HeadlineQuery`] and
//! [`SearchQuery`] values come out. Every free-text value is passed through
//! [`sanitize`] before it is used anywhere downstream.

use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use validator::Validate;

use crate::config::{PaginationConfig, UpstreamConfig};
use crate::errors::ValidationError;
use crate::news::{Category, HeadlineQuery, SearchQuery, SortBy};

/// Shortest accepted search query, in characters
pub const MIN_QUERY_CHARS: usize = 2;

/// Longest accepted search query, in characters
pub const MAX_QUERY_CHARS: usize = 500;

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    // A `<` followed by whitespace is text, not a tag. An unterminated
    // trailing tag is stripped too.
    TAGS.get_or_init(|| Regex::new(r"<[^\s>][^>]*(>|$)").expect("tag regex must compile"))
}

/// Trim, strip markup and HTML-escape a free-text value
pub fn sanitize(input: &str) -> String {
    let stripped = tag_pattern().replace_all(input.trim(), "");
    let escaped = html_escape::encode_double_quoted_attribute(&stripped).replace('\'', "&#039;");
    escaped.trim().to_string()
}

/// Sanitized search text, bounded in characters
#[derive(Debug, Validate)]
struct SearchText {
    #[validate(length(min = 2, max = 500))]
    query: String,
}

impl SearchText {
    fn check(query: String) -> Result<String, ValidationError> {
        let text = SearchText { query };
        match text.validate() {
            Ok(()) => Ok(text.query),
            Err(_) if text.query.chars().count() < MIN_QUERY_CHARS => {
                Err(ValidationError::QueryTooShort {
                    min: MIN_QUERY_CHARS,
                })
            }
            Err(_) => Err(ValidationError::QueryTooLong {
                max: MAX_QUERY_CHARS,
            }),
        }
    }
}

/// Integer prefix of `input`; anything without one reads as zero
pub fn parse_leading_int(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
        });

    if negative {
        -value
    } else {
        value
    }
}

/// Turns raw request parameters into validated queries
#[derive(Debug, Clone)]
pub struct InputValidator {
    default_page_size: u32,
    max_page_size: u32,
    default_language: String,
}

impl InputValidator {
    pub fn new(pagination: &PaginationConfig, upstream: &UpstreamConfig) -> Self {
        let max_page_size = pagination.max_page_size.max(1);
        Self {
            default_page_size: pagination.default_page_size.clamp(1, max_page_size),
            max_page_size,
            default_language: upstream.language.clone(),
        }
    }

    /// Validate `category`, `page` and `pageSize`
    pub fn headlines(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<HeadlineQuery, ValidationError> {
        let category = match params.get("category") {
            Some(raw) => sanitize(raw).parse::<Category>()?,
            None => Category::default(),
        };

        Ok(HeadlineQuery {
            category,
            page: self.page(params),
            page_size: self.page_size(params),
        })
    }

    /// Validate `query`, `language`, `sortBy`, `page` and `pageSize`
    pub fn search(&self, params: &HashMap<String, String>) -> Result<SearchQuery, ValidationError> {
        let query = params.get("query").map(|raw| sanitize(raw)).unwrap_or_default();
        let query = SearchText::check(query)?;

        let language = params
            .get("language")
            .map(|raw| sanitize(raw))
            .filter(|language| !language.is_empty())
            .unwrap_or_else(|| self.default_language.clone());

        let sort_by = params
            .get("sortBy")
            .map(|raw| SortBy::parse_lenient(&sanitize(raw)))
            .unwrap_or_default();

        Ok(SearchQuery {
            query,
            language,
            sort_by,
            page: self.page(params),
            page_size: self.page_size(params),
        })
    }

    fn page(&self, params: &HashMap<String, String>) -> u32 {
        params
            .get("page")
            .map(|raw| parse_leading_int(&sanitize(raw)).clamp(1, i64::from(u32::MAX)) as u32)
            .unwrap_or(1)
    }

    fn page_size(&self, params: &HashMap<String, String>) -> u32 {
        params
            .get("pageSize")
            .map(|raw| {
                parse_leading_int(&sanitize(raw)).clamp(1, i64::from(self.max_page_size)) as u32
            })
            .unwrap_or(self.default_page_size)
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(&PaginationConfig::default(), &UpstreamConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sanitize_strips_and_escapes() {
        assert_eq!(sanitize("  hello  "), "hello");
        assert_eq!(sanitize("<b>bold</b> move"), "bold move");
        assert_eq!(sanitize("<script>alert(1)</script>"), "alert(1)");
        assert_eq!(sanitize("rock & roll"), "rock &amp; roll");
        assert_eq!(sanitize(r#"say "hi" it's"#), "say &quot;hi&quot; it&#039;s");
        assert_eq!(sanitize("a > b"), "a &gt; b");
        assert_eq!(sanitize("dangling <img src=x"), "dangling");
    }

    #[test]
    fn test_sanitize_keeps_spaced_less_than() {
        assert_eq!(sanitize("a < b"), "a &lt; b");
        assert_eq!(sanitize("x < 5 apples"), "x &lt; 5 apples");
        assert_eq!(sanitize("<b>x</b> < y"), "x &lt; y");
        assert_eq!(sanitize("<"), "&lt;");
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("42"), 42);
        assert_eq!(parse_leading_int("  7"), 7);
        assert_eq!(parse_leading_int("3abc"), 3);
        assert_eq!(parse_leading_int("-5"), -5);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_headline_defaults() {
        let query = InputValidator::default().headlines(&params(&[])).unwrap();
        assert_eq!(query.category, Category::General);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);
    }

    #[test]
    fn test_headline_category_membership() {
        let validator = InputValidator::default();
        for name in Category::names() {
            let query = validator.headlines(&params(&[("category", name)])).unwrap();
            assert_eq!(query.category.as_str(), name);
        }

        for bad in ["", "Technology", "politics", "<b>sports</b>x"] {
            let err = validator.headlines(&params(&[("category", bad)])).unwrap_err();
            assert_eq!(err, ValidationError::InvalidCategory);
        }

        let query = validator.headlines(&params(&[("category", " sports ")])).unwrap();
        assert_eq!(query.category, Category::Sports);
    }

    #[test]
    fn test_page_clamping() {
        let validator = InputValidator::default();
        let cases = [("0", 1), ("-3", 1), ("abc", 1), ("4", 4), ("2nd", 2)];
        for (raw, expected) in cases {
            let query = validator.headlines(&params(&[("page", raw)])).unwrap();
            assert_eq!(query.page, expected, "page={raw}");
        }
    }

    #[test]
    fn test_page_size_clamping() {
        let validator = InputValidator::default();
        let cases = [("0", 1), ("-1", 1), ("junk", 1), ("50", 50), ("500", 100)];
        for (raw, expected) in cases {
            let query = validator.headlines(&params(&[("pageSize", raw)])).unwrap();
            assert_eq!(query.page_size, expected, "pageSize={raw}");
        }
    }

    #[test]
    fn test_search_query_bounds() {
        let validator = InputValidator::default();

        let err = validator.search(&params(&[("query", " a ")])).unwrap_err();
        assert_eq!(err, ValidationError::QueryTooShort { min: 2 });

        let err = validator.search(&params(&[])).unwrap_err();
        assert_eq!(err, ValidationError::QueryTooShort { min: 2 });

        let long = "q".repeat(501);
        let err = validator.search(&params(&[("query", &long)])).unwrap_err();
        assert_eq!(err, ValidationError::QueryTooLong { max: 500 });

        let edge = "é".repeat(500);
        assert!(validator.search(&params(&[("query", &edge)])).is_ok());

        let query = validator
            .search(&params(&[("query", "  artificial intelligence ")]))
            .unwrap();
        assert_eq!(query.query, "artificial intelligence");

        let query = validator.search(&params(&[("query", "x < 5 apples")])).unwrap();
        assert_eq!(query.query, "x &lt; 5 apples");
    }

    #[test]
    fn test_search_markup_only_query_is_too_short() {
        let err = InputValidator::default()
            .search(&params(&[("query", "<em></em>")]))
            .unwrap_err();
        assert_eq!(err, ValidationError::QueryTooShort { min: 2 });
    }

    #[test]
    fn test_search_sort_and_language() {
        let validator = InputValidator::default();

        let query = validator.search(&params(&[("query", "ai")])).unwrap();
        assert_eq!(query.sort_by, SortBy::PublishedAt);
        assert_eq!(query.language, "en");

        let query = validator
            .search(&params(&[("query", "ai"), ("sortBy", "relevancy"), ("language", "fr")]))
            .unwrap();
        assert_eq!(query.sort_by, SortBy::Relevancy);
        assert_eq!(query.language, "fr");

        let query = validator
            .search(&params(&[("query", "ai"), ("sortBy", "newest")]))
            .unwrap();
        assert_eq!(query.sort_by, SortBy::PublishedAt);
    }

    #[test]
    fn test_custom_limits() {
        let pagination = PaginationConfig {
            default_page_size: 10,
            max_page_size: 25,
        };
        let validator = InputValidator::new(&pagination, &UpstreamConfig::default());
        let query = validator.headlines(&params(&[])).unwrap();
        assert_eq!(query.page_size, 10);
        let query = validator.headlines(&params(&[("pageSize", "80")])).unwrap();
        assert_eq!(query.page_size, 25);
    }
}
