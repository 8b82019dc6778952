//! Raw provider record → canonical [`Article`], plus relevance scoring
//!
//! Normalization is total: any JSON value yields an article. Absent, null or
//! non-string fields take their defaults; strings are kept as sent.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::article::{
    Article, ArticleSource, DEFAULT_DESCRIPTION, DEFAULT_SOURCE_NAME, DEFAULT_TITLE, DEFAULT_URL,
};

/// Snippet budget for headline content, in characters
pub const HEADLINE_SNIPPET_CHARS: usize = 200;

/// Snippet budget for search content, in characters
pub const SEARCH_SNIPPET_CHARS: usize = 300;

/// Appended to content cut at the snippet budget
pub const ELLIPSIS: &str = "...";

/// Highest score [`relevance_score`] can produce
pub const MAX_RELEVANCE_SCORE: u8 = 7;

/// Maps raw provider articles onto [`Article`]
#[derive(Debug, Clone, Copy)]
pub struct ArticleNormalizer {
    snippet_chars: usize,
    score: bool,
}

impl ArticleNormalizer {
    /// Normalizer for the headline endpoint
    pub const fn headlines() -> Self {
        Self {
            snippet_chars: HEADLINE_SNIPPET_CHARS,
            score: false,
        }
    }

    /// Normalizer for search results, which also carry a relevance score
    pub const fn search() -> Self {
        Self {
            snippet_chars: SEARCH_SNIPPET_CHARS,
            score: true,
        }
    }

    pub fn normalize(&self, raw: &Value) -> Article {
        Article {
            title: text(raw, "title").unwrap_or(DEFAULT_TITLE).to_string(),
            description: text(raw, "description")
                .unwrap_or(DEFAULT_DESCRIPTION)
                .to_string(),
            url: text(raw, "url").unwrap_or(DEFAULT_URL).to_string(),
            image_url: text(raw, "urlToImage").map(str::to_string),
            published_at: text(raw, "publishedAt").and_then(parse_timestamp),
            source: ArticleSource {
                name: raw
                    .get("source")
                    .and_then(|source| text(source, "name"))
                    .unwrap_or(DEFAULT_SOURCE_NAME)
                    .to_string(),
            },
            content_snippet: text(raw, "content")
                .map(|content| truncate_snippet(content, self.snippet_chars)),
            relevance_score: self.score.then(|| relevance_score(raw)),
        }
    }

    pub fn normalize_all(&self, raws: &[Value]) -> Vec<Article> {
        raws.iter().map(|raw| self.normalize(raw)).collect()
    }
}

/// Field-completeness score: +3 title, +2 description, +1 content, +1 image.
pub fn relevance_score(raw: &Value) -> u8 {
    let mut score = 0;
    if present(raw, "title") {
        score += 3;
    }
    if present(raw, "description") {
        score += 2;
    }
    if present(raw, "content") {
        score += 1;
    }
    if present(raw, "urlToImage") {
        score += 1;
    }
    score
}

/// Cut `content` to `limit` characters, marking the cut with an ellipsis
pub fn truncate_snippet(content: &str, limit: usize) -> String {
    match content.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &content[..cut], ELLIPSIS),
        None => content.to_string(),
    }
}

/// Highest score first; ties keep their incoming order
pub fn sort_by_relevance(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
}

/// Drop articles without a title or link, keeping the rest contiguous
pub fn retain_complete(articles: &mut Vec<Article>) {
    articles.retain(Article::is_complete);
}

fn text<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

fn present(raw: &Value, key: &str) -> bool {
    text(raw, key).is_some_and(|value| !value.is_empty())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
