//! Canonical article shape returned by every news endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "No title";
pub const DEFAULT_DESCRIPTION: &str = "No description available";
pub const DEFAULT_URL: &str = "#";
pub const DEFAULT_SOURCE_NAME: &str = "Unknown Source";

/// A normalized article. Field names on the wire follow the provider's
/// vocabulary (`urlToImage`, `source.name`, `content`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(rename = "urlToImage")]
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source: ArticleSource,
    #[serde(rename = "content")]
    pub content_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub name: String,
}

impl Article {
    pub fn source_name(&self) -> &str {
        &self.source.name
    }

    /// Search results need both a title and a link to be worth showing
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.url.is_empty()
    }
}

impl Default for Article {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            url: DEFAULT_URL.to_string(),
            image_url: None,
            published_at: None,
            source: ArticleSource {
                name: DEFAULT_SOURCE_NAME.to_string(),
            },
            content_snippet: None,
            relevance_score: None,
        }
    }
}
