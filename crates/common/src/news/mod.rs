//! Headline and search pipeline
//!
//! Provides:
//! - The closed category registry
//! - The canonical [`Article`] shape and its normalizer/scorer
//! - Page windowing
//! - A [`NewsSource`] abstraction with two implementations: the real
//!   upstream provider and a deterministic mock dataset

mod article;
mod category;
pub mod mock;
pub mod normalize;
pub mod pagination;
pub mod upstream;

pub use article::{Article, ArticleSource};
pub use category::Category;
pub use mock::MockNewsSource;
pub use normalize::ArticleNormalizer;
pub use pagination::paginate;
pub use upstream::UpstreamClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::UpstreamConfig;
use crate::errors::Result;

/// Ordering requested for search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "relevancy")]
    Relevancy,
    #[serde(rename = "popularity")]
    Popularity,
    #[default]
    #[serde(rename = "publishedAt")]
    PublishedAt,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevancy => "relevancy",
            SortBy::Popularity => "popularity",
            SortBy::PublishedAt => "publishedAt",
        }
    }

    /// Unknown orderings fall back to `publishedAt`
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "relevancy" => SortBy::Relevancy,
            "popularity" => SortBy::Popularity,
            _ => SortBy::PublishedAt,
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated headline request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineQuery {
    pub category: Category,
    pub page: u32,
    pub page_size: u32,
}

/// Validated search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub language: String,
    pub sort_by: SortBy,
    pub page: u32,
    pub page_size: u32,
}

/// One page of normalized articles
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleBatch {
    /// Count at the provider boundary, before windowing
    pub total_results: u64,
    pub articles: Vec<Article>,
    /// Set when the data did not come from the real provider
    pub note: Option<&'static str>,
}

/// Where articles come from
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Top headlines for a category
    async fn headlines(&self, query: &HeadlineQuery) -> Result<ArticleBatch>;

    /// Keyword search
    async fn search(&self, query: &SearchQuery) -> Result<ArticleBatch>;

    /// Short name used in logs and metrics
    fn name(&self) -> &'static str;
}

/// Create a news source based on configuration.
///
/// Without a usable credential every call is served by the mock dataset.
pub fn create_news_source(config: &UpstreamConfig) -> Result<Arc<dyn NewsSource>> {
    match config.credential() {
        Some(api_key) => {
            let client = UpstreamClient::new(config, api_key.to_string())?;
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!("News API key is not configured, serving mock articles");
            Ok(Arc::new(MockNewsSource::new()))
        }
    }
}
