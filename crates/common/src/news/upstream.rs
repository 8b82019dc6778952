//! News provider client
//!
//! One GET per call, bounded by a per-endpoint timeout and never retried.
//! Transport failures, timeouts, non-success statuses and malformed payloads
//! each surface as a distinct [`AppError::Upstream`] message.

use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};

use super::normalize::{self, ArticleNormalizer};
use super::{ArticleBatch, HeadlineQuery, NewsSource, SearchQuery};
use crate::config::UpstreamConfig;
use crate::errors::{AppError, Result};
use crate::metrics;

const HEADLINES_ENDPOINT: &str = "top-headlines";
const SEARCH_ENDPOINT: &str = "everything";

/// Client for a NewsAPI-compatible provider
pub struct UpstreamClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    country: String,
    language: String,
    headline_timeout: Duration,
    search_timeout: Duration,
}

/// The parts of a provider payload the pipeline consumes
struct ProviderPage {
    total_results: u64,
    articles: Vec<Value>,
}

impl UpstreamClient {
    /// Create a new upstream client
    pub fn new(config: &UpstreamConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            api_key,
            base_url,
            country: config.country.clone(),
            language: config.language.clone(),
            headline_timeout: config.headline_timeout(),
            search_timeout: config.search_timeout(),
        })
    }

    /// Override the request deadlines
    pub fn with_timeouts(mut self, headlines: Duration, search: Duration) -> Self {
        self.headline_timeout = headlines;
        self.search_timeout = search;
        self
    }

    async fn fetch(
        &self,
        endpoint: &'static str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<ProviderPage> {
        let start = Instant::now();
        let result = self.request(endpoint, params, timeout).await;

        metrics::record_upstream(endpoint, start.elapsed().as_secs_f64(), result.is_ok());

        match &result {
            Ok(page) => tracing::debug!(
                endpoint,
                total_results = page.total_results,
                articles = page.articles.len(),
                latency_ms = start.elapsed().as_millis() as u64,
                "Upstream request completed"
            ),
            Err(e) => tracing::warn!(
                endpoint,
                error = %e,
                latency_ms = start.elapsed().as_millis() as u64,
                "Upstream request failed"
            ),
        }

        result
    }

    async fn request(
        &self,
        endpoint: &'static str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<ProviderPage> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .header("Accept", "application/json")
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::upstream(format!(
                        "News API request timed out after {}ms",
                        timeout.as_millis()
                    ))
                } else {
                    AppError::upstream(format!("Failed to fetch data from News API: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::upstream(format!(
                    "News API request timed out after {}ms",
                    timeout.as_millis()
                ))
            } else {
                AppError::upstream(format!("Failed to read News API response: {}", e))
            }
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|payload| payload.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(AppError::upstream(format!(
                "News API returned HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        parse_payload(&body)
    }
}

fn parse_payload(body: &str) -> Result<ProviderPage> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|_| AppError::upstream("Invalid JSON response from News API"))?;

    if payload.get("status").and_then(Value::as_str) != Some("ok") {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("API request failed");
        return Err(AppError::upstream(message));
    }

    let articles = payload
        .get("articles")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total_results = payload
        .get("totalResults")
        .and_then(Value::as_u64)
        .unwrap_or(articles.len() as u64);

    Ok(ProviderPage {
        total_results,
        articles,
    })
}

#[async_trait]
impl NewsSource for UpstreamClient {
    async fn headlines(&self, query: &HeadlineQuery) -> Result<ArticleBatch> {
        let params = [
            ("category", query.category.to_string()),
            ("country", self.country.clone()),
            ("language", self.language.clone()),
            ("page", query.page.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];

        let page = self
            .fetch(HEADLINES_ENDPOINT, &params, self.headline_timeout)
            .await?;

        Ok(ArticleBatch {
            total_results: page.total_results,
            articles: ArticleNormalizer::headlines().normalize_all(&page.articles),
            note: None,
        })
    }

    async fn search(&self, query: &SearchQuery) -> Result<ArticleBatch> {
        let params = [
            ("q", query.query.clone()),
            ("language", query.language.clone()),
            ("sortBy", query.sort_by.to_string()),
            ("page", query.page.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];

        let page = self
            .fetch(SEARCH_ENDPOINT, &params, self.search_timeout)
            .await?;

        let mut articles = ArticleNormalizer::search().normalize_all(&page.articles);
        normalize::retain_complete(&mut articles);

        Ok(ArticleBatch {
            total_results: page.total_results,
            articles,
            note: None,
        })
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
