//! Deterministic fallback dataset served when no provider key is configured
//!
//! The builders are pure functions of their inputs (including the clock and,
//! for popularity ordering, the random source) and go through the same
//! normalizer and page window as the real provider path.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Url;
use serde_json::{json, Value};

use super::normalize::{self, ArticleNormalizer};
use super::{paginate, ArticleBatch, Category, HeadlineQuery, NewsSource, SearchQuery, SortBy};
use crate::errors::Result;

pub const MOCK_HEADLINES_NOTE: &str =
    "This is mock data. Configure the News API key to use real data.";
pub const MOCK_SEARCH_NOTE: &str =
    "This is mock search data. Configure the News API key to use real data.";

const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x200";

/// News source backed by the built-in dataset
#[derive(Debug, Clone, Default)]
pub struct MockNewsSource;

impl MockNewsSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NewsSource for MockNewsSource {
    async fn headlines(&self, query: &HeadlineQuery) -> Result<ArticleBatch> {
        Ok(headlines_batch(query, Utc::now()))
    }

    async fn search(&self, query: &SearchQuery) -> Result<ArticleBatch> {
        Ok(search_batch(query, Utc::now(), &mut rand::thread_rng()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Category articles, padded with filler when the category set is smaller
/// than the requested page, then windowed.
pub fn headlines_batch(query: &HeadlineQuery, now: DateTime<Utc>) -> ArticleBatch {
    let mut raws = category_articles(query.category, now);
    if raws.len() < query.page_size as usize {
        raws.extend(filler_articles(now));
    }

    let articles = ArticleNormalizer::headlines().normalize_all(&raws);
    let total_results = articles.len() as u64;

    ArticleBatch {
        total_results,
        articles: paginate(&articles, query.page, query.page_size).to_vec(),
        note: Some(MOCK_HEADLINES_NOTE),
    }
}

/// Query-shaped results, ordered per `sort_by`, then windowed.
///
/// `popularity` is a shuffle drawn from `rng`, so it differs between calls
/// made with a fresh random source.
pub fn search_batch<R: Rng + ?Sized>(
    query: &SearchQuery,
    now: DateTime<Utc>,
    rng: &mut R,
) -> ArticleBatch {
    let raws = search_articles(&query.query, now);
    let mut articles = ArticleNormalizer::search().normalize_all(&raws);
    normalize::retain_complete(&mut articles);

    match query.sort_by {
        SortBy::Relevancy => normalize::sort_by_relevance(&mut articles),
        SortBy::Popularity => articles.shuffle(rng),
        SortBy::PublishedAt => {}
    }

    let total_results = articles.len() as u64;

    ArticleBatch {
        total_results,
        articles: paginate(&articles, query.page, query.page_size).to_vec(),
        note: Some(MOCK_SEARCH_NOTE),
    }
}

fn category_articles(category: Category, now: DateTime<Utc>) -> Vec<Value> {
    match category {
        Category::Business => vec![
            raw_article(
                "Stock Markets Reach Record Highs Amid Economic Growth",
                "Global stock markets continue their upward trend as economic indicators show strong growth across sectors.",
                "https://example.com/stock-markets",
                "Stock+Market",
                now - Duration::hours(1),
                "Business Daily",
            ),
            raw_article(
                "Major Corporate Merger Announced",
                "Two industry leaders announce merger plans that could reshape the competitive landscape.",
                "https://example.com/corporate-merger",
                "Business+News",
                now - Duration::hours(3),
                "Financial Times",
            ),
        ],
        Category::Sports => vec![
            raw_article(
                "Championship Finals Set Record Viewership",
                "The latest championship games attract millions of viewers worldwide, setting new broadcasting records.",
                "https://example.com/championship-finals",
                "Sports+News",
                now - Duration::minutes(30),
                "Sports Network",
            ),
            raw_article(
                "Olympic Preparations Underway",
                "Athletes and organizers make final preparations for the upcoming Olympic games.",
                "https://example.com/olympic-prep",
                "Olympics",
                now - Duration::hours(2),
                "Olympic News",
            ),
        ],
        // Categories without their own set share the technology set
        _ => vec![
            raw_article(
                "Revolutionary AI Breakthrough Announced by Tech Giants",
                "Major technology companies unveil groundbreaking artificial intelligence capabilities that could transform industries.",
                "https://example.com/ai-breakthrough",
                "AI+News",
                now - Duration::hours(2),
                "Tech Today",
            ),
            raw_article(
                "New Smartphone Features Change Mobile Computing",
                "Latest smartphone releases include innovative features that push the boundaries of mobile technology.",
                "https://example.com/smartphone-features",
                "Mobile+Tech",
                now - Duration::hours(4),
                "Mobile News",
            ),
            raw_article(
                "Quantum Computing Reaches New Milestone",
                "Researchers achieve significant progress in quantum computing, bringing practical applications closer to reality.",
                "https://example.com/quantum-computing",
                "Quantum+Tech",
                now - Duration::hours(6),
                "Science Tech",
            ),
        ],
    }
}

fn filler_articles(now: DateTime<Utc>) -> Vec<Value> {
    vec![
        raw_article(
            "Breaking: Major News Development",
            "Important news story that affects multiple sectors and communities.",
            "https://example.com/breaking-news",
            "Breaking+News",
            now - Duration::minutes(15),
            "News Network",
        ),
        raw_article(
            "Global Climate Summit Concludes",
            "World leaders reach new agreements on climate action and environmental protection.",
            "https://example.com/climate-summit",
            "Climate+News",
            now - Duration::hours(5),
            "Environmental News",
        ),
    ]
}

/// Five results of decreasing recency whose field completeness gives them
/// relevance scores of 7, 6, 5, 4 and 6.
fn search_articles(query: &str, now: DateTime<Utc>) -> Vec<Value> {
    vec![
        json!({
            "title": format!("Search Results for '{query}' - Advanced Technology Breakthrough"),
            "description": format!("Latest developments in {query} technology show promising results for future applications and innovations."),
            "url": "https://example.com/search-result-1",
            "urlToImage": placeholder_image(query),
            "publishedAt": (now - Duration::hours(1)).to_rfc3339(),
            "source": { "name": "Tech Research" },
            "content": format!("Researchers report steady progress on {query}, with several pilot programs moving into production this year."),
        }),
        json!({
            "title": format!("Industry Analysis: {query} Market Trends"),
            "description": format!("Comprehensive analysis of current market trends and future projections related to {query}."),
            "url": "https://example.com/search-result-2",
            "urlToImage": placeholder_image("Market Analysis"),
            "publishedAt": (now - Duration::hours(3)).to_rfc3339(),
            "source": { "name": "Market Watch" },
        }),
        json!({
            "title": format!("Expert Opinion: The Future of {query}"),
            "description": format!("Leading experts share their insights on the future implications and potential of {query}."),
            "url": "https://example.com/search-result-3",
            "publishedAt": (now - Duration::hours(5)).to_rfc3339(),
            "source": { "name": "Expert Review" },
        }),
        json!({
            "title": format!("Global Impact: How {query} is Changing the World"),
            "url": "https://example.com/search-result-4",
            "publishedAt": (now - Duration::hours(8)).to_rfc3339(),
            "source": { "name": "Global News" },
            "content": format!("Exploring the global impact and transformative effects of {query} across different industries."),
        }),
        json!({
            "title": format!("Research Study: New Findings on {query}"),
            "description": format!("Recent research reveals new insights and findings that could revolutionize our understanding of {query}."),
            "url": "https://example.com/search-result-5",
            "publishedAt": (now - Duration::hours(12)).to_rfc3339(),
            "source": { "name": "Research Journal" },
            "content": format!("A multi-year study on {query} was published today, covering more than forty institutions."),
        }),
    ]
}

fn raw_article(
    title: &str,
    description: &str,
    url: &str,
    image_text: &str,
    published_at: DateTime<Utc>,
    source: &str,
) -> Value {
    json!({
        "title": title,
        "description": description,
        "url": url,
        "urlToImage": format!("{PLACEHOLDER_IMAGE}?text={image_text}"),
        "publishedAt": published_at.to_rfc3339(),
        "source": { "name": source },
    })
}

fn placeholder_image(text: &str) -> Option<String> {
    Url::parse_with_params(PLACEHOLDER_IMAGE, &[("text", text)])
        .ok()
        .map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::normalize::MAX_RELEVANCE_SCORE;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn headlines(category: Category, page: u32, page_size: u32) -> ArticleBatch {
        headlines_batch(
            &HeadlineQuery {
                category,
                page,
                page_size,
            },
            fixed_now(),
        )
    }

    fn search(query: &str, sort_by: SortBy, page: u32, page_size: u32) -> ArticleBatch {
        search_batch(
            &SearchQuery {
                query: query.to_string(),
                language: "en".to_string(),
                sort_by,
                page,
                page_size,
            },
            fixed_now(),
            &mut StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_technology_first_page_of_two() {
        let batch = headlines(Category::Technology, 1, 2);
        assert_eq!(batch.articles.len(), 2);
        assert!(batch.total_results >= 2);
        for article in &batch.articles {
            assert!(!article.title.is_empty());
            assert!(!article.description.is_empty());
            assert!(article.url.starts_with("https://example.com/"));
            assert!(!article.source.name.is_empty());
            assert!(article.published_at.is_some());
            assert_eq!(article.relevance_score, None);
        }
        assert_eq!(
            batch.articles[0].title,
            "Revolutionary AI Breakthrough Announced by Tech Giants"
        );
    }

    #[test]
    fn test_padding_when_category_is_small() {
        let batch = headlines(Category::Business, 1, 20);
        assert_eq!(batch.total_results, 4);
        assert_eq!(batch.articles.len(), 4);
        assert_eq!(batch.articles[2].title, "Breaking: Major News Development");

        let unpadded = headlines(Category::Business, 1, 2);
        assert_eq!(unpadded.total_results, 2);
    }

    #[test]
    fn test_unmapped_category_uses_technology_set() {
        let health = headlines(Category::Health, 1, 3);
        let technology = headlines(Category::Technology, 1, 3);
        assert_eq!(health, technology);
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        assert_eq!(
            headlines(Category::Sports, 1, 10),
            headlines(Category::Sports, 1, 10)
        );
    }

    #[test]
    fn test_page_past_end_is_empty_but_counts_total() {
        let batch = headlines(Category::Sports, 5, 20);
        assert!(batch.articles.is_empty());
        assert_eq!(batch.total_results, 4);
    }

    #[test]
    fn test_search_published_at_keeps_recency_order() {
        let batch = search("artificial intelligence", SortBy::PublishedAt, 1, 20);
        assert_eq!(batch.total_results, 5);
        let dates: Vec<_> = batch.articles.iter().map(|a| a.published_at).collect();
        assert!(dates.windows(2).all(|pair| pair[0] >= pair[1]));
        for article in &batch.articles {
            assert!(article.is_complete());
            assert!(article.title.contains("artificial intelligence"));
        }
    }

    #[test]
    fn test_search_relevancy_orders_by_score() {
        let batch = search("ai", SortBy::Relevancy, 1, 20);
        let scores: Vec<_> = batch
            .articles
            .iter()
            .map(|a| a.relevance_score.unwrap())
            .collect();
        assert_eq!(scores, [MAX_RELEVANCE_SCORE, 6, 6, 5, 4]);
    }

    #[test]
    fn test_search_popularity_is_a_permutation() {
        let batch = search("ai", SortBy::Popularity, 1, 20);
        let mut urls: Vec<_> = batch.articles.iter().map(|a| a.url.clone()).collect();
        urls.sort();
        let expected: Vec<_> = (1..=5)
            .map(|i| format!("https://example.com/search-result-{i}"))
            .collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn test_search_window() {
        let batch = search("ai", SortBy::PublishedAt, 2, 2);
        assert_eq!(batch.total_results, 5);
        let urls: Vec<_> = batch.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://example.com/search-result-3",
                "https://example.com/search-result-4"
            ]
        );
    }

    #[test]
    fn test_placeholder_image_is_encoded() {
        let url = placeholder_image("rust & go").unwrap();
        assert_eq!(url, "https://via.placeholder.com/400x200?text=rust+%26+go");
    }
}
