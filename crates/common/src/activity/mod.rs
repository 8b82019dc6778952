//! Best-effort usage and search logging
//!
//! Writes run on spawned tasks so the response never waits on them. A failed
//! write is logged and counted, then dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::errors::Result;
use crate::metrics;
use crate::validation::sanitize;

/// Replacement text for sensitive request parameters
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: &[&str] = &["apikey", "api_key", "token", "password", "secret"];

/// One request as seen by the usage log
#[derive(Debug, Clone, PartialEq)]
pub struct UsageLogEntry {
    pub endpoint: String,
    /// Sanitized request parameters with secrets already masked
    pub params: Value,
    pub status: u16,
    pub elapsed_ms: u64,
}

/// One search as seen by the search log
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    pub query: String,
    pub user_id: Option<String>,
    pub results_count: Option<u64>,
    pub searched_at: DateTime<Utc>,
}

/// Storage behind the activity logger
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record_usage(&self, entry: &UsageLogEntry) -> Result<()>;

    async fn record_search(&self, query: &str, user_id: Option<&str>) -> Result<()>;

    /// Attach a result count to the newest matching search no older than
    /// `window`. Returns whether a row was updated.
    async fn update_search_results(
        &self,
        query: &str,
        results_count: u64,
        window: Duration,
    ) -> Result<bool>;
}

/// Mask values whose key names a credential, at any depth
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if is_sensitive(&key) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|sensitive| key == *sensitive)
}

/// Sanitized, redacted JSON object from string parameters
pub fn params_to_json<'a>(params: impl IntoIterator<Item = (&'a String, &'a String)>) -> Value {
    let map: Map<String, Value> = params
        .into_iter()
        .map(|(key, value)| (key.clone(), Value::String(sanitize(value))))
        .collect();
    redact(Value::Object(map))
}

/// Oldest timestamp still inside `window` of `now`
pub(crate) fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Fire-and-forget front of an [`ActivitySink`]
#[derive(Clone)]
pub struct ActivityLogger {
    sink: Arc<dyn ActivitySink>,
    search_window: Duration,
}

impl ActivityLogger {
    pub fn new(sink: Arc<dyn ActivitySink>, search_window: Duration) -> Self {
        Self {
            sink,
            search_window,
        }
    }

    /// Record one request. The handle only matters to tests.
    pub fn usage(&self, entry: UsageLogEntry) -> JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record_usage(&entry).await {
                tracing::warn!(error = %e, endpoint = %entry.endpoint, "Failed to log API usage");
                metrics::record_activity_failure("usage");
            }
        })
    }

    /// Record a validated search; finish it with [`PendingSearch::complete`]
    pub fn search(&self, query: &str, user_id: Option<&str>) -> PendingSearch {
        let sink = self.sink.clone();
        let owned_query = query.to_string();
        let user_id = user_id.map(str::to_string);

        let insert = tokio::spawn(async move {
            if let Err(e) = sink.record_search(&owned_query, user_id.as_deref()).await {
                tracing::warn!(error = %e, "Failed to log search query");
                metrics::record_activity_failure("search");
            }
        });

        PendingSearch {
            logger: self.clone(),
            query: query.to_string(),
            insert,
        }
    }
}

/// A search-log insert that may still be in flight
pub struct PendingSearch {
    logger: ActivityLogger,
    query: String,
    insert: JoinHandle<()>,
}

impl PendingSearch {
    /// Attach the result count once the insert has landed
    pub fn complete(self, results_count: u64) -> JoinHandle<()> {
        let PendingSearch {
            logger,
            query,
            insert,
        } = self;

        tokio::spawn(async move {
            if insert.await.is_err() {
                return;
            }
            match logger
                .sink
                .update_search_results(&query, results_count, logger.search_window)
                .await
            {
                Ok(true) => {}
                Ok(false) => tracing::debug!("No recent search row to update"),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to update search results count");
                    metrics::record_activity_failure("search_update");
                }
            }
        })
    }

    /// Wait for the insert without recording a count
    pub fn abandon(self) -> JoinHandle<()> {
        self.insert
    }
}

/// In-memory [`ActivitySink`] used when no database is configured
#[derive(Default)]
pub struct MemoryActivity {
    usage: RwLock<Vec<UsageLogEntry>>,
    searches: RwLock<Vec<SearchRecord>>,
}

impl MemoryActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn usage_entries(&self) -> Vec<UsageLogEntry> {
        self.usage.read().await.clone()
    }

    pub async fn search_records(&self) -> Vec<SearchRecord> {
        self.searches.read().await.clone()
    }
}

#[async_trait]
impl ActivitySink for MemoryActivity {
    async fn record_usage(&self, entry: &UsageLogEntry) -> Result<()> {
        self.usage.write().await.push(entry.clone());
        Ok(())
    }

    async fn record_search(&self, query: &str, user_id: Option<&str>) -> Result<()> {
        self.searches.write().await.push(SearchRecord {
            query: query.to_string(),
            user_id: user_id.map(str::to_string),
            results_count: None,
            searched_at: Utc::now(),
        });
        Ok(())
    }

    async fn update_search_results(
        &self,
        query: &str,
        results_count: u64,
        window: Duration,
    ) -> Result<bool> {
        let cutoff = window_start(Utc::now(), window);
        let mut searches = self.searches.write().await;
        let newest = searches
            .iter_mut()
            .rev()
            .find(|record| record.query == query && record.searched_at >= cutoff);

        Ok(match newest {
            Some(record) => {
                record.results_count = Some(results_count);
                true
            }
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use serde_json::json;
    use std::collections::HashMap;

    struct FailingSink;

    #[async_trait]
    impl ActivitySink for FailingSink {
        async fn record_usage(&self, _: &UsageLogEntry) -> Result<()> {
            Err(AppError::DatabaseConnection { message: "down".into() })
        }
        async fn record_search(&self, _: &str, _: Option<&str>) -> Result<()> {
            Err(AppError::DatabaseConnection { message: "down".into() })
        }
        async fn update_search_results(&self, _: &str, _: u64, _: Duration) -> Result<bool> {
            Err(AppError::DatabaseConnection { message: "down".into() })
        }
    }

    /// Inserts land only after a delay
    struct SlowInsert(MemoryActivity);

    #[async_trait]
    impl ActivitySink for SlowInsert {
        async fn record_usage(&self, entry: &UsageLogEntry) -> Result<()> {
            self.0.record_usage(entry).await
        }
        async fn record_search(&self, query: &str, user_id: Option<&str>) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.record_search(query, user_id).await
        }
        async fn update_search_results(&self, q: &str, n: u64, w: Duration) -> Result<bool> {
            self.0.update_search_results(q, n, w).await
        }
    }

    fn entry(status: u16) -> UsageLogEntry {
        UsageLogEntry {
            endpoint: "/headlines".into(),
            params: json!({ "category": "science" }),
            status,
            elapsed_ms: 12,
        }
    }

    #[test]
    fn test_redaction() {
        let redacted = redact(json!({
            "query": "rust",
            "apiKey": "abc",
            "nested": { "Password": "hunter2", "page": "1" },
            "list": [{ "token": "t" }],
        }));
        assert_eq!(redacted["query"], "rust");
        assert_eq!(redacted["apiKey"], REDACTED);
        assert_eq!(redacted["nested"]["Password"], REDACTED);
        assert_eq!(redacted["nested"]["page"], "1");
        assert_eq!(redacted["list"][0]["token"], REDACTED);
    }

    #[test]
    fn test_params_to_json() {
        let params: HashMap<String, String> = [
            ("category".to_string(), "sports".to_string()),
            ("api_key".to_string(), "secret".to_string()),
        ]
        .into_iter()
        .collect();
        let value = params_to_json(&params);
        assert_eq!(value["category"], "sports");
        assert_eq!(value["api_key"], REDACTED);
    }

    #[test]
    fn test_params_to_json_sanitizes_values() {
        let params: HashMap<String, String> = [
            ("category".to_string(), " <b>sports</b> ".to_string()),
            ("query".to_string(), "rock & \"roll\"".to_string()),
            ("page".to_string(), "<i>2".to_string()),
        ]
        .into_iter()
        .collect();
        let value = params_to_json(&params);
        assert_eq!(value["category"], "sports");
        assert_eq!(value["query"], "rock &amp; &quot;roll&quot;");
        assert_eq!(value["page"], "2");
    }

    #[test]
    fn test_window_start_saturates() {
        let now = Utc::now();
        assert_eq!(window_start(now, Duration::from_secs(60)), now - chrono::Duration::seconds(60));
        assert_eq!(window_start(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[tokio::test]
    async fn test_usage_is_recorded() {
        let sink = Arc::new(MemoryActivity::new());
        let logger = ActivityLogger::new(sink.clone(), Duration::from_secs(60));

        logger.usage(entry(200)).await.unwrap();
        logger.usage(entry(400)).await.unwrap();

        let entries = sink.usage_entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].status, 400);
    }

    #[tokio::test]
    async fn test_search_count_follows_insert() {
        let sink = Arc::new(SlowInsert(MemoryActivity::new()));
        let logger = ActivityLogger::new(sink.clone(), Duration::from_secs(60));

        logger
            .search("climate", Some("u1"))
            .complete(4)
            .await
            .unwrap();

        let records = sink.0.search_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id.as_deref(), Some("u1"));
        assert_eq!(records[0].results_count, Some(4));
    }

    #[tokio::test]
    async fn test_update_targets_newest_match() {
        let sink = MemoryActivity::new();
        sink.record_search("ai", None).await.unwrap();
        sink.record_search("rust", None).await.unwrap();
        sink.record_search("ai", None).await.unwrap();

        assert!(sink
            .update_search_results("ai", 9, Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!sink
            .update_search_results("golang", 1, Duration::from_secs(60))
            .await
            .unwrap());

        let counts: Vec<_> = sink
            .search_records()
            .await
            .into_iter()
            .map(|r| r.results_count)
            .collect();
        assert_eq!(counts, [None, None, Some(9)]);
    }

    #[tokio::test]
    async fn test_stale_rows_are_not_updated() {
        let sink = MemoryActivity::new();
        sink.searches.write().await.push(SearchRecord {
            query: "ai".into(),
            user_id: None,
            results_count: None,
            searched_at: Utc::now() - chrono::Duration::minutes(5),
        });

        let updated = sink
            .update_search_results("ai", 3, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let logger = ActivityLogger::new(Arc::new(FailingSink), Duration::from_secs(60));

        assert!(logger.usage(entry(500)).await.is_ok());
        assert!(logger.search("ai", None).complete(0).await.is_ok());
        assert!(logger.search("ai", None).abandon().await.is_ok());
    }
}
