//! Per-identity category preferences
//!
//! Durable identities are served by a [`PreferenceRepository`] whose
//! `replace` swaps the whole set in one transaction. Anonymous sessions live
//! in an in-process store that expires with the session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::errors::{Result, ValidationError};
use crate::metrics;
use crate::news::Category;
use crate::MAX_PREFERENCES;

/// Number of entries reported by the popularity stats
pub const POPULAR_CATEGORY_LIMIT: u64 = 5;

/// Who a preference set belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Opaque identifier supplied by the identity provider
    User(String),
    /// Session token of a caller without a durable identity
    Anonymous(String),
}

impl Identity {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::User(id) => Some(id),
            Identity::Anonymous(_) => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous(_))
    }
}

/// How many stored sets include a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Aggregate view of one user's stored rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceStats {
    pub total_preferences: u64,
    pub first_preference_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Payload of `GET /preferences?stats=true`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub popular_categories: Vec<CategoryCount>,
    pub user_stats: Option<PreferenceStats>,
}

/// Durable preference storage keyed by user id
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Stored category names in insertion order, unvalidated
    async fn load(&self, user_id: &str) -> Result<Vec<String>>;

    /// Replace the user's whole set; on failure the previous set survives
    async fn replace(&self, user_id: &str, categories: &[Category]) -> Result<()>;

    /// Most common categories across all users, highest count first
    async fn popular_categories(&self, limit: u64) -> Result<Vec<CategoryCount>>;

    /// `None` when the user has no stored rows
    async fn user_stats(&self, user_id: &str) -> Result<Option<PreferenceStats>>;
}

/// In-memory [`PreferenceRepository`] used when no database is configured
#[derive(Default)]
pub struct MemoryPreferences {
    rows: RwLock<HashMap<String, Vec<(String, DateTime<Utc>)>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceRepository for MemoryPreferences {
    async fn load(&self, user_id: &str) -> Result<Vec<String>> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(user_id)
            .map(|set| set.iter().map(|(category, _)| category.clone()).collect())
            .unwrap_or_default())
    }

    async fn replace(&self, user_id: &str, categories: &[Category]) -> Result<()> {
        let now = Utc::now();
        let set = categories
            .iter()
            .map(|category| (category.to_string(), now))
            .collect();
        self.rows.write().await.insert(user_id.to_string(), set);
        Ok(())
    }

    async fn popular_categories(&self, limit: u64) -> Result<Vec<CategoryCount>> {
        let rows = self.rows.read().await;
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for (category, _) in rows.values().flatten() {
            *counts.entry(category.as_str()).or_default() += 1;
        }

        let mut popular: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        popular.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        popular.truncate(limit as usize);
        Ok(popular)
    }

    async fn user_stats(&self, user_id: &str) -> Result<Option<PreferenceStats>> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(user_id)
            .filter(|set| !set.is_empty())
            .map(|set| summarize(set.iter().map(|(_, created)| *created))))
    }
}

/// Fold row timestamps into [`PreferenceStats`]
pub(crate) fn summarize(created: impl Iterator<Item = DateTime<Utc>>) -> PreferenceStats {
    let mut stats = PreferenceStats {
        total_preferences: 0,
        first_preference_date: None,
        last_updated: None,
    };
    for at in created {
        stats.total_preferences += 1;
        stats.first_preference_date = Some(stats.first_preference_date.map_or(at, |t| t.min(at)));
        stats.last_updated = Some(stats.last_updated.map_or(at, |t| t.max(at)));
    }
    stats
}

struct SessionEntry {
    categories: Vec<Category>,
    touched: Instant,
}

/// Session-scoped preferences for anonymous callers
pub struct SessionPreferences {
    entries: RwLock<HashMap<String, SessionEntry>>,
    lifetime: Duration,
}

impl SessionPreferences {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    pub async fn get(&self, token: &str) -> Option<Vec<Category>> {
        self.get_at(token, Instant::now()).await
    }

    pub async fn set(&self, token: &str, categories: Vec<Category>) {
        self.set_at(token, categories, Instant::now()).await
    }

    async fn get_at(&self, token: &str, now: Instant) -> Option<Vec<Category>> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|entry| now.saturating_duration_since(entry.touched) < self.lifetime)
            .map(|entry| entry.categories.clone())
    }

    async fn set_at(&self, token: &str, categories: Vec<Category>, now: Instant) {
        let mut entries = self.entries.write().await;
        let lifetime = self.lifetime;
        entries.retain(|_, entry| now.saturating_duration_since(entry.touched) < lifetime);
        entries.insert(
            token.to_string(),
            SessionEntry {
                categories,
                touched: now,
            },
        );
    }

    pub async fn active_sessions(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Preference reads and writes for every kind of identity
pub struct PreferenceStore {
    durable: Arc<dyn PreferenceRepository>,
    sessions: SessionPreferences,
}

impl PreferenceStore {
    pub fn new(durable: Arc<dyn PreferenceRepository>, session_lifetime: Duration) -> Self {
        Self {
            durable,
            sessions: SessionPreferences::new(session_lifetime),
        }
    }

    /// Current set, re-validated against the registry; never empty.
    ///
    /// A storage failure is logged and reads as the default set.
    pub async fn get(&self, identity: &Identity) -> Vec<Category> {
        let stored: Vec<Category> = match identity {
            Identity::User(user_id) => match self.durable.load(user_id).await {
                Ok(names) => names.iter().filter_map(|name| name.parse().ok()).collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load preferences");
                    Vec::new()
                }
            },
            Identity::Anonymous(token) => self.sessions.get(token).await.unwrap_or_default(),
        };

        if stored.is_empty() {
            vec![Category::default()]
        } else {
            stored
        }
    }

    /// Validate `raw` and make it the identity's whole set.
    ///
    /// Returns the set as stored: first occurrences in request order.
    pub async fn replace(&self, identity: &Identity, raw: &[String]) -> Result<Vec<Category>> {
        let categories = validate_selection(raw)?;

        match identity {
            Identity::User(user_id) => {
                self.durable.replace(user_id, &categories).await?;
                tracing::info!(count = categories.len(), "Preferences replaced");
            }
            Identity::Anonymous(token) => {
                self.sessions.set(token, categories.clone()).await;
            }
        }
        metrics::record_preference_write(identity.is_anonymous());

        Ok(categories)
    }

    /// Popularity across all users plus the caller's own summary.
    ///
    /// Read failures degrade to empty popularity and missing user stats.
    pub async fn stats(&self, identity: &Identity) -> StatsReport {
        let popular_categories = self
            .durable
            .popular_categories(POPULAR_CATEGORY_LIMIT)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load popular categories");
                Vec::new()
            });

        let user_stats = match identity.user_id() {
            Some(user_id) => self.durable.user_stats(user_id).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load preference stats");
                None
            }),
            None => None,
        };

        StatsReport {
            popular_categories,
            user_stats,
        }
    }
}

/// Registry filter, first-occurrence dedupe and size bounds
pub fn validate_selection(raw: &[String]) -> std::result::Result<Vec<Category>, ValidationError> {
    let mut categories: Vec<Category> = Vec::with_capacity(raw.len());
    for category in raw.iter().filter_map(|name| name.parse::<Category>().ok()) {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }

    if categories.is_empty() {
        return Err(ValidationError::NoValidCategories);
    }
    if categories.len() > MAX_PREFERENCES {
        return Err(ValidationError::TooManyCategories {
            max: MAX_PREFERENCES,
        });
    }

    Ok(categories)
}
