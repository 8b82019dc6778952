//! Repository pattern for database operations
//!
//! Backs the preference store and the activity logger with SeaORM. Every
//! preference replacement runs in a single transaction.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
    TransactionTrait,
};
use std::time::Duration;

use crate::activity::{window_start, ActivitySink, UsageLogEntry};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use crate::news::Category;
use crate::preferences::{summarize, CategoryCount, PreferenceRepository, PreferenceStats};

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    async fn replace_within(
        txn: &DatabaseTransaction,
        user_id: &str,
        categories: &[Category],
    ) -> Result<()> {
        // Serialize concurrent replaces for one user until commit
        if txn.get_database_backend() == DbBackend::Postgres {
            txn.execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT pg_advisory_xact_lock(hashtext($1))",
                [user_id.into()],
            ))
            .await?;
        }

        PreferenceEntity::delete_many()
            .filter(PreferenceColumn::UserId.eq(user_id))
            .exec(txn)
            .await?;

        if categories.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let rows = categories.iter().map(|category| PreferenceActiveModel {
            id: NotSet,
            user_id: Set(user_id.to_string()),
            category: Set(category.to_string()),
            created_at: Set(now),
        });
        PreferenceEntity::insert_many(rows).exec(txn).await?;

        Ok(())
    }
}

#[async_trait]
impl PreferenceRepository for Repository {
    async fn load(&self, user_id: &str) -> Result<Vec<String>> {
        let rows = PreferenceEntity::find()
            .filter(PreferenceColumn::UserId.eq(user_id))
            .order_by_asc(PreferenceColumn::Id)
            .all(self.conn())
            .await?;

        Ok(rows.into_iter().map(|row| row.category).collect())
    }

    async fn replace(&self, user_id: &str, categories: &[Category]) -> Result<()> {
        let txn = self.conn().begin().await?;

        match Self::replace_within(&txn, user_id, categories).await {
            Ok(()) => {
                txn.commit().await?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rolling back preference replace");
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn popular_categories(&self, limit: u64) -> Result<Vec<CategoryCount>> {
        let rows: Vec<(String, i64)> = PreferenceEntity::find()
            .select_only()
            .column(PreferenceColumn::Category)
            .column_as(Expr::col(PreferenceColumn::Id).count(), "count")
            .group_by(PreferenceColumn::Category)
            .order_by_desc(Expr::col(PreferenceColumn::Id).count())
            .order_by_asc(PreferenceColumn::Category)
            .limit(limit)
            .into_tuple()
            .all(self.conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category,
                count: count.max(0) as u64,
            })
            .collect())
    }

    async fn user_stats(&self, user_id: &str) -> Result<Option<PreferenceStats>> {
        let rows = PreferenceEntity::find()
            .filter(PreferenceColumn::UserId.eq(user_id))
            .all(self.conn())
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(summarize(rows.into_iter().map(|row| row.created_at))))
    }
}

#[async_trait]
impl ActivitySink for Repository {
    async fn record_usage(&self, entry: &UsageLogEntry) -> Result<()> {
        let row = ApiUsageActiveModel {
            id: NotSet,
            endpoint: Set(entry.endpoint.clone()),
            request_params: Set(entry.params.clone()),
            response_status: Set(i32::from(entry.status)),
            execution_time_ms: Set(i64::try_from(entry.elapsed_ms).unwrap_or(i64::MAX)),
            created_at: Set(Utc::now()),
        };
        row.insert(self.conn()).await?;
        Ok(())
    }

    async fn record_search(&self, query: &str, user_id: Option<&str>) -> Result<()> {
        let row = SearchHistoryActiveModel {
            id: NotSet,
            user_id: Set(user_id.map(str::to_string)),
            search_query: Set(query.to_string()),
            results_count: Set(None),
            searched_at: Set(Utc::now()),
        };
        row.insert(self.conn()).await?;
        Ok(())
    }

    async fn update_search_results(
        &self,
        query: &str,
        results_count: u64,
        window: Duration,
    ) -> Result<bool> {
        let cutoff = window_start(Utc::now(), window);

        let newest = SearchHistoryEntity::find()
            .filter(SearchHistoryColumn::SearchQuery.eq(query))
            .filter(SearchHistoryColumn::SearchedAt.gte(cutoff))
            .order_by_desc(SearchHistoryColumn::SearchedAt)
            .order_by_desc(SearchHistoryColumn::Id)
            .one(self.conn())
            .await?;

        let Some(row) = newest else {
            return Ok(false);
        };

        let mut row: SearchHistoryActiveModel = row.into();
        row.results_count = Set(Some(i32::try_from(results_count).unwrap_or(i32::MAX)));
        row.update(self.conn()).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{Identity, PreferenceStore};
    use sea_orm::{ConnectOptions, Database};
    use serde_json::json;
    use std::sync::Arc;

    async fn sqlite_repository() -> Repository {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).sqlx_logging(false);
        let conn = Database::connect(opts).await.unwrap();

        let pool = DbPool::from_connection(conn);
        pool.ensure_schema().await.unwrap();
        Repository::new(pool)
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let repo = sqlite_repository().await;
        repo.pool.ensure_schema().await.unwrap();
        repo.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_set() {
        let repo = sqlite_repository().await;

        repo.replace("u1", &[Category::Sports, Category::Health]).await.unwrap();
        repo.replace("u2", &[Category::Science]).await.unwrap();
        assert_eq!(repo.load("u1").await.unwrap(), ["sports", "health"]);

        repo.replace("u1", &[Category::Business]).await.unwrap();
        assert_eq!(repo.load("u1").await.unwrap(), ["business"]);
        assert_eq!(repo.load("u2").await.unwrap(), ["science"]);
        assert!(repo.load("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let repo = sqlite_repository().await;
        let set = [Category::Technology, Category::General];

        repo.replace("u1", &set).await.unwrap();
        repo.replace("u1", &set).await.unwrap();
        assert_eq!(repo.load("u1").await.unwrap(), ["technology", "general"]);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back() {
        let repo = sqlite_repository().await;
        repo.replace("u1", &[Category::Health]).await.unwrap();

        repo.conn()
            .execute_unprepared(
                "CREATE TRIGGER reject_sports BEFORE INSERT ON preferences \
                 WHEN NEW.category = 'sports' \
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .await
            .unwrap();

        let err = repo
            .replace("u1", &[Category::Science, Category::Sports])
            .await
            .unwrap_err();
        assert!(err.is_server_error());

        assert_eq!(repo.load("u1").await.unwrap(), ["health"]);
    }

    #[tokio::test]
    async fn test_store_over_database() {
        let repo = Arc::new(sqlite_repository().await);
        let store = PreferenceStore::new(repo.clone(), Duration::from_secs(60));
        let user = Identity::User("u1".into());

        store.replace(&user, &names(&["science", "science", "weather"])).await.unwrap();
        assert_eq!(store.get(&user).await, [Category::Science]);

        assert!(store.replace(&user, &names(&["weather"])).await.is_err());
        assert_eq!(repo.load("u1").await.unwrap(), ["science"]);
    }

    #[tokio::test]
    async fn test_popular_categories_and_stats() {
        let repo = sqlite_repository().await;
        repo.replace("a", &[Category::Sports, Category::Health]).await.unwrap();
        repo.replace("b", &[Category::Sports, Category::Science]).await.unwrap();
        repo.replace("c", &[Category::Sports, Category::Health]).await.unwrap();

        let popular = repo.popular_categories(2).await.unwrap();
        assert_eq!(
            popular,
            [
                CategoryCount { category: "sports".into(), count: 3 },
                CategoryCount { category: "health".into(), count: 2 },
            ]
        );

        let stats = repo.user_stats("a").await.unwrap().unwrap();
        assert_eq!(stats.total_preferences, 2);
        assert!(stats.first_preference_date.is_some());
        assert!(repo.user_stats("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activity_rows() {
        let repo = sqlite_repository().await;

        repo.record_usage(&UsageLogEntry {
            endpoint: "/search".into(),
            params: json!({ "query": "ai", "apiKey": "[REDACTED]" }),
            status: 200,
            elapsed_ms: 42,
        })
        .await
        .unwrap();

        repo.record_search("ai", Some("u1")).await.unwrap();
        repo.record_search("ai", None).await.unwrap();
        assert!(repo
            .update_search_results("ai", 7, Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!repo
            .update_search_results("rust", 1, Duration::from_secs(60))
            .await
            .unwrap());

        let usage = ApiUsageEntity::find().all(repo.conn()).await.unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].response_status, 200);
        assert_eq!(usage[0].request_params["query"], "ai");

        let searches = SearchHistoryEntity::find()
            .order_by_asc(SearchHistoryColumn::Id)
            .all(repo.conn())
            .await
            .unwrap();
        assert_eq!(searches[0].results_count, None);
        assert_eq!(searches[0].user_id.as_deref(), Some("u1"));
        assert_eq!(searches[1].results_count, Some(7));
    }

    #[tokio::test]
    async fn test_concurrent_replaces_commit_whole_sets() {
        let repo = Arc::new(sqlite_repository().await);
        let sets: [&[Category]; 3] = [
            &[Category::Sports, Category::Health],
            &[Category::Science],
            &[Category::Business, Category::Technology, Category::General],
        ];

        let tasks: Vec<_> = (0..24)
            .map(|i| {
                let repo = repo.clone();
                let set = sets[i % sets.len()];
                tokio::spawn(async move { repo.replace("racer", set).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let stored = repo.load("racer").await.unwrap();
        let matches = sets.iter().any(|set| {
            set.iter().map(Category::to_string).collect::<Vec<_>>() == stored
        });
        assert!(matches, "mixed set {stored:?}");
    }
}
