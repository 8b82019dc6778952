//! Database layer for Newsdesk
//!
//! Provides:
//! - SeaORM entity models
//! - Repository implementations of the preference and activity stores
//! - Connection pool management and schema bootstrap

pub mod models;
mod repository;

pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::{ApiUsageEntity, PreferenceEntity, SearchHistoryEntity};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pub primary: DatabaseConnection,
}

impl DbPool {
    /// Connect to `url` using the pool settings in `config`
    pub async fn new(config: &DatabaseConfig, url: &str) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let primary = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { primary })
    }

    /// Wrap an already open connection
    pub fn from_connection(primary: DatabaseConnection) -> Self {
        Self { primary }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }

    /// Create any missing tables and indexes
    pub async fn ensure_schema(&self) -> Result<()> {
        self.create_entity(PreferenceEntity).await?;
        self.create_entity(SearchHistoryEntity).await?;
        self.create_entity(ApiUsageEntity).await?;

        info!("Database schema ready");
        Ok(())
    }

    async fn create_entity<E: EntityTrait>(&self, entity: E) -> Result<()> {
        let backend = self.primary.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(entity);
        table.if_not_exists();
        self.primary.execute(backend.build(&table)).await?;

        for mut index in schema.create_index_from_entity(entity) {
            index.if_not_exists();
            self.primary.execute(backend.build(&index)).await?;
        }

        Ok(())
    }
}
