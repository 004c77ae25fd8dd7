//! Database layer for CardForge
//!
//! Provides:
//! - SeaORM entity models
//! - The owner-scoped record store contract
//! - A Postgres repository and an in-process store
//! - Connection pool management

pub mod models;
mod memory;
mod repository;
mod store;

pub use memory::InMemoryStore;
pub use repository::Repository;
pub use store::{
    FlashcardChanges, FlashcardStore, ListPage, ListQuery, NewFlashcard, NewSystemLog,
    SortField, SortOrder, SystemLogSink, MAX_OFFSET,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    connection: Arc<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let connection = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self {
            connection: Arc::new(connection),
        })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.connection
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}
