//! Relational store
//!
//! A thin wrapper over a pooled SQLite connection. Every query is an
//! awaited future, so dropping the caller's future cancels the query.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketgate_core::store::{Store, StoreConfig};
//!
//! let store = Store::connect(&StoreConfig::new("sqlite://desk.db")).await?;
//! store.ensure_schema().await?;
//! ```

mod schema;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::{CoreError, Result};

/// Connection settings for the store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite URL, e.g. `sqlite://ticketgate.db`
    pub database_url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// Create the database file when it does not exist
    pub create_if_missing: bool,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://ticketgate.db".to_string(),
            max_connections: 8,
            create_if_missing: false,
        }
    }
}

/// Pooled, concurrency-safe handle to the relational store
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open a connection pool
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        if config.max_connections == 0 {
            return Err(CoreError::InvalidConfig {
                reason: "max_connections must be at least 1".to_string(),
            });
        }

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| CoreError::InvalidConfig {
                reason: format!("bad database url '{}': {}", config.database_url, e),
            })?
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(CoreError::store("failed to open store"))?;

        tracing::debug!(url = %config.database_url, max = config.max_connections, "store pool opened");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the reference schema and its lookup rows if absent
    pub async fn ensure_schema(&self) -> Result<()> {
        schema::ensure(&self.pool).await
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
