//! Server configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use ticketgate_core::{StoreConfig, DEFAULT_ADMIN_GROUP};

use crate::error::{McpError, McpResult};

/// Configuration for one server process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// SQLite connection URL
    pub database_url: String,
    /// Pool size shared by all sessions in the process
    pub max_connections: u32,
    /// Permission group whose members may run execute_sql
    pub admin_group: String,
    /// Statement timeout for execute_sql, in seconds
    pub query_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://ticketgate.db".to_string(),
            max_connections: 8,
            admin_group: DEFAULT_ADMIN_GROUP.to_string(),
            query_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Read `TICKETGATE_*` environment variables over the defaults
    pub fn from_env() -> McpResult<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TICKETGATE_DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(value) = std::env::var("TICKETGATE_MAX_CONNECTIONS") {
            config.max_connections = value
                .parse()
                .map_err(|_| McpError::Internal(format!("invalid TICKETGATE_MAX_CONNECTIONS: {value}")))?;
        }
        if let Ok(group) = std::env::var("TICKETGATE_ADMIN_GROUP") {
            config.admin_group = group;
        }
        if let Ok(value) = std::env::var("TICKETGATE_QUERY_TIMEOUT_SECS") {
            config.query_timeout_secs = value
                .parse()
                .map_err(|_| McpError::Internal(format!("invalid TICKETGATE_QUERY_TIMEOUT_SECS: {value}")))?;
        }
        Ok(config)
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_admin_group(mut self, admin_group: impl Into<String>) -> Self {
        self.admin_group = admin_group.into();
        self
    }

    pub fn with_query_timeout_secs(mut self, secs: u64) -> Self {
        self.query_timeout_secs = secs;
        self
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.database_url.clone()).with_max_connections(self.max_connections)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}
