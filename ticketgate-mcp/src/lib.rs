//! Ticketgate MCP Server Library
//!
//! This crate implements the Model Context Protocol (MCP) server that gives
//! agents authorization-aware access to a ticket store. A session acts as
//! exactly one principal; every tool call is checked against that
//! principal's queue permissions.
//!
//! ## Architecture
//!
//! ```text
//! Agent (Claude, GPT, etc.)
//!        │  JSON-RPC over stdio
//!        ▼
//! ┌──────────────────┐
//! │    McpServer     │ ◄── This crate
//! │                  │
//! │  ┌────────────┐  │
//! │  │   Tools    │  │ - list_tickets / get_ticket / search_tickets
//! │  │            │  │ - create_ticket / update_ticket / add_article
//! │  │            │  │ - list_queues / list_users / get_statistics
//! │  │            │  │ - execute_sql (admin only)
//! │  └────────────┘  │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  ticketgate-core │
//! │                  │
//! │ Permissions│Store│
//! └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ticketgate_core::{Principal, Store};
//! use ticketgate_mcp::{McpServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_env()?;
//!     let store = Store::connect(&config.store_config()).await?;
//!     let principal = Principal::resolve_by_login(&store, "agent.smith").await?;
//!
//!     McpServer::new(store, principal, config).run_stdio().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;

pub use config::ServerConfig;
pub use error::{McpError, McpResult, ToolError};
pub use server::McpServer;
pub use session::Session;
pub use tools::{catalogue, Invocation, ToolDefinition, ToolResult};

/// Server metadata for MCP protocol
pub const SERVER_NAME: &str = "ticketgate-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
