//! Ticketgate MCP Server Binary
//!
//! Serves ticket tools to one agent over stdio, acting as one agent login.
//!
//! ## Usage
//!
//! ```bash
//! # Run as MCP server (stdio)
//! ticketgate-mcp --login agent.smith --database-url sqlite://desk.db
//!
//! # Create the reference schema first
//! TICKETGATE_LOGIN=agent.smith ticketgate-mcp --init-schema
//! ```

use clap::Parser;
use ticketgate_core::{Principal, Store};
use ticketgate_mcp::{McpServer, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ticketgate-mcp", version, about = "Authorization-aware MCP server for a ticket store")]
struct Args {
    /// SQLite connection URL
    #[arg(long, env = "TICKETGATE_DATABASE_URL", default_value = "sqlite://ticketgate.db")]
    database_url: String,

    /// Agent login every tool call acts as
    #[arg(long, env = "TICKETGATE_LOGIN")]
    login: String,

    /// Maximum pooled store connections
    #[arg(long, env = "TICKETGATE_MAX_CONNECTIONS", default_value_t = 8)]
    max_connections: u32,

    /// Permission group whose members may run execute_sql
    #[arg(long, env = "TICKETGATE_ADMIN_GROUP", default_value = "admin")]
    admin_group: String,

    /// Timeout for execute_sql, in seconds
    #[arg(long, env = "TICKETGATE_QUERY_TIMEOUT_SECS", default_value_t = 30)]
    query_timeout_secs: u64,

    /// Create the reference schema before serving
    #[arg(long)]
    init_schema: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.database_url.clone())
            .with_max_connections(self.max_connections)
            .with_admin_group(self.admin_group.clone())
            .with_query_timeout_secs(self.query_timeout_secs)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (to stderr so it doesn't interfere with stdio MCP)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticketgate_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.server_config();

    tracing::info!("Starting Ticketgate MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let store_config = config.store_config().with_create_if_missing(args.init_schema);
    let store = Store::connect(&store_config).await?;
    if args.init_schema {
        store.ensure_schema().await?;
        tracing::info!("reference schema ready");
    }

    let principal = Principal::resolve_by_login(&store, &args.login).await?;
    tracing::info!(principal = principal.id, login = %principal.login, "acting as principal");

    let server = McpServer::new(store.clone(), principal, config);

    tracing::info!("MCP server ready, listening on stdio");
    server.run_stdio().await?;

    store.close().await;
    Ok(())
}
