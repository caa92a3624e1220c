//! MCP Tool implementations
//!
//! These are the operations exposed to agents through `tools/call`. The
//! catalogue is built once and served verbatim to every principal;
//! authorization happens when an operation runs, never at discovery.
//!
//! Arguments are decoded into a typed [`Invocation`] before any executor
//! sees them. Executors then check capabilities through the
//! [`PermissionResolver`] and scope every query to the principal's
//! accessible queues.

pub mod articles;
pub mod directory;
pub mod sql;
pub mod statistics;
pub mod ticket_write;
pub mod tickets;

use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};
use ticketgate_core::{PermissionResolver, Principal, QueueId, Store};

use crate::error::ToolError;

/// Tool definition for MCP protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,

    /// Description shown to the agent
    pub description: String,

    /// JSON Schema for input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static CATALOGUE: LazyLock<Vec<ToolDefinition>> = LazyLock::new(|| {
    vec![
        tickets::list_tickets_tool(),
        tickets::get_ticket_tool(),
        ticket_write::create_ticket_tool(),
        ticket_write::update_ticket_tool(),
        articles::add_article_tool(),
        directory::list_queues_tool(),
        directory::list_users_tool(),
        tickets::search_tickets_tool(),
        statistics::get_statistics_tool(),
        sql::execute_sql_tool(),
    ]
});

/// Every invocable operation, identical for all principals
pub fn catalogue() -> &'static [ToolDefinition] {
    &CATALOGUE
}

/// Tool call response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: false,
        }
    }

    pub fn error(err: &ToolError) -> Self {
        Self {
            content: vec![ToolContent::text(format!("Error: {err}"))],
            is_error: true,
        }
    }

    /// First text block, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| c.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolContent {
    pub fn text(text: String) -> Self {
        Self {
            content_type: "text".to_string(),
            text,
        }
    }
}

/// What an executor needs to act on behalf of the session principal
pub struct ToolContext<'a> {
    pub store: &'a Store,
    pub permissions: &'a dyn PermissionResolver,
    pub principal: &'a Principal,
    pub query_timeout: Duration,
}

/// A decoded `tools/call`, one variant per catalogue entry
#[derive(Debug, Clone)]
pub enum Invocation {
    ListTickets(tickets::ListTicketsInput),
    GetTicket(tickets::GetTicketInput),
    CreateTicket(ticket_write::CreateTicketInput),
    UpdateTicket(ticket_write::UpdateTicketInput),
    AddArticle(articles::AddArticleInput),
    ListQueues,
    ListUsers(directory::ListUsersInput),
    SearchTickets(tickets::SearchTicketsInput),
    GetStatistics,
    ExecuteSql(sql::ExecuteSqlInput),
}

impl Invocation {
    /// Decode a flat argument map for the named operation
    pub fn parse(name: &str, arguments: Map<String, Value>) -> Result<Self, ToolError> {
        let args = Value::Object(arguments);
        let invocation = match name {
            tickets::LIST_TICKETS => Invocation::ListTickets(decode(tickets::LIST_TICKETS, args)?),
            tickets::GET_TICKET => Invocation::GetTicket(decode(tickets::GET_TICKET, args)?),
            ticket_write::CREATE_TICKET => {
                Invocation::CreateTicket(decode(ticket_write::CREATE_TICKET, args)?)
            }
            ticket_write::UPDATE_TICKET => {
                Invocation::UpdateTicket(decode(ticket_write::UPDATE_TICKET, args)?)
            }
            articles::ADD_ARTICLE => Invocation::AddArticle(decode(articles::ADD_ARTICLE, args)?),
            directory::LIST_QUEUES => Invocation::ListQueues,
            directory::LIST_USERS => Invocation::ListUsers(decode(directory::LIST_USERS, args)?),
            tickets::SEARCH_TICKETS => {
                Invocation::SearchTickets(decode(tickets::SEARCH_TICKETS, args)?)
            }
            statistics::GET_STATISTICS => Invocation::GetStatistics,
            sql::EXECUTE_SQL => Invocation::ExecuteSql(decode(sql::EXECUTE_SQL, args)?),
            other => return Err(ToolError::UnknownOperation(other.to_string())),
        };
        Ok(invocation)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Invocation::ListTickets(_) => tickets::LIST_TICKETS,
            Invocation::GetTicket(_) => tickets::GET_TICKET,
            Invocation::CreateTicket(_) => ticket_write::CREATE_TICKET,
            Invocation::UpdateTicket(_) => ticket_write::UPDATE_TICKET,
            Invocation::AddArticle(_) => articles::ADD_ARTICLE,
            Invocation::ListQueues => directory::LIST_QUEUES,
            Invocation::ListUsers(_) => directory::LIST_USERS,
            Invocation::SearchTickets(_) => tickets::SEARCH_TICKETS,
            Invocation::GetStatistics => statistics::GET_STATISTICS,
            Invocation::ExecuteSql(_) => sql::EXECUTE_SQL,
        }
    }

    /// Run the operation and render its payload as pretty-printed JSON
    pub async fn execute(self, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        match self {
            Invocation::ListTickets(input) => render(&tickets::list_tickets(ctx, input).await?),
            Invocation::GetTicket(input) => render(&tickets::get_ticket(ctx, input).await?),
            Invocation::CreateTicket(input) => {
                render(&ticket_write::create_ticket(ctx, input).await?)
            }
            Invocation::UpdateTicket(input) => {
                render(&ticket_write::update_ticket(ctx, input).await?)
            }
            Invocation::AddArticle(input) => render(&articles::add_article(ctx, input).await?),
            Invocation::ListQueues => render(&directory::list_queues(ctx).await?),
            Invocation::ListUsers(input) => render(&directory::list_users(ctx, input).await?),
            Invocation::SearchTickets(input) => {
                render(&tickets::search_tickets(ctx, input).await?)
            }
            Invocation::GetStatistics => render(&statistics::get_statistics(ctx).await?),
            Invocation::ExecuteSql(input) => render(&sql::execute_sql(ctx, input).await?),
        }
    }
}

fn decode<T: DeserializeOwned>(operation: &'static str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        operation,
        detail: e.to_string(),
    })
}

fn render<T: Serialize>(value: &T) -> Result<String, ToolError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub(crate) const MAX_LIMIT: i64 = 100;

/// Clamp a page size into `1..=MAX_LIMIT`
pub(crate) fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIMIT)
}

/// Treat empty or whitespace-only strings as absent
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Treat zero and negative ids as absent
pub(crate) fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|id| *id > 0)
}

pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Queues the principal may read, re-derived on every call
pub(crate) async fn accessible_queues(ctx: &ToolContext<'_>) -> Result<BTreeSet<QueueId>, ToolError> {
    Ok(ctx.permissions.accessible_groups(ctx.principal.id).await?)
}

/// Append `<column> IN (?, ?, ...)` for a non-empty queue set
pub(crate) fn push_queue_scope(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    queues: &BTreeSet<QueueId>,
) {
    builder.push(column).push(" IN (");
    let mut ids = builder.separated(", ");
    for queue in queues {
        ids.push_bind(*queue);
    }
    ids.push_unseparated(")");
}

/// Escape LIKE metacharacters so the query text matches literally
pub(crate) fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
