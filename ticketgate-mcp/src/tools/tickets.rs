//! Ticket read tools: listing, search and detail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use ticketgate_core::{Capability, QueueId};

use super::{
    accessible_queues, clamp_limit, format_time, like_pattern, non_empty, positive,
    push_queue_scope, ToolContext, ToolDefinition,
};
use crate::error::ToolError;

pub const LIST_TICKETS: &str = "list_tickets";
pub const GET_TICKET: &str = "get_ticket";
pub const SEARCH_TICKETS: &str = "search_tickets";

/// list_tickets tool definition
pub fn list_tickets_tool() -> ToolDefinition {
    ToolDefinition {
        name: LIST_TICKETS.to_string(),
        description: "List tickets in the queues you can read, newest first. Optional filters narrow the result; a queue you cannot read yields an empty list.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "queue_id": {
                    "type": "integer",
                    "description": "Only tickets in this queue"
                },
                "state_id": {
                    "type": "integer",
                    "description": "Only tickets in this state"
                },
                "owner_id": {
                    "type": "integer",
                    "description": "Only tickets owned by this user"
                },
                "customer_id": {
                    "type": "string",
                    "description": "Only tickets for this customer"
                },
                "limit": {
                    "type": "integer",
                    "default": 20,
                    "description": "Maximum results to return (max 100)"
                },
                "offset": {
                    "type": "integer",
                    "default": 0,
                    "description": "Number of results to skip"
                }
            }
        }),
    }
}

/// get_ticket tool definition
pub fn get_ticket_tool() -> ToolDefinition {
    ToolDefinition {
        name: GET_TICKET.to_string(),
        description: "Get a ticket by id or ticket number, including its articles oldest first.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "ticket_id": {
                    "type": "integer",
                    "description": "Ticket id"
                },
                "ticket_number": {
                    "type": "string",
                    "description": "Ticket number, used when ticket_id is not given"
                },
                "include_articles": {
                    "type": "boolean",
                    "default": true,
                    "description": "Include the article history"
                }
            }
        }),
    }
}

/// search_tickets tool definition
pub fn search_tickets_tool() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_TICKETS.to_string(),
        description: "Search ticket titles and numbers in the queues you can read.".to_string(),
        input_schema: json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to look for in the title or ticket number"
                },
                "limit": {
                    "type": "integer",
                    "default": 20,
                    "description": "Maximum results to return (max 100)"
                },
                "offset": {
                    "type": "integer",
                    "default": 0,
                    "description": "Number of results to skip"
                }
            }
        }),
    }
}

fn default_limit() -> i64 {
    20
}

fn default_true() -> bool {
    true
}

/// Input for list_tickets
#[derive(Debug, Clone, Deserialize)]
pub struct ListTicketsInput {
    #[serde(default)]
    pub queue_id: Option<i64>,
    #[serde(default)]
    pub state_id: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Input for get_ticket
#[derive(Debug, Clone, Deserialize)]
pub struct GetTicketInput {
    #[serde(default)]
    pub ticket_id: Option<i64>,
    #[serde(default)]
    pub ticket_number: Option<String>,
    #[serde(default = "default_true")]
    pub include_articles: bool,
}

/// Input for search_tickets
#[derive(Debug, Clone, Deserialize)]
pub struct SearchTicketsInput {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// One row of list_tickets
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TicketSummary {
    pub id: i64,
    pub number: String,
    pub title: String,
    pub state: String,
    pub queue: String,
    pub priority: String,
    pub owner: String,
}

/// One row of search_tickets
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SearchHit {
    pub id: i64,
    pub number: String,
    pub title: String,
    pub state: String,
    pub queue: String,
}

/// Output from get_ticket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketDetail {
    pub id: i64,
    pub number: String,
    pub title: String,
    pub customer_id: String,
    pub customer_user_id: String,
    pub state: String,
    pub queue: String,
    pub priority: String,
    pub owner: String,
    pub create_time: String,
    pub change_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<Vec<ArticleView>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleView {
    pub id: i64,
    pub sender_type: String,
    pub subject: String,
    pub body: String,
    pub is_visible_for_customer: bool,
    pub create_time: String,
}

#[derive(Debug, FromRow)]
struct DetailRow {
    id: i64,
    number: String,
    title: String,
    customer_id: String,
    customer_user_id: String,
    state: String,
    queue: String,
    priority: String,
    owner: String,
    create_time: DateTime<Utc>,
    change_time: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ArticleRow {
    id: i64,
    sender_type: String,
    subject: String,
    body: String,
    is_visible_for_customer: bool,
    create_time: DateTime<Utc>,
}

/// How a caller names a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TicketRef {
    Id(i64),
    Number(String),
}

/// Where a ticket lives, read before any capability check
#[derive(Debug, Clone, FromRow)]
pub(crate) struct TicketLocation {
    pub id: i64,
    pub queue_id: QueueId,
    pub title: String,
}

/// Find a ticket's queue without disclosing anything to the caller
pub(crate) async fn locate_ticket(
    ctx: &ToolContext<'_>,
    ticket: &TicketRef,
) -> Result<Option<TicketLocation>, ToolError> {
    let query = match ticket {
        TicketRef::Id(id) => {
            sqlx::query_as::<_, TicketLocation>("SELECT id, queue_id, title FROM ticket WHERE id = ?")
                .bind(*id)
        }
        TicketRef::Number(number) => sqlx::query_as::<_, TicketLocation>(
            "SELECT id, queue_id, title FROM ticket WHERE tn = ? ORDER BY id LIMIT 1",
        )
        .bind(number.clone()),
    };

    query
        .fetch_optional(ctx.store.pool())
        .await
        .map_err(ToolError::store("query failed"))
}

/// Locate a ticket and require a capability on its queue
///
/// A missing capability is reported exactly like a missing ticket.
pub(crate) async fn authorize_ticket(
    ctx: &ToolContext<'_>,
    ticket: &TicketRef,
    capability: Capability,
) -> Result<TicketLocation, ToolError> {
    let location = locate_ticket(ctx, ticket)
        .await?
        .ok_or(ToolError::TicketNotFound)?;

    let granted = ctx
        .permissions
        .has_capability(ctx.principal.id, location.queue_id, capability)
        .await?;
    if !granted {
        tracing::info!(
            principal = ctx.principal.id,
            ticket = location.id,
            queue = location.queue_id,
            %capability,
            "ticket access denied"
        );
        return Err(ToolError::TicketNotFound);
    }

    Ok(location)
}

const SUMMARY_SELECT: &str = "SELECT t.id, t.tn AS number, t.title,
        COALESCE(ts.name, '') AS state, COALESCE(q.name, '') AS queue,
        COALESCE(p.name, '') AS priority, COALESCE(u.login, '') AS owner
    FROM ticket t
    LEFT JOIN ticket_state ts ON t.ticket_state_id = ts.id
    LEFT JOIN queue q ON t.queue_id = q.id
    LEFT JOIN ticket_priority p ON t.ticket_priority_id = p.id
    LEFT JOIN users u ON t.user_id = u.id
    WHERE ";

/// Execute list_tickets
pub async fn list_tickets(
    ctx: &ToolContext<'_>,
    input: ListTicketsInput,
) -> Result<Vec<TicketSummary>, ToolError> {
    let mut queues = accessible_queues(ctx).await?;

    if let Some(queue_id) = positive(input.queue_id) {
        // A filter outside the accessible set is indistinguishable from an empty queue
        queues.retain(|q| *q == queue_id);
    }
    if queues.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(SUMMARY_SELECT);
    push_queue_scope(&mut builder, "t.queue_id", &queues);

    if let Some(state_id) = positive(input.state_id) {
        builder.push(" AND t.ticket_state_id = ").push_bind(state_id);
    }
    if let Some(owner_id) = positive(input.owner_id) {
        builder.push(" AND t.user_id = ").push_bind(owner_id);
    }
    if let Some(customer_id) = non_empty(input.customer_id) {
        builder.push(" AND t.customer_id = ").push_bind(customer_id);
    }

    builder
        .push(" ORDER BY t.id DESC LIMIT ")
        .push_bind(clamp_limit(input.limit))
        .push(" OFFSET ")
        .push_bind(input.offset.max(0));

    builder
        .build_query_as::<TicketSummary>()
        .fetch_all(ctx.store.pool())
        .await
        .map_err(ToolError::store("query failed"))
}

/// Execute search_tickets
pub async fn search_tickets(
    ctx: &ToolContext<'_>,
    input: SearchTicketsInput,
) -> Result<Vec<SearchHit>, ToolError> {
    let text = non_empty(input.query).ok_or(ToolError::Validation("query is required"))?;

    let queues = accessible_queues(ctx).await?;
    if queues.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = like_pattern(text.trim());
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT t.id, t.tn AS number, t.title,
            COALESCE(ts.name, '') AS state, COALESCE(q.name, '') AS queue
        FROM ticket t
        LEFT JOIN ticket_state ts ON t.ticket_state_id = ts.id
        LEFT JOIN queue q ON t.queue_id = q.id
        WHERE ",
    );
    push_queue_scope(&mut builder, "t.queue_id", &queues);
    builder
        .push(" AND (LOWER(t.title) LIKE LOWER(")
        .push_bind(pattern.clone())
        .push(") ESCAPE '\\' OR t.tn LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '\\')")
        .push(" ORDER BY t.id DESC LIMIT ")
        .push_bind(clamp_limit(input.limit))
        .push(" OFFSET ")
        .push_bind(input.offset.max(0));

    builder
        .build_query_as::<SearchHit>()
        .fetch_all(ctx.store.pool())
        .await
        .map_err(ToolError::store("search failed"))
}

/// Execute get_ticket
pub async fn get_ticket(ctx: &ToolContext<'_>, input: GetTicketInput) -> Result<TicketDetail, ToolError> {
    let ticket = match (positive(input.ticket_id), non_empty(input.ticket_number)) {
        (Some(id), _) => TicketRef::Id(id),
        (None, Some(number)) => TicketRef::Number(number),
        (None, None) => {
            return Err(ToolError::Validation(
                "either ticket_id or ticket_number is required",
            ))
        }
    };

    let location = authorize_ticket(ctx, &ticket, Capability::Read).await?;

    let row = sqlx::query_as::<_, DetailRow>(
        "SELECT t.id, t.tn AS number, t.title,
            COALESCE(t.customer_id, '') AS customer_id,
            COALESCE(t.customer_user_id, '') AS customer_user_id,
            COALESCE(ts.name, '') AS state, COALESCE(q.name, '') AS queue,
            COALESCE(p.name, '') AS priority, COALESCE(u.login, '') AS owner,
            t.create_time, t.change_time
        FROM ticket t
        LEFT JOIN ticket_state ts ON t.ticket_state_id = ts.id
        LEFT JOIN queue q ON t.queue_id = q.id
        LEFT JOIN ticket_priority p ON t.ticket_priority_id = p.id
        LEFT JOIN users u ON t.user_id = u.id
        WHERE t.id = ?",
    )
    .bind(location.id)
    .fetch_optional(ctx.store.pool())
    .await
    .map_err(ToolError::store("query failed"))?
    .ok_or(ToolError::TicketNotFound)?;

    let articles = if input.include_articles {
        Some(load_articles(ctx, location.id).await?)
    } else {
        None
    };

    Ok(TicketDetail {
        id: row.id,
        number: row.number,
        title: row.title,
        customer_id: row.customer_id,
        customer_user_id: row.customer_user_id,
        state: row.state,
        queue: row.queue,
        priority: row.priority,
        owner: row.owner,
        create_time: format_time(&row.create_time),
        change_time: format_time(&row.change_time),
        articles,
    })
}

async fn load_articles(ctx: &ToolContext<'_>, ticket_id: i64) -> Result<Vec<ArticleView>, ToolError> {
    let rows = sqlx::query_as::<_, ArticleRow>(
        "SELECT a.id, COALESCE(ast.name, '') AS sender_type,
            COALESCE(adm.a_subject, '') AS subject, COALESCE(adm.a_body, '') AS body,
            a.is_visible_for_customer, a.create_time
        FROM article a
        LEFT JOIN article_data_mime adm ON a.id = adm.article_id
        LEFT JOIN article_sender_type ast ON a.article_sender_type_id = ast.id
        WHERE a.ticket_id = ?
        ORDER BY a.create_time ASC, a.id ASC",
    )
    .bind(ticket_id)
    .fetch_all(ctx.store.pool())
    .await
    .map_err(ToolError::store("articles query failed"))?;

    Ok(rows
        .into_iter()
        .map(|row| ArticleView {
            id: row.id,
            sender_type: row.sender_type,
            subject: row.subject,
            body: row.body,
            is_visible_for_customer: row.is_visible_for_customer,
            create_time: format_time(&row.create_time),
        })
        .collect())
}
