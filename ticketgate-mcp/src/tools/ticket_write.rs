//! Ticket write tools: create and update

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite};
use ticketgate_core::Capability;
use uuid::Uuid;

use super::tickets::{authorize_ticket, TicketRef};
use super::{non_empty, positive, ToolContext, ToolDefinition};
use crate::error::ToolError;

pub const CREATE_TICKET: &str = "create_ticket";
pub const UPDATE_TICKET: &str = "update_ticket";

const DEFAULT_PRIORITY_ID: i64 = 3;
const DEFAULT_STATE_ID: i64 = 1;
const AGENT_SENDER_TYPE_ID: i64 = 1;

/// create_ticket tool definition
pub fn create_ticket_tool() -> ToolDefinition {
    ToolDefinition {
        name: CREATE_TICKET.to_string(),
        description: "Create a ticket with its first article. Requires the create permission on the target queue.".to_string(),
        input_schema: json!({
            "type": "object",
            "required": ["title", "queue_id", "body"],
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Ticket title"
                },
                "queue_id": {
                    "type": "integer",
                    "description": "Queue to create the ticket in"
                },
                "body": {
                    "type": "string",
                    "description": "Body of the first article"
                },
                "priority_id": {
                    "type": "integer",
                    "default": DEFAULT_PRIORITY_ID,
                    "description": "Priority (1 very low .. 5 very high)"
                },
                "state_id": {
                    "type": "integer",
                    "default": DEFAULT_STATE_ID,
                    "description": "Initial state"
                },
                "customer_user": {
                    "type": "string",
                    "description": "Customer user login"
                }
            }
        }),
    }
}

/// update_ticket tool definition
pub fn update_ticket_tool() -> ToolDefinition {
    ToolDefinition {
        name: UPDATE_TICKET.to_string(),
        description: "Update ticket fields. Moving needs move_into on the destination queue, priority and owner changes need their own permissions.".to_string(),
        input_schema: json!({
            "type": "object",
            "required": ["ticket_id"],
            "properties": {
                "ticket_id": {
                    "type": "integer",
                    "description": "Ticket to update"
                },
                "title": {
                    "type": "string",
                    "description": "New title"
                },
                "state_id": {
                    "type": "integer",
                    "description": "New state"
                },
                "priority_id": {
                    "type": "integer",
                    "description": "New priority"
                },
                "queue_id": {
                    "type": "integer",
                    "description": "Queue to move the ticket to"
                },
                "owner_id": {
                    "type": "integer",
                    "description": "New owner"
                }
            }
        }),
    }
}

/// Input for create_ticket
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTicketInput {
    pub title: Option<String>,
    pub queue_id: Option<i64>,
    pub body: Option<String>,
    pub priority_id: Option<i64>,
    pub state_id: Option<i64>,
    pub customer_user: Option<String>,
}

/// Input for update_ticket
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTicketInput {
    pub ticket_id: Option<i64>,
    pub title: Option<String>,
    pub state_id: Option<i64>,
    pub priority_id: Option<i64>,
    pub queue_id: Option<i64>,
    pub owner_id: Option<i64>,
}

/// Output from create_ticket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedTicket {
    pub ticket_id: i64,
    pub ticket_number: String,
    pub article_id: i64,
    pub message: String,
}

/// Output from update_ticket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedTicket {
    pub ticket_id: i64,
    pub message: String,
    pub updated: Vec<&'static str>,
}

/// Ticket number: creation date followed by eight random digits
pub(crate) fn ticket_number(now: &DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().as_u128() % 100_000_000;
    format!("{}{:08}", now.format("%Y%m%d"), suffix)
}

/// Execute create_ticket
pub async fn create_ticket(ctx: &ToolContext<'_>, input: CreateTicketInput) -> Result<CreatedTicket, ToolError> {
    let (Some(title), Some(queue_id), Some(body)) =
        (non_empty(input.title), positive(input.queue_id), non_empty(input.body))
    else {
        return Err(ToolError::Validation("title, queue_id, and body are required"));
    };

    let principal = ctx.principal;
    if !ctx
        .permissions
        .has_capability(principal.id, queue_id, Capability::Create)
        .await?
    {
        tracing::info!(principal = principal.id, queue = queue_id, "create denied");
        return Err(ToolError::PermissionDenied(
            "no permission to create tickets in this queue",
        ));
    }

    let priority_id = positive(input.priority_id).unwrap_or(DEFAULT_PRIORITY_ID);
    let state_id = positive(input.state_id).unwrap_or(DEFAULT_STATE_ID);
    let customer_user = input.customer_user.unwrap_or_default();
    let now = Utc::now();
    let number = ticket_number(&now);

    let mut tx = ctx
        .store
        .pool()
        .begin()
        .await
        .map_err(ToolError::store("failed to begin transaction"))?;

    let ticket_id = sqlx::query(
        "INSERT INTO ticket (tn, title, queue_id, ticket_state_id, ticket_priority_id,
            customer_id, customer_user_id, user_id, responsible_user_id,
            create_time, create_by, change_time, change_by)
         VALUES (?, ?, ?, ?, ?, '', ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(number.as_str())
    .bind(title.as_str())
    .bind(queue_id)
    .bind(state_id)
    .bind(priority_id)
    .bind(customer_user)
    .bind(principal.id)
    .bind(principal.id)
    .bind(now)
    .bind(principal.id)
    .bind(now)
    .bind(principal.id)
    .execute(&mut *tx)
    .await
    .map_err(ToolError::store("failed to create ticket"))?
    .last_insert_rowid();

    let article_id = sqlx::query(
        "INSERT INTO article (ticket_id, article_sender_type_id, communication_channel_id,
            is_visible_for_customer, create_time, create_by, change_time, change_by)
         VALUES (?, ?, 1, 1, ?, ?, ?, ?)",
    )
    .bind(ticket_id)
    .bind(AGENT_SENDER_TYPE_ID)
    .bind(now)
    .bind(principal.id)
    .bind(now)
    .bind(principal.id)
    .execute(&mut *tx)
    .await
    .map_err(ToolError::store("failed to create article"))?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO article_data_mime (article_id, a_from, a_to, a_subject, a_body,
            a_content_type, incoming_time, create_time, create_by, change_time, change_by)
         VALUES (?, ?, '', ?, ?, 'text/plain', ?, ?, ?, ?, ?)",
    )
    .bind(article_id)
    .bind(principal.login.as_str())
    .bind(title.as_str())
    .bind(body)
    .bind(now.timestamp())
    .bind(now)
    .bind(principal.id)
    .bind(now)
    .bind(principal.id)
    .execute(&mut *tx)
    .await
    .map_err(ToolError::store("failed to store article body"))?;

    tx.commit()
        .await
        .map_err(ToolError::store("failed to commit ticket"))?;

    tracing::info!(principal = principal.id, ticket = ticket_id, queue = queue_id, "ticket created");

    Ok(CreatedTicket {
        ticket_id,
        message: format!("Ticket {number} created successfully"),
        ticket_number: number,
        article_id,
    })
}

/// One column assignment of an update
enum Change {
    Text(&'static str, String),
    Id(&'static str, i64),
}

impl Change {
    fn column(&self) -> &'static str {
        match self {
            Change::Text(column, _) | Change::Id(column, _) => column,
        }
    }
}

/// Execute update_ticket
///
/// All capability checks run before the single UPDATE, so a denial on any
/// field leaves the ticket untouched.
pub async fn update_ticket(ctx: &ToolContext<'_>, input: UpdateTicketInput) -> Result<UpdatedTicket, ToolError> {
    let ticket_id = positive(input.ticket_id).ok_or(ToolError::Validation("ticket_id is required"))?;

    let principal = ctx.principal;
    let ticket = authorize_ticket(ctx, &TicketRef::Id(ticket_id), Capability::Read).await?;

    let mut changes = Vec::new();

    if let Some(title) = non_empty(input.title) {
        changes.push(Change::Text("title", title));
    }
    if let Some(state_id) = positive(input.state_id) {
        changes.push(Change::Id("ticket_state_id", state_id));
    }
    if let Some(priority_id) = positive(input.priority_id) {
        changes.push(Change::Id("ticket_priority_id", priority_id));
    }
    if let Some(queue_id) = positive(input.queue_id).filter(|q| *q != ticket.queue_id) {
        changes.push(Change::Id("queue_id", queue_id));
    }
    if let Some(owner_id) = positive(input.owner_id) {
        changes.push(Change::Id("user_id", owner_id));
    }

    if changes.is_empty() {
        return Err(ToolError::Validation("no fields to update"));
    }

    for change in &changes {
        let (queue, capability, denial) = match change {
            Change::Id("ticket_priority_id", _) => (
                ticket.queue_id,
                Capability::ChangePriority,
                "no permission to change priority",
            ),
            Change::Id("queue_id", destination) => (
                *destination,
                Capability::MoveInto,
                "no permission to move ticket to this queue",
            ),
            Change::Id("user_id", _) => (
                ticket.queue_id,
                Capability::BecomeOwner,
                "no permission to change owner",
            ),
            _ => continue,
        };

        if !ctx.permissions.has_capability(principal.id, queue, capability).await? {
            tracing::info!(
                principal = principal.id,
                ticket = ticket.id,
                queue,
                %capability,
                "update denied"
            );
            return Err(ToolError::PermissionDenied(denial));
        }
    }

    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE ticket SET ");
    let mut assignments = builder.separated(", ");
    for change in &changes {
        match change {
            Change::Text(column, value) => {
                assignments.push(*column);
                assignments.push_unseparated(" = ");
                assignments.push_bind_unseparated(value.clone());
            }
            Change::Id(column, value) => {
                assignments.push(*column);
                assignments.push_unseparated(" = ");
                assignments.push_bind_unseparated(*value);
            }
        }
    }
    assignments.push("change_time = ");
    assignments.push_bind_unseparated(Utc::now());
    assignments.push("change_by = ");
    assignments.push_bind_unseparated(principal.id);
    builder.push(" WHERE id = ").push_bind(ticket.id);

    builder
        .build()
        .execute(ctx.store.pool())
        .await
        .map_err(ToolError::store("failed to update ticket"))?;

    let updated: Vec<&'static str> = changes.iter().map(Change::column).collect();
    tracing::info!(principal = principal.id, ticket = ticket.id, ?updated, "ticket updated");

    Ok(UpdatedTicket {
        ticket_id: ticket.id,
        message: "Ticket updated successfully".to_string(),
        updated,
    })
}
