//! Directory tools: queues and users

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use ticketgate_core::AccessLevel;

use super::{clamp_limit, push_queue_scope, ToolContext, ToolDefinition};
use crate::error::ToolError;

pub const LIST_QUEUES: &str = "list_queues";
pub const LIST_USERS: &str = "list_users";

/// list_queues tool definition
pub fn list_queues_tool() -> ToolDefinition {
    ToolDefinition {
        name: LIST_QUEUES.to_string(),
        description: "List the queues you can read, with your access level on each.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// list_users tool definition
pub fn list_users_tool() -> ToolDefinition {
    ToolDefinition {
        name: LIST_USERS.to_string(),
        description: "List agent accounts.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "valid": {
                    "type": "boolean",
                    "default": true,
                    "description": "Only list valid (active) users"
                },
                "limit": {
                    "type": "integer",
                    "default": 50,
                    "description": "Maximum results to return (max 100)"
                }
            }
        }),
    }
}

fn default_limit() -> i64 {
    50
}

fn default_valid() -> bool {
    true
}

/// Input for list_users
#[derive(Debug, Clone, Deserialize)]
pub struct ListUsersInput {
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// One row of list_queues
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct QueueView {
    pub id: i64,
    pub name: String,
    pub group_id: i64,
    pub group_name: String,
    #[sqlx(skip)]
    pub access: AccessLevel,
}

/// One row of list_users
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct UserView {
    pub id: i64,
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub valid: bool,
}

/// Execute list_queues
pub async fn list_queues(ctx: &ToolContext<'_>) -> Result<Vec<QueueView>, ToolError> {
    let access = ctx.permissions.queue_access(ctx.principal.id).await?;
    if access.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT q.id, q.name, q.group_id, COALESCE(g.name, '') AS group_name
        FROM queue q
        LEFT JOIN permission_groups g ON q.group_id = g.id
        WHERE q.valid_id = 1 AND ",
    );
    push_queue_scope(&mut builder, "q.id", &access.keys().copied().collect());
    builder.push(" ORDER BY q.name");

    let mut queues = builder
        .build_query_as::<QueueView>()
        .fetch_all(ctx.store.pool())
        .await
        .map_err(ToolError::store("query failed"))?;

    for queue in &mut queues {
        queue.access = access.get(&queue.id).copied().unwrap_or_default();
    }
    Ok(queues)
}

/// Execute list_users
///
/// Agent identities are not scoped by queue.
pub async fn list_users(ctx: &ToolContext<'_>, input: ListUsersInput) -> Result<Vec<UserView>, ToolError> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, login, COALESCE(first_name, '') AS first_name,
            COALESCE(last_name, '') AS last_name, COALESCE(title, '') AS title,
            valid_id = 1 AS valid
        FROM users",
    );
    if input.valid {
        builder.push(" WHERE valid_id = 1");
    }
    builder
        .push(" ORDER BY login LIMIT ")
        .push_bind(clamp_limit(input.limit));

    builder
        .build_query_as::<UserView>()
        .fetch_all(ctx.store.pool())
        .await
        .map_err(ToolError::store("query failed"))
}
