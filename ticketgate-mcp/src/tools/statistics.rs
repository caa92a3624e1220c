//! get_statistics: ticket counts over the accessible queues

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite};
use ticketgate_core::QueueId;

use super::{accessible_queues, push_queue_scope, ToolContext, ToolDefinition};
use crate::error::ToolError;

pub const GET_STATISTICS: &str = "get_statistics";

/// get_statistics tool definition
pub fn get_statistics_tool() -> ToolDefinition {
    ToolDefinition {
        name: GET_STATISTICS.to_string(),
        description: "Ticket counts by state and by queue for the queues you can read, plus the number of valid users.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Output from get_statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub tickets_by_state: BTreeMap<String, i64>,
    pub tickets_by_queue: BTreeMap<String, i64>,
    pub total_tickets: i64,
    pub total_users: i64,
}

/// Execute get_statistics
pub async fn get_statistics(ctx: &ToolContext<'_>) -> Result<Statistics, ToolError> {
    let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE valid_id = 1")
        .fetch_one(ctx.store.pool())
        .await
        .map_err(ToolError::store("user count failed"))?;

    let queues = accessible_queues(ctx).await?;
    if queues.is_empty() {
        return Ok(Statistics {
            total_users,
            ..Statistics::default()
        });
    }

    let tickets_by_state = grouped_counts(
        ctx,
        "SELECT ts.name, COUNT(*) FROM ticket t
        JOIN ticket_state ts ON t.ticket_state_id = ts.id
        WHERE ",
        " GROUP BY ts.name",
        &queues,
    )
    .await?;

    let tickets_by_queue = grouped_counts(
        ctx,
        "SELECT q.name, COUNT(*) FROM ticket t
        JOIN queue q ON t.queue_id = q.id
        WHERE ",
        " GROUP BY q.name",
        &queues,
    )
    .await?;

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ticket t WHERE ");
    push_queue_scope(&mut builder, "t.queue_id", &queues);
    let total_tickets = builder
        .build_query_scalar::<i64>()
        .fetch_one(ctx.store.pool())
        .await
        .map_err(ToolError::store("ticket count failed"))?;

    Ok(Statistics {
        tickets_by_state,
        tickets_by_queue,
        total_tickets,
        total_users,
    })
}

async fn grouped_counts(
    ctx: &ToolContext<'_>,
    select: &str,
    group_by: &str,
    queues: &BTreeSet<QueueId>,
) -> Result<BTreeMap<String, i64>, ToolError> {
    let mut builder = QueryBuilder::<Sqlite>::new(select);
    push_queue_scope(&mut builder, "t.queue_id", queues);
    builder.push(group_by);

    let rows: Vec<(String, i64)> = builder
        .build_query_as()
        .fetch_all(ctx.store.pool())
        .await
        .map_err(ToolError::store("statistics query failed"))?;

    Ok(rows.into_iter().collect())
}
