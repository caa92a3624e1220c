//! add_article: append a message to a ticket

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use ticketgate_core::Capability;

use super::tickets::{authorize_ticket, TicketRef};
use super::{non_empty, positive, ToolContext, ToolDefinition};
use crate::error::ToolError;

pub const ADD_ARTICLE: &str = "add_article";

const AGENT_SENDER_TYPE_ID: i64 = 1;

/// add_article tool definition
pub fn add_article_tool() -> ToolDefinition {
    ToolDefinition {
        name: ADD_ARTICLE.to_string(),
        description: "Add an article (note or reply) to a ticket. Requires the note permission on the ticket's queue.".to_string(),
        input_schema: json!({
            "type": "object",
            "required": ["ticket_id", "body"],
            "properties": {
                "ticket_id": {
                    "type": "integer",
                    "description": "Ticket to add the article to"
                },
                "body": {
                    "type": "string",
                    "description": "Article body"
                },
                "subject": {
                    "type": "string",
                    "description": "Article subject, defaults to the ticket title"
                },
                "article_type": {
                    "type": "string",
                    "enum": ["note-internal", "note-external", "email-external"],
                    "default": "note-internal",
                    "description": "Internal notes are hidden from the customer"
                }
            }
        }),
    }
}

/// Visibility class of a new article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArticleType {
    #[default]
    NoteInternal,
    NoteExternal,
    EmailExternal,
}

impl ArticleType {
    pub fn is_visible_for_customer(self) -> bool {
        match self {
            ArticleType::NoteInternal => false,
            ArticleType::NoteExternal | ArticleType::EmailExternal => true,
        }
    }
}

/// Input for add_article
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddArticleInput {
    pub ticket_id: Option<i64>,
    pub body: Option<String>,
    pub subject: Option<String>,
    pub article_type: ArticleType,
}

/// Output from add_article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddedArticle {
    pub article_id: i64,
    pub ticket_id: i64,
    pub article_type: ArticleType,
    pub message: String,
}

/// Execute add_article
pub async fn add_article(ctx: &ToolContext<'_>, input: AddArticleInput) -> Result<AddedArticle, ToolError> {
    let (Some(ticket_id), Some(body)) = (positive(input.ticket_id), non_empty(input.body)) else {
        return Err(ToolError::Validation("ticket_id and body are required"));
    };

    let ticket = authorize_ticket(ctx, &TicketRef::Id(ticket_id), Capability::AddNote).await?;

    let principal = ctx.principal;
    let subject = non_empty(input.subject).unwrap_or(ticket.title);
    let now = Utc::now();

    let mut tx = ctx
        .store
        .pool()
        .begin()
        .await
        .map_err(ToolError::store("failed to begin transaction"))?;

    let article_id = sqlx::query(
        "INSERT INTO article (ticket_id, article_sender_type_id, communication_channel_id,
            is_visible_for_customer, create_time, create_by, change_time, change_by)
         VALUES (?, ?, 1, ?, ?, ?, ?, ?)",
    )
    .bind(ticket.id)
    .bind(AGENT_SENDER_TYPE_ID)
    .bind(input.article_type.is_visible_for_customer())
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
    .bind(subject)
    .bind(body)
    .bind(now.timestamp())
    .bind(now)
    .bind(principal.id)
    .bind(now)
    .bind(principal.id)
    .execute(&mut *tx)
    .await
    .map_err(ToolError::store("failed to store article body"))?;

    sqlx::query("UPDATE ticket SET change_time = ?, change_by = ? WHERE id = ?")
        .bind(now)
        .bind(principal.id)
        .bind(ticket.id)
        .execute(&mut *tx)
        .await
        .map_err(ToolError::store("failed to touch ticket"))?;

    tx.commit()
        .await
        .map_err(ToolError::store("failed to commit article"))?;

    tracing::info!(principal = principal.id, ticket = ticket.id, article = article_id, "article added");

    Ok(AddedArticle {
        article_id,
        ticket_id: ticket.id,
        article_type: input.article_type,
        message: "Article added successfully".to_string(),
    })
}
