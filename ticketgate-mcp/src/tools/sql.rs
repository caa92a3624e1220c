//! execute_sql: read-only queries for administrators
//!
//! This operation bypasses queue scoping, so it is gated on membership in
//! the administrators group rather than on any queue capability. The query
//! text must still be a single SELECT statement, whoever sends it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, Row, Sqlite, Statement, TypeInfo, ValueRef};

use super::{non_empty, ToolContext, ToolDefinition};
use crate::error::ToolError;

pub const EXECUTE_SQL: &str = "execute_sql";

/// execute_sql tool definition
pub fn execute_sql_tool() -> ToolDefinition {
    ToolDefinition {
        name: EXECUTE_SQL.to_string(),
        description: "Run a read-only SELECT query. Only available to members of the admin group.".to_string(),
        input_schema: json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A single SELECT statement, with ? placeholders for args"
                },
                "args": {
                    "type": "array",
                    "description": "Positional values bound to the query placeholders"
                }
            }
        }),
    }
}

/// Input for execute_sql
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecuteSqlInput {
    pub query: Option<String>,
    pub args: Vec<Value>,
}

/// Output from execute_sql
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub rows_count: usize,
}

/// Check that the text is one SELECT statement
///
/// The text must open with the `SELECT` keyword, which may run straight into
/// punctuation (`SELECT*FROM t`, `SELECT(1)`). Trailing semicolons are
/// dropped; any other `;` is refused, including one inside a string literal.
/// Literal values containing `;` should be passed through `args` instead.
pub(crate) fn check_read_only(sql: &str) -> Result<&str, ToolError> {
    let sql = sql.trim();
    if !starts_with_select(sql) {
        return Err(ToolError::NotReadOnly);
    }

    let statement = sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if statement.contains(';') {
        return Err(ToolError::MultipleStatements);
    }
    Ok(statement)
}

fn starts_with_select(sql: &str) -> bool {
    let Some(head) = sql.get(..6) else {
        return false;
    };
    head.eq_ignore_ascii_case("select")
        && !sql[6..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Execute execute_sql
pub async fn execute_sql(ctx: &ToolContext<'_>, input: ExecuteSqlInput) -> Result<QueryOutput, ToolError> {
    let principal = ctx.principal;
    if !ctx.permissions.is_administrator(principal.id).await? {
        tracing::info!(principal = principal.id, "execute_sql denied");
        return Err(ToolError::AdminRequired);
    }

    let text = non_empty(input.query).ok_or(ToolError::Validation("query is required"))?;
    let sql = check_read_only(&text)?;

    tracing::info!(principal = principal.id, args = input.args.len(), "executing read-only query");

    let run = run_query(ctx, sql, &input.args);
    match tokio::time::timeout(ctx.query_timeout, run).await {
        Ok(result) => result,
        Err(_) => Err(ToolError::Timeout(ctx.query_timeout.as_secs())),
    }
}

async fn run_query(ctx: &ToolContext<'_>, sql: &str, args: &[Value]) -> Result<QueryOutput, ToolError> {
    let mut conn = ctx
        .store
        .pool()
        .acquire()
        .await
        .map_err(ToolError::store("failed to acquire connection"))?;

    let statement = (&mut *conn)
        .prepare(sql)
        .await
        .map_err(ToolError::store("query failed"))?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut query = statement.query();
    for arg in args {
        query = bind_json(query, arg);
    }

    let rows = query
        .fetch_all(&mut *conn)
        .await
        .map_err(ToolError::store("query failed"))?;

    let rows: Vec<Map<String, Value>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, name)| Ok((name.clone(), cell_to_json(row, i)?)))
                .collect::<Result<Map<_, _>, ToolError>>()
        })
        .collect::<Result<_, _>>()?;

    Ok(QueryOutput {
        columns,
        rows_count: rows.len(),
        rows,
    })
}

fn bind_json<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Map a cell by its runtime storage class
fn cell_to_json(row: &SqliteRow, index: usize) -> Result<Value, ToolError> {
    let raw = row
        .try_get_raw(index)
        .map_err(ToolError::store("failed to read column"))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => Value::from(
            row.try_get::<i64, _>(index)
                .map_err(ToolError::store("failed to decode integer"))?,
        ),
        "REAL" | "NUMERIC" => Value::from(
            row.try_get::<f64, _>(index)
                .map_err(ToolError::store("failed to decode real"))?,
        ),
        "BLOB" => {
            let bytes = row
                .try_get::<Vec<u8>, _>(index)
                .map_err(ToolError::store("failed to decode blob"))?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(
            row.try_get::<String, _>(index)
                .map_err(ToolError::store("failed to decode text"))?,
        ),
    };
    Ok(value)
}
