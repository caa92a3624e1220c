//! Dispatcher and execute_sql tests over the JSON-RPC surface

mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::*;
use serde_json::{json, Value};
use ticketgate_core::{
    AccessLevel, Capability, PermissionResolver, PrincipalId, QueueId, SqlPermissionResolver,
};
use ticketgate_mcp::McpServer;

async fn rpc(server: &McpServer, request: Value) -> Value {
    let raw = serde_json::to_vec(&request).unwrap();
    let reply = server.handle_message(&raw).await.unwrap().unwrap();
    serde_json::from_slice(&reply).unwrap()
}

async fn tools_call(server: &McpServer, name: &str, arguments: Value) -> Value {
    rpc(
        server,
        json!({
            "jsonrpc": "2.0",
            "id": 42,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }),
    )
    .await
}

#[tokio::test]
async fn test_catalogue_is_identical_for_every_principal() {
    let desk = Desk::new().await;
    let request = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;

    let mut replies = Vec::new();
    for login in ["admin", "support", "billing", "readonly", "nobody"] {
        let server = desk.server(login).await;
        replies.push(server.handle_message(request).await.unwrap().unwrap());
    }
    assert!(replies.windows(2).all(|pair| pair[0] == pair[1]));

    let value: Value = serde_json::from_slice(&replies[0]).unwrap();
    let names: Vec<&str> = value["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "list_tickets",
            "get_ticket",
            "create_ticket",
            "update_ticket",
            "add_article",
            "list_queues",
            "list_users",
            "search_tickets",
            "get_statistics",
            "execute_sql",
        ]
    );
    assert_eq!(value["result"]["tools"][2]["inputSchema"]["required"], json!(["title", "queue_id", "body"]));
}

#[tokio::test]
async fn test_execution_failures_are_not_protocol_errors() {
    let desk = Desk::new().await;
    let billing = desk.server("billing").await;

    let reply = tools_call(&billing, "get_ticket", json!({"ticket_id": SUPPORT_TICKET})).await;
    assert_eq!(reply["id"], 42);
    assert!(reply.get("error").is_none());
    assert_eq!(reply["result"]["isError"], true);
    assert_eq!(reply["result"]["content"][0]["text"], "Error: ticket not found");

    let reply = tools_call(&billing, "get_ticket", json!({"ticket_id": BILLING_TICKET})).await;
    assert_eq!(reply["result"]["isError"], false);
    assert_eq!(reply["result"]["content"][0]["type"], "text");
}

#[tokio::test]
async fn test_missing_arguments_default_to_empty() {
    let desk = Desk::new().await;
    let support = desk.server("support").await;

    let reply = rpc(
        &support,
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "list_queues"}}),
    )
    .await;
    assert_eq!(reply["result"]["isError"], false);
}

#[tokio::test]
async fn test_calls_before_initialize_are_tolerated() {
    let desk = Desk::new().await;
    let support = desk.server("support").await;
    assert!(!support.session().is_initialized());

    let reply = tools_call(&support, "list_tickets", json!({})).await;
    assert_eq!(reply["result"]["isError"], false);
}

#[tokio::test]
async fn test_execute_sql_requires_admin() {
    let desk = Desk::new().await;

    for login in ["support", "billing", "readonly", "nobody"] {
        let server = desk.server(login).await;
        for query in ["SELECT 1", "DELETE FROM ticket", ""] {
            let err = call_err(&server, "execute_sql", json!({"query": query})).await;
            assert_eq!(err, "Error: execute_sql requires admin group membership", "{login}: {query}");
        }
    }
}

#[tokio::test]
async fn test_execute_sql_rejects_mutations_for_admin() {
    let desk = Desk::new().await;
    let admin = desk.server("admin").await;

    for query in [
        "DELETE FROM ticket",
        "  update ticket SET title = 'x'",
        "INSERT INTO users (login) VALUES ('mallory')",
        "DROP TABLE ticket",
        "PRAGMA writable_schema = 1",
    ] {
        let err = call_err(&admin, "execute_sql", json!({"query": query})).await;
        assert_eq!(err, "Error: only SELECT queries are allowed", "{query}");
    }

    let err = call_err(&admin, "execute_sql", json!({"query": "SELECT 1; DELETE FROM ticket"})).await;
    assert_eq!(err, "Error: only a single statement is allowed");

    let err = call_err(&admin, "execute_sql", json!({})).await;
    assert_eq!(err, "Error: query is required");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ticket")
        .fetch_one(desk.store.pool())
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_execute_sql_returns_rows() {
    let desk = Desk::new().await;
    let admin = desk.server("admin").await;

    let output = call_ok(
        &admin,
        "execute_sql",
        json!({"query": "select id, title, NULL AS nada, 1.5 AS ratio FROM ticket ORDER BY id;"}),
    )
    .await;
    assert_eq!(output["columns"], json!(["id", "title", "nada", "ratio"]));
    assert_eq!(output["rows_count"], 2);
    assert_eq!(
        output["rows"][0],
        json!({"id": 1, "title": "Printer on fire", "nada": null, "ratio": 1.5})
    );
}

#[tokio::test]
async fn test_execute_sql_binds_args() {
    let desk = Desk::new().await;
    let admin = desk.server("admin").await;

    let output = call_ok(
        &admin,
        "execute_sql",
        json!({"query": "SELECT login FROM users WHERE id > ? AND login <> ? ORDER BY id", "args": [2, "readonly"]}),
    )
    .await;
    assert_eq!(output["rows"], json!([{"login": "billing"}, {"login": "nobody"}]));

    let output = call_ok(
        &admin,
        "execute_sql",
        json!({"query": "SELECT id FROM ticket WHERE queue_id = 999"}),
    )
    .await;
    assert_eq!(output["columns"], json!(["id"]));
    assert_eq!(output["rows"], json!([]));
    assert_eq!(output["rows_count"], 0);
}

#[tokio::test]
async fn test_execute_sql_select_keyword_boundary() {
    let desk = Desk::new().await;
    let admin = desk.server("admin").await;

    let output = call_ok(&admin, "execute_sql", json!({"query": "SELECT(1) AS one"})).await;
    assert_eq!(output["rows"], json!([{"one": 1}]));

    let output = call_ok(&admin, "execute_sql", json!({"query": "SELECT*FROM queue ORDER BY id"})).await;
    assert_eq!(output["rows_count"], 2);

    let err = call_err(&admin, "execute_sql", json!({"query": "selection FROM ticket"})).await;
    assert_eq!(err, "Error: only SELECT queries are allowed");
}

#[tokio::test]
async fn test_execute_sql_semicolon_values_go_through_args() {
    let desk = Desk::new().await;
    let admin = desk.server("admin").await;

    let err = call_err(
        &admin,
        "execute_sql",
        json!({"query": "SELECT id FROM ticket WHERE title = 'a;b'"}),
    )
    .await;
    assert_eq!(err, "Error: only a single statement is allowed");

    let output = call_ok(
        &admin,
        "execute_sql",
        json!({"query": "SELECT id FROM ticket WHERE title = ?", "args": ["a;b"]}),
    )
    .await;
    assert_eq!(output["rows_count"], 0);
}

#[tokio::test]
async fn test_renamed_admin_group() {
    let desk = Desk::new().await;
    sqlx::query("UPDATE permission_groups SET name = 'superusers' WHERE id = 1")
        .execute(desk.store.pool())
        .await
        .unwrap();

    let admin = desk.server("admin").await;
    let err = call_err(&admin, "execute_sql", json!({"query": "SELECT 1"})).await;
    assert_eq!(err, "Error: execute_sql requires admin group membership");

    let principal = ticketgate_core::Principal::resolve_by_login(&desk.store, "admin").await.unwrap();
    let config = ticketgate_mcp::ServerConfig::default().with_admin_group("superusers");
    let server = McpServer::new(desk.store.clone(), principal, config);
    let output = call_ok(&server, "execute_sql", json!({"query": "SELECT 1 AS one"})).await;
    assert_eq!(output["rows"], json!([{"one": 1}]));
}

/// Counts resolver calls while delegating to the store
struct CountingResolver {
    inner: SqlPermissionResolver,
    calls: AtomicUsize,
}

#[async_trait]
impl PermissionResolver for CountingResolver {
    async fn queue_access(&self, principal: PrincipalId) -> ticketgate_core::Result<BTreeMap<QueueId, AccessLevel>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.queue_access(principal).await
    }

    async fn accessible_groups(&self, principal: PrincipalId) -> ticketgate_core::Result<BTreeSet<QueueId>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.accessible_groups(principal).await
    }

    async fn has_capability(
        &self,
        principal: PrincipalId,
        queue: QueueId,
        capability: Capability,
    ) -> ticketgate_core::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.has_capability(principal, queue, capability).await
    }

    async fn is_administrator(&self, principal: PrincipalId) -> ticketgate_core::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.is_administrator(principal).await
    }
}

#[tokio::test]
async fn test_permissions_are_resolved_on_every_call() {
    let desk = Desk::new().await;
    let resolver = Arc::new(CountingResolver {
        inner: SqlPermissionResolver::new(desk.store.clone()),
        calls: AtomicUsize::new(0),
    });
    let server = desk.server("support").await.with_permissions(resolver.clone());

    call_ok(&server, "list_tickets", json!({})).await;
    let after_first = resolver.calls.load(Ordering::SeqCst);
    call_ok(&server, "list_tickets", json!({})).await;

    assert!(after_first >= 1);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), after_first * 2);
}
