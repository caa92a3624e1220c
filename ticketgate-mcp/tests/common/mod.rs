//! Shared fixture: a temporary help desk with two queues and five agents

#![allow(dead_code)]

use serde_json::{Map, Value};
use ticketgate_core::{Principal, Store, StoreConfig};
use ticketgate_mcp::{McpServer, ServerConfig, ToolResult};

pub const SUPPORT_QUEUE: i64 = 100;
pub const BILLING_QUEUE: i64 = 200;

pub const SUPPORT_TICKET: i64 = 1;
pub const BILLING_TICKET: i64 = 2;

pub struct Desk {
    _dir: tempfile::TempDir,
    pub store: Store,
}

impl Desk {
    pub async fn new() -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("desk.db").display());
        let store = Store::connect(&StoreConfig::new(url).with_create_if_missing(true))
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();

        let seed = [
            "INSERT INTO permission_groups (id, name) VALUES (1, 'admin'), (10, 'support'), (20, 'billing')",
            "INSERT INTO queue (id, name, group_id) VALUES (100, 'Support', 10), (200, 'Billing', 20)",
            "INSERT INTO users (id, login, first_name, last_name) VALUES
                (1, 'admin', 'Ada', 'Admin'),
                (2, 'support', 'Sam', 'Support'),
                (3, 'billing', 'Bill', 'Billing'),
                (4, 'readonly', 'Rita', 'Reader'),
                (5, 'nobody', 'Ned', 'Nobody')",
            "INSERT INTO group_user (user_id, group_id, permission_key) VALUES
                (1, 1, 'rw'), (1, 10, 'rw'), (1, 20, 'rw'),
                (2, 10, 'rw'),
                (3, 20, 'rw'),
                (4, 10, 'ro')",
            "INSERT INTO ticket (id, tn, title, queue_id, ticket_state_id, ticket_priority_id,
                customer_id, customer_user_id, user_id, create_time, create_by, change_time, change_by)
             VALUES
                (1, '2024010110000001', 'Printer on fire', 100, 4, 3, 'ACME', 'wile', 2,
                 '2024-01-01 10:00:00', 2, '2024-01-01 10:00:00', 2),
                (2, '2024010110000002', 'Invoice 50% off', 200, 1, 3, 'ACME', 'wile', 3,
                 '2024-01-01 11:00:00', 3, '2024-01-01 11:00:00', 3)",
            "INSERT INTO article (id, ticket_id, article_sender_type_id, is_visible_for_customer,
                create_time, create_by, change_time, change_by)
             VALUES
                (1, 1, 3, 1, '2024-01-01 10:00:00', 2, '2024-01-01 10:00:00', 2),
                (2, 2, 3, 1, '2024-01-01 11:00:00', 3, '2024-01-01 11:00:00', 3)",
            "INSERT INTO article_data_mime (article_id, a_from, a_subject, a_body, incoming_time,
                create_time, create_by, change_time, change_by)
             VALUES
                (1, 'wile@acme.test', 'Printer on fire', 'Smoke everywhere', 1704103200,
                 '2024-01-01 10:00:00', 2, '2024-01-01 10:00:00', 2),
                (2, 'wile@acme.test', 'Invoice 50% off', 'Where is my discount', 1704106800,
                 '2024-01-01 11:00:00', 3, '2024-01-01 11:00:00', 3)",
        ];
        for sql in seed {
            sqlx::query(sql).execute(store.pool()).await.unwrap();
        }

        Self { _dir: dir, store }
    }

    /// Server acting as the given login
    pub async fn server(&self, login: &str) -> McpServer {
        let principal = Principal::resolve_by_login(&self.store, login).await.unwrap();
        McpServer::new(self.store.clone(), principal, ServerConfig::default())
    }
}

pub fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("arguments must be an object, got {other}"),
    }
}

/// Call a tool and return its result
pub async fn call(server: &McpServer, name: &str, arguments: Value) -> ToolResult {
    server.call_tool(name, args(arguments)).await
}

/// Call a tool that must succeed and decode its JSON payload
pub async fn call_ok(server: &McpServer, name: &str, arguments: Value) -> Value {
    let result = call(server, name, arguments).await;
    let text = result.first_text().unwrap().to_string();
    assert!(!result.is_error, "{name} failed: {text}");
    serde_json::from_str(&text).unwrap()
}

/// Call a tool that must fail and return its message
pub async fn call_err(server: &McpServer, name: &str, arguments: Value) -> String {
    let result = call(server, name, arguments).await;
    assert!(result.is_error, "{name} unexpectedly succeeded");
    result.first_text().unwrap().to_string()
}
