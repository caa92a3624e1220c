//! MCP Server protocol implementation
//!
//! This module handles the MCP JSON-RPC protocol over stdio. Every
//! `tools/call` runs as the session principal; capability checks happen
//! inside the tools, against the store, on every call.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use ticketgate_core::{PermissionResolver, Principal, SqlPermissionResolver, Store};

use crate::config::ServerConfig;
use crate::error::{McpError, McpResult};
use crate::protocol::{
    Implementation, InitializeParams, InitializeResult, Request, Response, ServerCapabilities,
    ToolCallParams, JSONRPC_VERSION, PROTOCOL_VERSION,
};
use crate::session::Session;
use crate::tools::{self, Invocation, ToolContext, ToolResult};
use crate::{SERVER_NAME, SERVER_VERSION};

/// MCP server bound to one principal
pub struct McpServer {
    store: Store,
    permissions: Arc<dyn PermissionResolver>,
    session: Session,
    config: ServerConfig,
}

impl McpServer {
    /// Create a server for `principal`, resolving permissions from the store
    pub fn new(store: Store, principal: Principal, config: ServerConfig) -> Self {
        let permissions =
            SqlPermissionResolver::new(store.clone()).with_admin_group(config.admin_group.clone());
        Self {
            store,
            permissions: Arc::new(permissions),
            session: Session::new(principal),
            config,
        }
    }

    /// Replace the permission resolver
    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionResolver>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the MCP server over stdio
    pub async fn run_stdio(&self) -> McpResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match self.handle_message(line.as_bytes()).await {
                Ok(Some(mut reply)) => {
                    reply.push(b'\n');
                    stdout.write_all(&reply).await?;
                    stdout.flush().await?;
                }
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "failed to encode reply"),
            }
        }

        tracing::info!(
            session = ?self.session.summary(),
            duration_ms = self.session.duration_ms(),
            "stdin closed, session ending"
        );
        Ok(())
    }

    /// Handle one raw message, returning the encoded reply if one is due
    pub async fn handle_message(&self, raw: &[u8]) -> McpResult<Option<Vec<u8>>> {
        let response = match Request::from_slice(raw) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable message");
                Some(Response::failure(None, &e))
            }
        };

        match response {
            Some(response) => Ok(Some(serde_json::to_vec(&response)?)),
            None => Ok(None),
        }
    }

    /// Handle a decoded request; `None` means no reply is sent
    pub async fn handle_request(&self, request: Request) -> Option<Response> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(Response::failure(request.id, &McpError::UnsupportedVersion));
        }
        if request.method.is_empty() {
            let err = McpError::InvalidRequest("missing method".to_string());
            return Some(Response::failure(request.id, &err));
        }

        tracing::debug!(method = %request.method, "dispatching request");

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request),
            "initialized" | "notifications/initialized" => {
                self.session.mark_initialized();
                tracing::debug!(session = self.session.session_id(), "client initialized");
                return None;
            }
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(&request).await,
            "ping" => Ok(json!({})),
            other => Err(McpError::MethodNotFound(other.to_string())),
        };

        Some(match result {
            Ok(value) => Response::success(request.id, value),
            Err(e) => Response::failure(request.id, &e),
        })
    }

    fn handle_initialize(&self, request: &Request) -> McpResult<Value> {
        let params: InitializeParams = match request.params {
            Some(_) => request.params_as()?,
            None => InitializeParams::default(),
        };

        tracing::info!(
            session = self.session.session_id(),
            login = %self.session.principal().login,
            client = ?params.client_info,
            requested = ?params.protocol_version,
            "initialize"
        );
        self.session.record_client(params.client_info);

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities::default(),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_tools_list(&self) -> Value {
        json!({ "tools": tools::catalogue() })
    }

    async fn handle_tools_call(&self, request: &Request) -> McpResult<Value> {
        let params: ToolCallParams = request.params_as()?;
        let result = self
            .call_tool(&params.name, params.arguments.unwrap_or_default())
            .await;
        Ok(serde_json::to_value(result)?)
    }

    /// Run a named operation as the session principal
    ///
    /// Execution failures never escape as protocol errors; they come back
    /// as a result with `isError` set.
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        let principal = self.session.principal();
        let ctx = ToolContext {
            store: &self.store,
            permissions: self.permissions.as_ref(),
            principal,
            query_timeout: self.config.query_timeout(),
        };

        let outcome = match Invocation::parse(name, arguments) {
            Ok(invocation) => {
                tracing::debug!(tool = invocation.name(), principal = principal.id, "tool call");
                invocation.execute(&ctx).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(text) => ToolResult::text(text),
            Err(e) => {
                if e.is_store_failure() {
                    tracing::warn!(tool = name, principal = principal.id, error = %e, "tool failed");
                } else {
                    tracing::debug!(tool = name, principal = principal.id, error = %e, "tool rejected");
                }
                ToolResult::error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketgate_core::StoreConfig;

    async fn server() -> (McpServer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("unit.db").display());
        let store = Store::connect(&StoreConfig::new(url).with_create_if_missing(true))
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();

        let server = McpServer::new(store, Principal::new(1, "nobody", ""), ServerConfig::default());
        (server, dir)
    }

    async fn reply(server: &McpServer, raw: &str) -> Value {
        let bytes = server.handle_message(raw.as_bytes()).await.unwrap().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let (server, _dir) = server().await;
        let value = reply(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"probe","version":"0.1"}}}"#,
        )
        .await;

        assert_eq!(value["id"], 1);
        assert_eq!(value["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(value["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(server.session().client_info().unwrap().name, "probe");
    }

    #[tokio::test]
    async fn test_initialized_has_no_reply() {
        let (server, _dir) = server().await;
        for method in ["initialized", "notifications/initialized"] {
            let raw = format!(r#"{{"jsonrpc":"2.0","method":"{method}"}}"#);
            assert!(server.handle_message(raw.as_bytes()).await.unwrap().is_none());
        }
        assert!(server.session().is_initialized());
    }

    #[tokio::test]
    async fn test_ping() {
        let (server, _dir) = server().await;
        let value = reply(&server, r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).await;
        assert_eq!(value["id"], "p");
        assert_eq!(value["result"], json!({}));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (server, _dir) = server().await;

        let value = reply(&server, "{not json").await;
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["id"], Value::Null);

        let value = reply(&server, r#"{"jsonrpc":"1.0","id":2,"method":"ping"}"#).await;
        assert_eq!(value["error"]["code"], -32600);
        assert_eq!(value["id"], 2);

        let value = reply(&server, r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#).await;
        assert_eq!(value["error"]["code"], -32601);

        let value = reply(&server, r#"{"jsonrpc":"2.0","id":4,"method":"tools/call"}"#).await;
        assert_eq!(value["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_execution_failure() {
        let (server, _dir) = server().await;
        let value = reply(
            &server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"drop_everything","arguments":{}}}"#,
        )
        .await;

        assert!(value.get("error").is_none());
        assert_eq!(value["result"]["isError"], true);
        assert_eq!(
            value["result"]["content"][0]["text"],
            "Error: unknown operation: drop_everything"
        );
    }
}
