//! MCP JSON-RPC envelopes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::McpError;

/// Protocol-version tag every request must carry
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision this server speaks
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP JSON-RPC request
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// Decode raw bytes into a request
    pub fn from_slice(raw: &[u8]) -> Result<Self, McpError> {
        serde_json::from_slice(raw).map_err(|e| McpError::Parse(e.to_string()))
    }

    /// Decode the params member into a typed value
    pub fn params_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, McpError> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))
    }
}

/// MCP JSON-RPC response
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: &McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(error.to_rpc_error()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Client or server name and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<Implementation>,
    #[serde(default)]
    pub capabilities: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: &'static str,
    pub server_info: Implementation,
    pub capabilities: ServerCapabilities,
}

/// Declared server capabilities: tool invocation only
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

/// Parameters of `tools/call`
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req = Request::from_slice(br#"{"jsonrpc":"2.0","method":"ping"}"#).unwrap();
        assert_eq!(req.jsonrpc, "2.0");
        assert!(req.id.is_none());
        assert!(req.params.is_none());
    }

    #[test]
    fn test_missing_version_still_parses() {
        let req = Request::from_slice(br#"{"id":1,"method":"ping"}"#).unwrap();
        assert_eq!(req.jsonrpc, "");
    }

    #[test]
    fn test_non_object_is_parse_error() {
        let err = Request::from_slice(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, McpError::Parse(_)));
    }

    #[test]
    fn test_failure_serializes_null_id() {
        let resp = Response::failure(None, &McpError::Parse("eof".into()));
        let value = serde_json::to_value(&resp).unwrap();

        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], -32700);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_tool_call_arguments_must_be_an_object() {
        let req = Request::from_slice(
            br#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"x","arguments":[1]}}"#,
        )
        .unwrap();
        let err = req.params_as::<ToolCallParams>().unwrap_err();
        assert_eq!(err.error_code(), -32602);
    }

    #[test]
    fn test_capabilities_shape() {
        let caps = serde_json::to_value(ServerCapabilities::default()).unwrap();
        assert_eq!(caps, json!({"tools": {"listChanged": false}}));
    }
}
