//! Error types for the Ticketgate MCP Server
//!
//! Failures travel on two separate channels:
//!
//! - [`McpError`] is a protocol-level failure. It becomes the `error`
//!   member of the reply envelope and no business logic has run.
//! - [`ToolError`] is an execution-level failure. It is folded into a
//!   successful `tools/call` result with `isError: true`.

use thiserror::Error;
use ticketgate_core::{CoreError, ErrorCategory};

/// Result type for protocol operations
pub type McpResult<T> = Result<T, McpError>;

/// JSON-RPC error codes
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Protocol-level errors
#[derive(Error, Debug)]
pub enum McpError {
    /// The envelope is not valid JSON or not a request object
    #[error("Parse error: {0}")]
    Parse(String),

    /// The protocol-version tag is missing or unsupported
    #[error("Invalid JSON-RPC version")]
    UnsupportedVersion,

    /// The envelope is well-formed JSON but not a usable request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No handler for the method
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Method parameters have the wrong shape
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// I/O error on the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Get error code for the JSON-RPC error object
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Parse(_) => codes::PARSE_ERROR,
            McpError::UnsupportedVersion | McpError::InvalidRequest(_) => codes::INVALID_REQUEST,
            McpError::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => codes::INVALID_PARAMS,
            McpError::Io(_) | McpError::Serialization(_) | McpError::Internal(_) => {
                codes::INTERNAL_ERROR
            }
        }
    }

    /// Build the `error` member of a reply envelope
    pub fn to_rpc_error(&self) -> crate::protocol::RpcError {
        crate::protocol::RpcError {
            code: self.error_code(),
            message: self.to_string(),
        }
    }
}

/// Execution-level failures returned by operation executors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Arguments do not match the operation's declared types
    #[error("invalid arguments for {operation}: {detail}")]
    InvalidArguments {
        operation: &'static str,
        detail: String,
    },

    /// A required argument is missing or an argument is out of range
    #[error("{0}")]
    Validation(&'static str),

    /// Absent ticket, or a ticket the principal may not see
    #[error("ticket not found")]
    TicketNotFound,

    /// The target of the action has no identity to hide
    #[error("{0}")]
    PermissionDenied(&'static str),

    #[error("execute_sql requires admin group membership")]
    AdminRequired,

    #[error("only SELECT queries are allowed")]
    NotReadOnly,

    #[error("only a single statement is allowed")]
    MultipleStatements,

    #[error("query timed out after {0}s")]
    Timeout(u64),

    /// Store failure from the core crate (permission lookups)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Store failure while executing an operation
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    /// Wrap a store error with a short description of what was attempted
    pub fn store(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| ToolError::Store { context, source }
    }

    /// True when the failure came from the store rather than the caller
    pub fn is_store_failure(&self) -> bool {
        match self {
            ToolError::Core(e) => e.category() == ErrorCategory::Store,
            ToolError::Store { .. } | ToolError::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_codes() {
        assert_eq!(McpError::Parse("eof".into()).error_code(), -32700);
        assert_eq!(McpError::UnsupportedVersion.error_code(), -32600);
        assert_eq!(McpError::InvalidRequest("x".into()).error_code(), -32600);
        assert_eq!(McpError::MethodNotFound("x".into()).error_code(), -32601);
        assert_eq!(McpError::InvalidParams("x".into()).error_code(), -32602);
        assert_eq!(McpError::Internal("x".into()).error_code(), -32603);
    }

    #[test]
    fn test_rpc_error_carries_message() {
        let err = McpError::MethodNotFound("resources/list".into()).to_rpc_error();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found: resources/list");
    }

    #[test]
    fn test_not_found_wording() {
        assert_eq!(ToolError::TicketNotFound.to_string(), "ticket not found");
        assert_eq!(
            ToolError::UnknownOperation("drop_all".into()).to_string(),
            "unknown operation: drop_all"
        );
    }

    #[test]
    fn test_store_failures_are_flagged() {
        assert!(ToolError::store("query failed")(sqlx::Error::RowNotFound).is_store_failure());
        assert!(ToolError::Timeout(30).is_store_failure());
        assert!(!ToolError::TicketNotFound.is_store_failure());

        let lookup = ToolError::from(CoreError::store("permission lookup failed")(sqlx::Error::RowNotFound));
        assert!(lookup.is_store_failure());
        let unknown = ToolError::from(CoreError::UnknownPrincipal { login: "ghost".into() });
        assert!(!unknown.is_store_failure());
    }
}
