//! Error types for Ticketgate core operations
//!
//! Store failures keep the underlying [`sqlx::Error`] as their source so
//! callers can log the detail while surfacing a generic message upstream.
//!
//! # Example
//!
//! ```rust
//! use ticketgate_core::error::{CoreError, ErrorCategory};
//!
//! let err = CoreError::UnknownPrincipal { login: "ghost".to_string() };
//! assert_eq!(err.category(), ErrorCategory::NotFound);
//! assert_eq!(err.error_code(), "UNKNOWN_PRINCIPAL");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Referenced entity does not exist
    NotFound,
    /// Input or configuration is invalid
    Validation,
    /// The relational store failed
    Store,
}

/// Errors that can occur in core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// No valid user carries the given login
    #[error("Unknown principal: '{login}'. The login must belong to a valid user.")]
    UnknownPrincipal { login: String },

    /// Store configuration could not be applied
    #[error("Invalid store configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A store query failed
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl CoreError {
    /// Wrap a store error with a short description of what was attempted
    pub fn store(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| CoreError::Store { context, source }
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::UnknownPrincipal { .. } => ErrorCategory::NotFound,
            CoreError::InvalidConfig { .. } => ErrorCategory::Validation,
            CoreError::Store { .. } => ErrorCategory::Store,
        }
    }

    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::UnknownPrincipal { .. } => "UNKNOWN_PRINCIPAL",
            CoreError::InvalidConfig { .. } => "INVALID_CONFIG",
            CoreError::Store { .. } => "STORE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_context() {
        let err = CoreError::store("failed to check permission")(sqlx::Error::RowNotFound);

        assert_eq!(err.category(), ErrorCategory::Store);
        assert!(err.to_string().starts_with("failed to check permission: "));
        assert!(std::error::Error::source(&err).is_some());
    }
}
