//! Authenticated caller identity

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{CoreError, Result};
use crate::store::Store;

/// Identifier of a user row
pub type PrincipalId = i64;

/// The human identity every operation in a session acts as
///
/// Resolved once when the session is established and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Principal {
    pub id: PrincipalId,
    pub login: String,
    pub display_name: String,
}

impl Principal {
    pub fn new(id: PrincipalId, login: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            display_name: display_name.into(),
        }
    }

    /// Look up a valid user by login
    pub async fn resolve_by_login(store: &Store, login: &str) -> Result<Self> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT id, login,
                TRIM(COALESCE(first_name, '') || ' ' || COALESCE(last_name, '')) AS display_name
             FROM users
             WHERE login = ? AND valid_id = 1",
        )
        .bind(login)
        .fetch_optional(store.pool())
        .await
        .map_err(CoreError::store("failed to resolve principal"))?;

        principal.ok_or_else(|| CoreError::UnknownPrincipal {
            login: login.to_string(),
        })
    }
}
