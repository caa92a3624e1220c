//! Permission resolution
//!
//! Answers capability questions for a principal against a queue. Every
//! call reads the grant tables afresh: grants may be revoked between two
//! calls of the same session, so nothing here is cached.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::capability::{AccessLevel, Capability};
use crate::error::{CoreError, Result};
use crate::principal::PrincipalId;
use crate::store::Store;

/// Identifier of a queue (resource group)
pub type QueueId = i64;

/// Name of the permission group whose members are administrators
pub const DEFAULT_ADMIN_GROUP: &str = "admin";

/// Capability questions consumed by operation executors
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// Access level per queue, omitting queues with no read access
    async fn queue_access(&self, principal: PrincipalId) -> Result<BTreeMap<QueueId, AccessLevel>>;

    /// Queues on which the principal holds at least `read`
    async fn accessible_groups(&self, principal: PrincipalId) -> Result<BTreeSet<QueueId>> {
        Ok(self.queue_access(principal).await?.into_keys().collect())
    }

    /// Check a single capability on a queue
    async fn has_capability(
        &self,
        principal: PrincipalId,
        queue: QueueId,
        capability: Capability,
    ) -> Result<bool>;

    /// Check membership in the administrators group
    async fn is_administrator(&self, principal: PrincipalId) -> Result<bool>;
}

/// Resolver backed by the `group_user` grant table
#[derive(Debug, Clone)]
pub struct SqlPermissionResolver {
    store: Store,
    admin_group: String,
}

impl SqlPermissionResolver {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            admin_group: DEFAULT_ADMIN_GROUP.to_string(),
        }
    }

    /// Use a different permission group as the administrators group
    pub fn with_admin_group(mut self, name: impl Into<String>) -> Self {
        self.admin_group = name.into();
        self
    }

    pub fn admin_group(&self) -> &str {
        &self.admin_group
    }
}

#[async_trait]
impl PermissionResolver for SqlPermissionResolver {
    async fn queue_access(&self, principal: PrincipalId) -> Result<BTreeMap<QueueId, AccessLevel>> {
        let rows: Vec<(QueueId, String)> = sqlx::query_as(
            "SELECT q.id, gu.permission_key
             FROM queue q
             JOIN group_user gu ON gu.group_id = q.group_id
             WHERE gu.user_id = ?
               AND q.valid_id = 1
             ORDER BY q.id",
        )
        .bind(principal)
        .fetch_all(self.store.pool())
        .await
        .map_err(CoreError::store("failed to get queue permissions"))?;

        let mut keys: BTreeMap<QueueId, Vec<String>> = BTreeMap::new();
        for (queue_id, key) in rows {
            keys.entry(queue_id).or_default().push(key);
        }

        let access = keys
            .into_iter()
            .map(|(queue_id, keys)| (queue_id, AccessLevel::from_keys(keys.iter().map(String::as_str))))
            .filter(|(_, level)| *level >= AccessLevel::Read)
            .collect();

        Ok(access)
    }

    async fn has_capability(
        &self,
        principal: PrincipalId,
        queue: QueueId,
        capability: Capability,
    ) -> Result<bool> {
        let keys = capability.permission_keys();
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT EXISTS(
                SELECT 1 FROM group_user gu
                JOIN queue q ON gu.group_id = q.group_id
                WHERE q.id = ?
                  AND gu.user_id = ?
                  AND gu.permission_key IN ({placeholders})
            )"
        );

        let mut query = sqlx::query_scalar::<_, bool>(&sql).bind(queue).bind(principal);
        for key in keys {
            query = query.bind(*key);
        }

        let granted = query
            .fetch_one(self.store.pool())
            .await
            .map_err(CoreError::store("failed to check permission"))?;

        tracing::trace!(principal, queue, %capability, granted, "capability check");
        Ok(granted)
    }

    async fn is_administrator(&self, principal: PrincipalId) -> Result<bool> {
        let member = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM group_user gu
                JOIN permission_groups g ON gu.group_id = g.id
                WHERE gu.user_id = ?
                  AND g.name = ?
            )",
        )
        .bind(principal)
        .bind(self.admin_group.as_str())
        .fetch_one(self.store.pool())
        .await
        .map_err(CoreError::store("failed to check group membership"))?;

        Ok(member)
    }
}
