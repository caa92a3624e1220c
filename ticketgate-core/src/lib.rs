//! # Ticketgate Core
//!
//! The authorization model behind the Ticketgate MCP proxy:
//!
//! - **Principal**: the human identity a session acts as
//! - **Capability**: a level (`read`, `read-write`) or action right
//!   (`create`, `add-note`, `move-into`, `change-priority`, `become-owner`)
//!   scoped to a queue
//! - **PermissionResolver**: answers capability questions against the
//!   grant tables, fresh on every call
//! - **Store**: the pooled relational store shared by all sessions
//!
//! ## Example
//!
//! ```rust,ignore
//! use ticketgate_core::{Capability, PermissionResolver, Principal, SqlPermissionResolver, Store, StoreConfig};
//!
//! let store = Store::connect(&StoreConfig::new("sqlite://desk.db")).await?;
//! let principal = Principal::resolve_by_login(&store, "agent.smith").await?;
//! let resolver = SqlPermissionResolver::new(store.clone());
//!
//! let queues = resolver.accessible_groups(principal.id).await?;
//! let can_create = resolver.has_capability(principal.id, 7, Capability::Create).await?;
//! ```

pub mod capability;
pub mod error;
pub mod permission;
pub mod principal;
pub mod store;

pub use capability::{AccessLevel, Capability};
pub use error::{CoreError, ErrorCategory, Result};
pub use permission::{PermissionResolver, QueueId, SqlPermissionResolver, DEFAULT_ADMIN_GROUP};
pub use principal::{Principal, PrincipalId};
pub use store::{Store, StoreConfig};
