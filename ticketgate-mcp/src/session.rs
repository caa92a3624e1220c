//! Session state for one MCP connection

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use ticketgate_core::Principal;
use uuid::Uuid;

use crate::protocol::Implementation;

/// One connection's session
///
/// The principal is fixed when the session is created. The only state that
/// changes afterwards is the initialized flag and the recorded client info.
#[derive(Debug)]
pub struct Session {
    session_id: String,
    principal: Principal,
    started_at: DateTime<Utc>,
    initialized: AtomicBool,
    client: RwLock<Option<Implementation>>,
}

impl Session {
    /// Create a new session acting as `principal`
    pub fn new(principal: Principal) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            principal,
            started_at: Utc::now(),
            initialized: AtomicBool::new(false),
            client: RwLock::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Record the client that sent `initialize`
    pub fn record_client(&self, client: Option<Implementation>) {
        if let Ok(mut slot) = self.client.write() {
            *slot = client;
        }
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.client.read().ok().and_then(|c| c.clone())
    }

    /// Record the client's `initialized` acknowledgment
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Get session duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    /// Snapshot of the session for the shutdown log
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            login: self.principal.login.clone(),
            started_at: self.started_at,
            initialized: self.is_initialized(),
            client: self.client_info(),
        }
    }
}

/// Serializable snapshot of a session, for logs and diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub login: String,
    pub started_at: DateTime<Utc>,
    pub initialized: bool,
    pub client: Option<Implementation>,
}
