//! Decision events for permission and record access checks.
//!
//! Every check emits one [`DecisionEvent`] to an [`AuditSink`]. Sinks are
//! trait objects so the backend (log pipeline, message bus, database) can be
//! swapped without touching the checkers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::context::SecurityContext;
use crate::scope::Scope;

/// Outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Which checker produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Permission,
    Record,
}

/// Structured audit record for a single decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionEvent {
    pub kind: CheckKind,
    pub user_id: String,
    pub role: Option<String>,
    pub module: String,
    /// Normalized action the decision was made on.
    pub action: String,
    /// Action name as requested.
    pub requested_action: String,
    pub decision: Decision,
    pub scope: Scope,
    pub degraded: bool,
    pub timestamp: DateTime<Utc>,
}

impl DecisionEvent {
    #[must_use]
    pub fn new(
        kind: CheckKind,
        ctx: &SecurityContext,
        module: &str,
        action: &str,
        requested_action: &str,
        decision: Decision,
    ) -> Self {
        Self {
            kind,
            user_id: ctx.user_id().to_owned(),
            role: ctx.primary_role_name().map(str::to_owned),
            module: module.to_owned(),
            action: action.to_owned(),
            requested_action: requested_action.to_owned(),
            decision,
            scope: ctx.scope(),
            degraded: ctx.is_degraded(),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for decision events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &DecisionEvent);
}

pub type AuditSinkRef = Arc<dyn AuditSink>;

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &DecisionEvent) {}
}

/// Writes events through `tracing` at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &DecisionEvent) {
        tracing::info!(
            audit = true,
            kind = ?event.kind,
            user_id = %event.user_id,
            role = event.role.as_deref().unwrap_or("-"),
            module = %event.module,
            action = %event.action,
            requested_action = %event.requested_action,
            decision = event.decision.as_str(),
            scope = %event.scope,
            degraded = event.degraded,
            timestamp = %event.timestamp.to_rfc3339(),
            "access decision"
        );
    }
}

/// Keeps events in memory. Useful for tests and for embedding applications
/// that forward events in batches.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<DecisionEvent>>,
}

impl InMemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Remove and return all collected events.
    #[must_use]
    pub fn drain(&self) -> Vec<DecisionEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: &DecisionEvent) {
        self.events.lock().push(event.clone());
    }
}
