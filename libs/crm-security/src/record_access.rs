use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::audit::{AuditSinkRef, CheckKind, Decision, DecisionEvent, NoopAuditSink};
use crate::context::SecurityContext;
use crate::scope::Scope;

/// Ownership attributes of a single record, as read by the module handler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OwnershipDescriptor {
    pub owner_id: String,
    pub team_id: Option<String>,
    pub country_code: Option<String>,
}

impl OwnershipDescriptor {
    #[must_use]
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            team_id: None,
            country_code: None,
        }
    }

    #[must_use]
    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    #[must_use]
    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

fn is_owner(ctx: &SecurityContext, record: &OwnershipDescriptor) -> bool {
    !record.owner_id.is_empty() && record.owner_id == ctx.user_id()
}

/// Decide whether `ctx` may operate on a record with the given ownership.
///
/// | scope | rule |
/// |-------|------|
/// | all | always |
/// | country | record country equals the context country; a record without a country is denied |
/// | team | record team equals the context team, or the subject owns the record |
/// | own | the subject owns the record |
///
/// Blank identifiers never match.
#[must_use]
pub fn check_record_access(ctx: &SecurityContext, record: &OwnershipDescriptor) -> bool {
    match ctx.scope() {
        Scope::All => true,
        Scope::Country => non_blank(record.country_code.as_deref())
            .is_some_and(|country| country == ctx.country_code()),
        Scope::Team => {
            let same_team = matches!(
                (non_blank(record.team_id.as_deref()), ctx.team_id()),
                (Some(record_team), Some(ctx_team)) if record_team == ctx_team
            );
            same_team || is_owner(ctx, record)
        }
        Scope::Own => is_owner(ctx, record),
    }
}

/// Audited wrapper around [`check_record_access`] for single-record operations.
#[derive(Clone)]
pub struct RecordAccessChecker {
    audit: AuditSinkRef,
}

impl Default for RecordAccessChecker {
    fn default() -> Self {
        Self::new(Arc::new(NoopAuditSink))
    }
}

impl RecordAccessChecker {
    #[must_use]
    pub fn new(audit: AuditSinkRef) -> Self {
        Self { audit }
    }

    #[must_use]
    pub fn check(
        &self,
        ctx: &SecurityContext,
        module: &str,
        action: &str,
        record: &OwnershipDescriptor,
    ) -> bool {
        let allowed = check_record_access(ctx, record);
        let normalized = Action::normalize(action);
        let decision = Decision::from(allowed);

        if allowed {
            tracing::debug!(
                user_id = ctx.user_id(),
                module,
                action,
                scope = %ctx.scope(),
                "record access granted"
            );
        } else {
            tracing::warn!(
                user_id = ctx.user_id(),
                module,
                action,
                scope = %ctx.scope(),
                owner_id = %record.owner_id,
                "record access denied"
            );
        }

        self.audit.record(&DecisionEvent::new(
            CheckKind::Record,
            ctx,
            module,
            normalized.as_str(),
            action,
            decision,
        ));
        allowed
    }
}
