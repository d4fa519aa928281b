use std::sync::Arc;

use crate::action::Action;
use crate::audit::{AuditSinkRef, CheckKind, Decision, DecisionEvent, NoopAuditSink};
use crate::context::SecurityContext;
use crate::policy::PolicyRef;

/// Coarse gate deciding whether the primary role may perform an action on a module.
#[derive(Clone)]
pub struct PermissionChecker {
    policy: PolicyRef,
    audit: AuditSinkRef,
}

impl PermissionChecker {
    #[must_use]
    pub fn new(policy: PolicyRef, audit: AuditSinkRef) -> Self {
        Self { policy, audit }
    }

    /// Checker that does not emit audit events.
    #[must_use]
    pub fn without_audit(policy: PolicyRef) -> Self {
        Self::new(policy, Arc::new(NoopAuditSink))
    }

    /// Returns `true` only if the primary role is granted both the module and the
    /// normalized action. Subjects without a role, unknown modules, and unknown
    /// actions are denied.
    #[must_use]
    pub fn check(&self, ctx: &SecurityContext, module: &str, action: &str) -> bool {
        let normalized = Action::normalize(action);
        let allowed = ctx
            .primary_role_name()
            .is_some_and(|role| self.policy.matrix().allows(module, &normalized, role));

        let decision = Decision::from(allowed);
        tracing::debug!(
            user_id = ctx.user_id(),
            role = ctx.primary_role_name().unwrap_or("-"),
            module,
            action = normalized.as_str(),
            decision = decision.as_str(),
            "permission check"
        );
        self.audit.record(&DecisionEvent::new(
            CheckKind::Permission,
            ctx,
            module,
            normalized.as_str(),
            action,
            decision,
        ));

        allowed
    }

    #[must_use]
    pub fn policy(&self) -> &PolicyRef {
        &self.policy
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::policy::PolicyConfig;
    use crate::Role;

    fn checker(sink: Arc<InMemoryAuditSink>) -> PermissionChecker {
        let policy = Arc::new(PolicyConfig::default().compile().unwrap());
        PermissionChecker::new(policy, sink)
    }

    fn ctx(checker: &PermissionChecker, role: Option<&str>) -> SecurityContext {
        let mut b = SecurityContext::builder("u1").country_code("DOM");
        if let Some(role) = role {
            b = b.role(Role::named(role));
        }
        b.build(checker.policy().role_scopes())
    }

    #[test]
    fn agent_cannot_delete_users() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let checker = checker(sink.clone());
        let ctx = ctx(&checker, Some("agent"));

        assert!(!checker.check(&ctx, "users", "delete"));
        assert!(checker.check(&ctx, "properties", "list"));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].decision, Decision::Deny);
        assert_eq!(events[1].action, "read");
        assert_eq!(events[1].requested_action, "list");
    }

    #[test]
    fn unknown_module_and_action_are_denied() {
        let checker = checker(Arc::new(InMemoryAuditSink::new()));
        let ctx = ctx(&checker, Some("admin"));

        assert!(!checker.check(&ctx, "unknownModule", "read"));
        assert!(!checker.check(&ctx, "properties", "unknownAction"));
        assert!(checker.check(&ctx, "properties", "read"));
    }

    #[test]
    fn subject_without_role_is_denied() {
        let checker = checker(Arc::new(InMemoryAuditSink::new()));
        let ctx = ctx(&checker, None);
        assert!(!checker.check(&ctx, "properties", "read"));
    }

    #[test]
    fn only_primary_role_counts() {
        let checker = checker(Arc::new(InMemoryAuditSink::new()));
        let ctx = SecurityContext::builder("u1")
            .role(Role::named("agent"))
            .role(Role::named("admin"))
            .build(checker.policy().role_scopes());
        assert!(!checker.check(&ctx, "config", "manage"));
    }
}
