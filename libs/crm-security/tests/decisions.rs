#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use crm_security::policy::{modules, roles};
use crm_security::{
    InMemoryAuditSink, OwnershipDescriptor, PermissionChecker, PolicyConfig, Role, Scope,
    SecurityContext, check_record_access,
};

fn record(owner: &str, team: Option<&str>, country: Option<&str>) -> OwnershipDescriptor {
    OwnershipDescriptor {
        owner_id: owner.to_owned(),
        team_id: team.map(str::to_owned),
        country_code: country.map(str::to_owned),
    }
}

/// Teams t1/t2 belong to DOM, t3 to USA; u1 is a DOM user on t1.
fn records() -> Vec<OwnershipDescriptor> {
    let mut out = vec![
        record("u1", Some("t1"), Some("DOM")),
        record("u1", Some("t2"), Some("DOM")),
        record("u1", None, Some("DOM")),
    ];
    for owner in ["u2", "u9"] {
        out.push(record(owner, Some("t1"), Some("DOM")));
        out.push(record(owner, Some("t2"), Some("DOM")));
        out.push(record(owner, Some("t3"), Some("USA")));
        out.push(record(owner, None, Some("DOM")));
        out.push(record(owner, None, None));
    }
    out
}

fn ctx_for(role: &str) -> SecurityContext {
    let policy = PolicyConfig::default().compile().unwrap();
    SecurityContext::builder("u1")
        .role(Role::named(role))
        .country_code("DOM")
        .team_id(Some("t1".to_owned()))
        .build(policy.role_scopes())
}

fn visible(ctx: &SecurityContext) -> Vec<usize> {
    records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| check_record_access(ctx, rec))
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn scopes_are_monotonic() {
    let all = visible(&ctx_for(roles::ADMIN));
    let country = visible(&ctx_for(roles::COUNTRY_MANAGER));
    let team = visible(&ctx_for(roles::MANAGER));
    let own = visible(&ctx_for(roles::AGENT));

    assert!(country.iter().all(|r| all.contains(r)));
    assert!(team.iter().all(|r| country.contains(r)));
    assert!(own.iter().all(|r| team.contains(r)));

    assert_eq!(all.len(), 13);
    assert_eq!(country.len(), 9);
    assert_eq!(team.len(), 5);
    assert_eq!(own.len(), 3);
}

#[test]
fn unknown_role_never_widens_scope() {
    let ctx = ctx_for("mystery");
    assert_eq!(ctx.scope(), Scope::Own);
}

#[test]
fn agent_scenarios() {
    let ctx = ctx_for(roles::AGENT);
    assert_eq!(ctx.scope(), Scope::Own);
    assert!(!check_record_access(&ctx, &OwnershipDescriptor::new("u2")));
    assert!(check_record_access(&ctx, &OwnershipDescriptor::new("u1")));
}

#[test]
fn manager_scenarios() {
    let ctx = ctx_for(roles::MANAGER);
    assert_eq!(ctx.scope(), Scope::Team);
    assert!(check_record_access(
        &ctx,
        &OwnershipDescriptor::new("u9").with_team("t1")
    ));
    assert!(!check_record_access(
        &ctx,
        &OwnershipDescriptor::new("u9").with_team("t2")
    ));
}

#[test]
fn permission_scenarios() {
    let policy = Arc::new(PolicyConfig::default().compile().unwrap());
    let sink = Arc::new(InMemoryAuditSink::new());
    let checker = PermissionChecker::new(policy, sink.clone());

    let agent = ctx_for(roles::AGENT);
    assert!(!checker.check(&agent, modules::USERS, "delete"));
    assert!(!checker.check(&agent, "unknownModule", "read"));
    assert!(!checker.check(&agent, modules::PROPERTIES, "unknownAction"));
    assert!(checker.check(&agent, modules::PROPERTIES, "list"));
    assert!(!checker.check(&agent, modules::PROPERTIES, "bulk_delete"));

    let admin = ctx_for(roles::ADMIN);
    assert!(checker.check(&admin, modules::CONFIG, "manage"));
    assert!(checker.check(&admin, modules::USERS, "remove"));

    assert_eq!(sink.len(), 7);
    assert!(sink.events().iter().all(|e| e.user_id == "u1"));
}
