#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{BrokenIdentityStore, StalledIdentityStore, default_profiles};
use crm_access::{
    AccessConfig, ContextResolver, DomainError, IdentityStore, ProfileFallback, VerifiedIdentity,
};
use crm_security::{PolicyConfig, Scope};

fn resolver(fallback: ProfileFallback, identities: Arc<dyn IdentityStore>) -> ContextResolver {
    let config = AccessConfig {
        profile_fallback: fallback,
        identity_timeout: Duration::from_millis(200),
        ..AccessConfig::default()
    };
    let policy = Arc::new(PolicyConfig::default().compile().unwrap());
    ContextResolver::new(identities, policy, &config)
}

#[tokio::test]
async fn profile_drives_scope() {
    let r = resolver(ProfileFallback::Deny, Arc::new(default_profiles()));
    let ctx = r
        .resolve(Some(&VerifiedIdentity::new("m1", "m1@acme.do")))
        .await
        .unwrap();
    assert_eq!(ctx.scope(), Scope::Team);
    assert_eq!(ctx.team_id(), Some("t1"));
    assert_eq!(ctx.country_code(), "DOM");
    assert!(!ctx.is_degraded());
}

#[tokio::test]
async fn profile_without_country_gets_default() {
    let identities = crm_access::StaticIdentityStore::new()
        .with_profile("u5", crm_access::Profile::with_role("agent"));
    let r = resolver(ProfileFallback::Deny, Arc::new(identities));
    let ctx = r
        .resolve(Some(&VerifiedIdentity::new("u5", "u5@acme.do")))
        .await
        .unwrap();
    assert_eq!(ctx.country_code(), "DOM");
    assert_eq!(ctx.scope(), Scope::Own);
}

#[tokio::test]
async fn deny_mode_fails_closed() {
    let r = resolver(ProfileFallback::Deny, Arc::new(BrokenIdentityStore));
    let err = r
        .resolve(Some(&VerifiedIdentity::new("u1", "admin@acme.do")))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ProfileLoadFailed(_)));
}

#[tokio::test]
#[tracing_test::traced_test]
async fn minimal_mode_degrades_to_least_privilege() {
    let r = resolver(ProfileFallback::Minimal, Arc::new(default_profiles()));
    let ctx = r
        .resolve(Some(&VerifiedIdentity::new("ghost", "admin@acme.do")))
        .await
        .unwrap();
    assert!(ctx.is_degraded());
    assert_eq!(ctx.primary_role_name(), Some("agent"));
    assert_eq!(ctx.scope(), Scope::Own);
    assert_eq!(ctx.team_id(), None);
    assert_eq!(ctx.country_code(), "DOM");
    assert!(logs_contain("using minimal fallback context"));
}

#[tokio::test]
async fn email_heuristic_requires_verified_email() {
    let r = resolver(ProfileFallback::EmailHeuristic, Arc::new(BrokenIdentityStore));

    let verified = r
        .resolve(Some(&VerifiedIdentity::new("u7", "admin@acme.do")))
        .await
        .unwrap();
    assert_eq!(verified.primary_role_name(), Some("admin"));
    assert_eq!(verified.scope(), Scope::All);
    assert!(verified.is_degraded());

    let unverified = r
        .resolve(Some(&VerifiedIdentity::new("u7", "admin@acme.do").unverified()))
        .await
        .unwrap();
    assert_eq!(unverified.primary_role_name(), Some("agent"));
    assert_eq!(unverified.scope(), Scope::Own);
}

#[tokio::test(start_paused = true)]
async fn stalled_identity_store_times_out_into_fallback() {
    let r = resolver(ProfileFallback::Minimal, Arc::new(StalledIdentityStore));
    let ctx = r
        .resolve(Some(&VerifiedIdentity::new("u1", "u1@acme.do")))
        .await
        .unwrap();
    assert!(ctx.is_degraded());

    let r = resolver(ProfileFallback::Deny, Arc::new(StalledIdentityStore));
    let err = r
        .resolve(Some(&VerifiedIdentity::new("u1", "u1@acme.do")))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ProfileLoadFailed(ref reason) if reason.contains("timed out")));
}
