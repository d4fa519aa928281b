use std::sync::Arc;
use std::time::Duration;

use crm_security::policy::roles;
use crm_security::{ContextOrigin, PolicyRef, Role, SecurityContext};

use crate::config::{AccessConfig, ProfileFallback};
use crate::domain::error::DomainError;
use crate::domain::identity::{IdentityStore, Profile, VerifiedIdentity};

/// Builds a [`SecurityContext`] from a verified identity and the stored profile.
#[derive(Clone)]
pub struct ContextResolver {
    identities: Arc<dyn IdentityStore>,
    policy: PolicyRef,
    fallback: ProfileFallback,
    fallback_role: String,
    default_country: String,
    timeout: Duration,
}

impl ContextResolver {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        policy: PolicyRef,
        config: &AccessConfig,
    ) -> Self {
        Self {
            identities,
            policy,
            fallback: config.profile_fallback,
            fallback_role: config.fallback_role.clone(),
            default_country: config.default_country_code.clone(),
            timeout: config.identity_timeout,
        }
    }

    /// Resolve the caller's context.
    ///
    /// # Errors
    /// [`DomainError::Unauthenticated`] without an identity or with a blank
    /// subject id; [`DomainError::ProfileLoadFailed`] when the profile cannot
    /// be loaded and the fallback mode is `deny`.
    #[tracing::instrument(skip_all, fields(subject_id))]
    pub async fn resolve(
        &self,
        identity: Option<&VerifiedIdentity>,
    ) -> Result<SecurityContext, DomainError> {
        let identity = identity
            .filter(|i| !i.subject_id.trim().is_empty())
            .ok_or(DomainError::Unauthenticated)?;
        tracing::Span::current().record("subject_id", identity.subject_id.as_str());

        match self.load_profile(&identity.subject_id).await {
            Ok(profile) => Ok(self.context_from_profile(identity, profile)),
            Err(reason) => self.fallback_context(identity, reason),
        }
    }

    async fn load_profile(&self, subject_id: &str) -> Result<Profile, String> {
        match tokio::time::timeout(self.timeout, self.identities.load_profile(subject_id)).await {
            Ok(Ok(Some(profile))) => Ok(profile),
            Ok(Ok(None)) => Err("no profile for subject".to_owned()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "identity store timed out after {}",
                humantime::format_duration(self.timeout)
            )),
        }
    }

    fn context_from_profile(
        &self,
        identity: &VerifiedIdentity,
        profile: Profile,
    ) -> SecurityContext {
        let country = profile
            .country_code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.default_country.clone());

        let ctx = SecurityContext::builder(identity.subject_id.clone())
            .email(identity.email.clone())
            .roles(profile.roles.iter().map(|r| Role::named(r)).collect())
            .country_code(country)
            .team_id(profile.team_id)
            .build(self.policy.role_scopes());

        tracing::debug!(
            role = ctx.primary_role_name().unwrap_or("-"),
            scope = %ctx.scope(),
            "security context resolved"
        );
        ctx
    }

    fn fallback_context(
        &self,
        identity: &VerifiedIdentity,
        reason: String,
    ) -> Result<SecurityContext, DomainError> {
        let role = match self.fallback {
            ProfileFallback::Deny => {
                tracing::warn!(reason = %reason, "profile unavailable, request denied");
                return Err(DomainError::ProfileLoadFailed(reason));
            }
            ProfileFallback::EmailHeuristic if identity.email_verified => {
                let role = infer_role_from_email(&identity.email);
                tracing::warn!(
                    reason = %reason,
                    role,
                    "profile unavailable, role inferred from verified email"
                );
                role.to_owned()
            }
            ProfileFallback::EmailHeuristic | ProfileFallback::Minimal => {
                tracing::warn!(
                    reason = %reason,
                    role = %self.fallback_role,
                    "profile unavailable, using minimal fallback context"
                );
                self.fallback_role.clone()
            }
        };

        Ok(SecurityContext::builder(identity.subject_id.clone())
            .email(identity.email.clone())
            .role(Role::named(&role))
            .country_code(self.default_country.clone())
            .origin(ContextOrigin::Degraded)
            .build(self.policy.role_scopes()))
    }
}

/// Role guessed from substrings of the email address.
#[must_use]
pub fn infer_role_from_email(email: &str) -> &'static str {
    let email = email.to_lowercase();
    if email.contains("admin") {
        roles::ADMIN
    } else if email.contains("manager") {
        roles::MANAGER
    } else if email.contains("client") {
        roles::CLIENT
    } else {
        roles::AGENT
    }
}
