use serde::Serialize;

use crate::role::Role;
use crate::scope::{RoleScopeTable, Scope};

/// How a [`SecurityContext`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextOrigin {
    /// Built from a profile loaded from the identity store.
    #[default]
    Profile,
    /// Built by the fallback path after the profile could not be loaded.
    Degraded,
}

/// Request-scoped security information.
///
/// Built once per request and passed by reference to every check. The
/// [`Scope`] is derived from the primary role (`roles[0]`) through a
/// [`RoleScopeTable`] at build time; there is no way to set it directly, and the
/// type deliberately does not implement `Deserialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityContext {
    user_id: String,
    email: String,
    roles: Vec<Role>,
    country_code: String,
    team_id: Option<String>,
    scope: Scope,
    origin: ContextOrigin,
}

impl SecurityContext {
    /// Start building a context for the given subject.
    #[must_use]
    pub fn builder(user_id: impl Into<String>) -> SecurityContextBuilder {
        SecurityContextBuilder {
            user_id: user_id.into(),
            email: String::new(),
            roles: Vec::new(),
            country_code: String::new(),
            team_id: None,
            origin: ContextOrigin::Profile,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// The role that drives every decision. `None` when the subject has no role.
    #[must_use]
    pub fn primary_role(&self) -> Option<&Role> {
        self.roles.first()
    }

    #[must_use]
    pub fn primary_role_name(&self) -> Option<&str> {
        self.primary_role().map(|r| r.name.as_str())
    }

    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    #[must_use]
    pub fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub fn origin(&self) -> ContextOrigin {
        self.origin
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.origin == ContextOrigin::Degraded
    }
}

pub struct SecurityContextBuilder {
    user_id: String,
    email: String,
    roles: Vec<Role>,
    country_code: String,
    team_id: Option<String>,
    origin: ContextOrigin,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Append a role. The first role added becomes the primary role.
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    #[must_use]
    pub fn roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }

    #[must_use]
    pub fn country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    /// Set the team. Blank ids are treated as "no team".
    #[must_use]
    pub fn team_id(mut self, team_id: Option<String>) -> Self {
        self.team_id = team_id.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub fn origin(mut self, origin: ContextOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Finish the context, deriving its scope from the primary role.
    #[must_use]
    pub fn build(self, table: &RoleScopeTable) -> SecurityContext {
        let scope = self
            .roles
            .first()
            .map_or(Scope::Own, |role| table.scope_for(&role.name));

        SecurityContext {
            user_id: self.user_id,
            email: self.email,
            roles: self.roles,
            country_code: self.country_code,
            team_id: self.team_id,
            scope,
            origin: self.origin,
        }
    }
}
