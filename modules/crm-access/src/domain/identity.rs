use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity asserted by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub subject_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
}

impl VerifiedIdentity {
    #[must_use]
    pub fn new(subject_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            email_verified: true,
        }
    }

    #[must_use]
    pub fn unverified(mut self) -> Self {
        self.email_verified = false;
        self
    }
}

/// Authorization-relevant profile data held by the identity store.
///
/// Roles are ordered; the first one is the primary role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn with_role(role: &str) -> Self {
        Self {
            roles: vec![role.to_owned()],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn team(mut self, team_id: &str) -> Self {
        self.team_id = Some(team_id.to_owned());
        self
    }

    #[must_use]
    pub fn country(mut self, country_code: &str) -> Self {
        self.country_code = Some(country_code.to_owned());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of user profiles by subject id.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// `Ok(None)` when the subject has no profile.
    async fn load_profile(&self, subject_id: &str) -> Result<Option<Profile>, IdentityError>;
}
