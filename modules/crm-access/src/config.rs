//! Configuration for the access engine.
//!
//! Layering: built-in defaults, then the YAML file (if any), then
//! `CRM__`-prefixed environment variables with `__` as the nesting separator
//! (`CRM__DEFAULT_COUNTRY_CODE=USA`, `CRM__IDENTITY_TIMEOUT=500ms`).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crm_security::{Policy, PolicyConfig, PolicyError};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::domain::identity::Profile;

pub const ENV_PREFIX: &str = "CRM__";

/// What to do when a verified subject's profile cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFallback {
    /// Fail the request with `ProfileLoadFailed`.
    Deny,
    /// Degraded context with `fallback_role`, the default country, and no team.
    #[default]
    Minimal,
    /// Infer the role from the email address. Only applied to verified emails;
    /// otherwise behaves like `Minimal`.
    EmailHeuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AccessConfig {
    pub policy: PolicyConfig,

    /// Country assigned when a profile has none.
    pub default_country_code: String,

    pub profile_fallback: ProfileFallback,

    /// Role given to degraded contexts.
    pub fallback_role: String,

    #[serde(with = "duration")]
    pub identity_timeout: Duration,

    #[serde(with = "duration")]
    pub persistence_timeout: Duration,

    /// Page size for list requests that carry no pagination.
    pub default_page_size: u64,

    pub max_page_size: u64,

    pub max_bulk_items: usize,

    /// Profiles served by the static identity store, keyed by subject id.
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            default_country_code: "DOM".to_owned(),
            profile_fallback: ProfileFallback::default(),
            fallback_role: crm_security::policy::roles::AGENT.to_owned(),
            identity_timeout: Duration::from_secs(2),
            persistence_timeout: Duration::from_secs(10),
            default_page_size: 20,
            max_page_size: 100,
            max_bulk_items: 500,
            profiles: BTreeMap::new(),
        }
    }
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file does not exist: {0}")]
    MissingFile(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AccessConfig {
    /// Load layered configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file is missing, a layer fails to
    /// parse, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.display().to_string()));
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        tracing::debug!(
            file = path.map(|p| p.display().to_string()),
            fallback = ?config.profile_fallback,
            profiles = config.profiles.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError::Invalid`] for blank defaults or inconsistent page sizes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_country_code.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_country_code must not be blank".to_owned(),
            ));
        }
        if self.fallback_role.trim().is_empty() {
            return Err(ConfigError::Invalid("fallback_role must not be blank".to_owned()));
        }
        if self.max_page_size == 0 || self.default_page_size == 0 {
            return Err(ConfigError::Invalid("page sizes must be at least 1".to_owned()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size ({}) exceeds max_page_size ({})",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.max_bulk_items == 0 {
            return Err(ConfigError::Invalid("max_bulk_items must be at least 1".to_owned()));
        }
        Ok(())
    }

    /// Compile the policy tables.
    ///
    /// # Errors
    /// Returns [`ConfigError::Policy`] on unknown actions or blank names.
    pub fn compile_policy(&self) -> Result<Policy, ConfigError> {
        let policy = self.policy.compile()?;
        if !policy.role_scopes().contains(&self.fallback_role) {
            tracing::warn!(
                role = %self.fallback_role,
                "fallback role has no scope entry and resolves to own"
            );
        }
        Ok(policy)
    }
}

/// `Duration` as a humantime string (`"2s"`, `"150ms"`).
mod duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(raw.trim()).map_err(de::Error::custom)
    }
}
