use std::sync::Arc;

use crm_security::{AuditSinkRef, PermissionChecker, Policy, PolicyRef, RecordAccessChecker};

use crate::config::{AccessConfig, ConfigError};
use crate::domain::context_resolver::ContextResolver;
use crate::domain::dispatcher::Dispatcher;
use crate::domain::identity::IdentityStore;
use crate::domain::registry::ModuleRegistry;
use crate::domain::store::RecordStore;
use crate::handlers::{EntityHandler, HandlerLimits, builtin_descriptors};

/// Wiring of the access engine: compiled policy, context resolver, and a
/// dispatcher with an [`EntityHandler`] for every built-in module.
#[derive(Clone)]
pub struct AccessModule {
    policy: PolicyRef,
    dispatcher: Dispatcher,
}

impl AccessModule {
    /// # Errors
    /// [`ConfigError`] when the configuration or policy is invalid.
    pub fn build(
        config: &AccessConfig,
        identities: Arc<dyn IdentityStore>,
        store: Arc<dyn RecordStore>,
        audit: AuditSinkRef,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy: PolicyRef = Arc::new(config.compile_policy()?);

        let limits = HandlerLimits::from_config(config);
        let records = RecordAccessChecker::new(audit.clone());
        let registry = builtin_descriptors()
            .into_iter()
            .fold(ModuleRegistry::new(), |registry, descriptor| {
                registry.with_handler(Arc::new(EntityHandler::new(
                    descriptor,
                    store.clone(),
                    records.clone(),
                    limits,
                )))
            });

        for module in registry.modules() {
            if !policy.matrix().has_module(module) {
                tracing::warn!(module, "module has no access entry; every request will be denied");
            }
        }

        let resolver = ContextResolver::new(identities, policy.clone(), config);
        let permissions = PermissionChecker::new(policy.clone(), audit);
        tracing::info!(modules = registry.len(), "access module initialized");

        Ok(Self {
            policy,
            dispatcher: Dispatcher::new(resolver, registry, permissions),
        })
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}
