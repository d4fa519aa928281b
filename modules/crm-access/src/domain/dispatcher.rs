use crm_security::PermissionChecker;
use serde_json::Value;

use crate::domain::context_resolver::ContextResolver;
use crate::domain::error::DomainError;
use crate::domain::identity::VerifiedIdentity;
use crate::domain::registry::{AccessRequest, ModuleRegistry};

/// Entry point for every request: context, handler lookup, permission check,
/// then the handler.
#[derive(Clone)]
pub struct Dispatcher {
    resolver: ContextResolver,
    registry: ModuleRegistry,
    permissions: PermissionChecker,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        resolver: ContextResolver,
        registry: ModuleRegistry,
        permissions: PermissionChecker,
    ) -> Self {
        Self {
            resolver,
            registry,
            permissions,
        }
    }

    /// # Errors
    /// - [`DomainError::Unauthenticated`] / [`DomainError::ProfileLoadFailed`] from context resolution
    /// - [`DomainError::NotFound`] for an unregistered module
    /// - [`DomainError::Forbidden`] when the permission check denies; the handler is not invoked
    /// - any handler error
    #[tracing::instrument(skip_all, fields(module = %request.module, action = %request.action))]
    pub async fn dispatch(
        &self,
        identity: Option<&VerifiedIdentity>,
        request: AccessRequest,
    ) -> Result<Value, DomainError> {
        let ctx = self.resolver.resolve(identity).await?;

        let handler = self
            .registry
            .get(&request.module)
            .ok_or_else(|| DomainError::NotFound(format!("module '{}'", request.module)))?;

        if !self.permissions.check(&ctx, &request.module, &request.action) {
            tracing::warn!(
                user_id = ctx.user_id(),
                role = ctx.primary_role_name().unwrap_or("-"),
                "permission denied"
            );
            return Err(DomainError::forbidden(&request.module, &request.action));
        }

        handler.handle(&ctx, &request).await
    }
}
