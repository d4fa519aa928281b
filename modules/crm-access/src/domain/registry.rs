use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use crm_db::Pagination;
use crm_security::SecurityContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::DomainError;

/// Request envelope routed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub module: String,
    pub action: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl AccessRequest {
    #[must_use]
    pub fn new(module: &str, action: &str, params: Value) -> Self {
        Self {
            module: module.to_owned(),
            action: action.to_owned(),
            params,
            pagination: None,
        }
    }

    #[must_use]
    pub fn paginate(mut self, page: u64, limit: u64) -> Self {
        self.pagination = Some(Pagination::new(page, limit));
        self
    }
}

/// A module's request handler. Invoked only after the permission check passed.
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    fn module(&self) -> &str;

    async fn handle(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError>;
}

/// Module name to handler, fixed at startup.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    handlers: HashMap<String, Arc<dyn ModuleHandler>>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its module name, replacing any previous one.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn ModuleHandler>) -> Self {
        let module = handler.module().to_owned();
        if self.handlers.insert(module.clone(), handler).is_some() {
            tracing::warn!(module = %module, "module handler replaced");
        }
        self
    }

    #[must_use]
    pub fn get(&self, module: &str) -> Option<&Arc<dyn ModuleHandler>> {
        self.handlers.get(module)
    }

    #[must_use]
    pub fn modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
