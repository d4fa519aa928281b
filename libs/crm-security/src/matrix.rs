use std::collections::{HashMap, HashSet};

use crate::action::Action;

/// Two-dimensional permission gate.
///
/// A role may perform an action on a module only when it is listed for the
/// module in `module_access` *and* for the normalized action in
/// `action_permissions`. Missing entries deny.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleActionMatrix {
    module_access: HashMap<String, HashSet<String>>,
    action_permissions: HashMap<Action, HashSet<String>>,
}

impl ModuleActionMatrix {
    #[must_use]
    pub fn builder() -> ModuleActionMatrixBuilder {
        ModuleActionMatrixBuilder::default()
    }

    /// Whether `role` may touch `module` at all.
    #[must_use]
    pub fn module_allows(&self, module: &str, role: &str) -> bool {
        self.module_access
            .get(module)
            .is_some_and(|roles| roles.contains(role))
    }

    /// Whether `role` may perform `action` on modules it can access.
    /// [`Action::Other`] is never granted.
    #[must_use]
    pub fn action_allows(&self, action: &Action, role: &str) -> bool {
        if !action.is_canonical() {
            return false;
        }
        self.action_permissions
            .get(action)
            .is_some_and(|roles| roles.contains(role))
    }

    #[must_use]
    pub fn allows(&self, module: &str, action: &Action, role: &str) -> bool {
        self.module_allows(module, role) && self.action_allows(action, role)
    }

    #[must_use]
    pub fn has_module(&self, module: &str) -> bool {
        self.module_access.contains_key(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.module_access.keys().map(String::as_str)
    }

    /// All roles mentioned anywhere in the matrix.
    #[must_use]
    pub fn referenced_roles(&self) -> HashSet<&str> {
        self.module_access
            .values()
            .chain(self.action_permissions.values())
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ModuleActionMatrixBuilder {
    module_access: HashMap<String, HashSet<String>>,
    action_permissions: HashMap<Action, HashSet<String>>,
}

impl ModuleActionMatrixBuilder {
    /// Grant module access to the given roles. Repeated calls accumulate.
    #[must_use]
    pub fn module<I, S>(mut self, module: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module_access
            .entry(module.to_owned())
            .or_default()
            .extend(roles.into_iter().map(Into::into));
        self
    }

    /// Grant a canonical action to the given roles. Repeated calls accumulate.
    #[must_use]
    pub fn action<I, S>(mut self, action: Action, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action_permissions
            .entry(action)
            .or_default()
            .extend(roles.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn build(self) -> ModuleActionMatrix {
        ModuleActionMatrix {
            module_access: self.module_access,
            action_permissions: self.action_permissions,
        }
    }
}
