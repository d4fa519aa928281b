use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::PolicyError;
use crate::matrix::ModuleActionMatrix;
use crate::scope::{RoleScopeTable, Scope};

/// Built-in role names.
pub mod roles {
    pub const SUPER_ADMIN: &str = "super_admin";
    pub const ADMIN: &str = "admin";
    pub const COUNTRY_MANAGER: &str = "country_manager";
    pub const MANAGER: &str = "manager";
    pub const AGENT: &str = "agent";
    pub const CLIENT: &str = "client";
}

/// Built-in module names.
pub mod modules {
    pub const PROPERTIES: &str = "properties";
    pub const CONTACTS: &str = "contacts";
    pub const DEALS: &str = "deals";
    pub const LEADS: &str = "leads";
    pub const ACTIVITIES: &str = "activities";
    pub const TASKS: &str = "tasks";
    pub const DOCUMENTS: &str = "documents";
    pub const PROJECTS: &str = "projects";
    pub const TEAMS: &str = "teams";
    pub const USERS: &str = "users";
    pub const REPORTS: &str = "reports";
    pub const CONFIG: &str = "config";

    pub const ALL: [&str; 12] = [
        PROPERTIES, CONTACTS, DEALS, LEADS, ACTIVITIES, TASKS, DOCUMENTS, PROJECTS, TEAMS, USERS,
        REPORTS, CONFIG,
    ];
}

/// Serializable policy data: the Role-Scope Table and the Module-Action Matrix.
///
/// This is the configuration surface. It is compiled into an immutable
/// [`Policy`] once at startup with [`PolicyConfig::compile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// role name -> scope
    #[serde(default)]
    pub role_scopes: BTreeMap<String, Scope>,

    /// module name -> roles allowed to touch the module
    #[serde(default)]
    pub module_access: BTreeMap<String, BTreeSet<String>>,

    /// canonical action name -> roles allowed to perform it
    #[serde(default)]
    pub action_permissions: BTreeMap<String, BTreeSet<String>>,
}

fn role_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        use modules as m;
        use roles as r;

        let role_scopes = BTreeMap::from([
            (r::SUPER_ADMIN.to_owned(), Scope::All),
            (r::ADMIN.to_owned(), Scope::All),
            (r::COUNTRY_MANAGER.to_owned(), Scope::Country),
            (r::MANAGER.to_owned(), Scope::Team),
            (r::AGENT.to_owned(), Scope::Own),
            (r::CLIENT.to_owned(), Scope::Own),
        ]);

        let staff = [r::SUPER_ADMIN, r::ADMIN, r::COUNTRY_MANAGER, r::MANAGER, r::AGENT];
        let leads = [r::SUPER_ADMIN, r::ADMIN, r::COUNTRY_MANAGER, r::MANAGER];
        let admins = [r::SUPER_ADMIN, r::ADMIN];

        let mut module_access = BTreeMap::new();
        for module in [m::CONTACTS, m::LEADS, m::ACTIVITIES, m::TASKS, m::PROJECTS] {
            module_access.insert(module.to_owned(), role_set(&staff));
        }
        // Clients see the listings and documents shared with them.
        let mut client_facing = role_set(&staff);
        client_facing.insert(r::CLIENT.to_owned());
        for module in [m::PROPERTIES, m::DEALS, m::DOCUMENTS] {
            module_access.insert(module.to_owned(), client_facing.clone());
        }
        module_access.insert(m::TEAMS.to_owned(), role_set(&leads));
        module_access.insert(m::REPORTS.to_owned(), role_set(&leads));
        module_access.insert(
            m::USERS.to_owned(),
            role_set(&[r::SUPER_ADMIN, r::ADMIN, r::COUNTRY_MANAGER]),
        );
        module_access.insert(m::CONFIG.to_owned(), role_set(&admins));

        let mut everyone = role_set(&staff);
        everyone.insert(r::CLIENT.to_owned());
        let action_permissions = BTreeMap::from([
            (Action::Read.as_str().to_owned(), everyone),
            (Action::Create.as_str().to_owned(), role_set(&staff)),
            (Action::Update.as_str().to_owned(), role_set(&staff)),
            (Action::Delete.as_str().to_owned(), role_set(&leads)),
            (Action::Export.as_str().to_owned(), role_set(&leads)),
            (
                Action::Bulk.as_str().to_owned(),
                role_set(&[r::SUPER_ADMIN, r::ADMIN, r::COUNTRY_MANAGER]),
            ),
            (Action::Manage.as_str().to_owned(), role_set(&admins)),
        ]);

        Self {
            role_scopes,
            module_access,
            action_permissions,
        }
    }
}

impl PolicyConfig {
    /// Validate and compile into an immutable [`Policy`].
    ///
    /// # Errors
    /// - [`PolicyError::UnknownAction`] if an action key is not a canonical action
    ///   (aliases such as `list` are rejected too)
    /// - [`PolicyError::EmptyRoleName`] / [`PolicyError::EmptyModuleName`] for blank names
    pub fn compile(&self) -> Result<Policy, PolicyError> {
        let mut table = RoleScopeTable::new();
        for (role, scope) in &self.role_scopes {
            if role.trim().is_empty() {
                return Err(PolicyError::EmptyRoleName);
            }
            table = table.with_role(role.clone(), *scope);
        }

        let mut builder = ModuleActionMatrix::builder();
        for (module, granted) in &self.module_access {
            if module.trim().is_empty() {
                return Err(PolicyError::EmptyModuleName);
            }
            ensure_role_names(granted)?;
            builder = builder.module(module, granted.iter().cloned());
        }
        for (name, granted) in &self.action_permissions {
            let action = Action::from_canonical(name)
                .ok_or_else(|| PolicyError::UnknownAction(name.clone()))?;
            ensure_role_names(granted)?;
            builder = builder.action(action, granted.iter().cloned());
        }
        let matrix = builder.build();

        for role in matrix.referenced_roles() {
            if !table.contains(role) {
                tracing::warn!(
                    role,
                    "role is granted permissions but has no scope entry; it will resolve to 'own'"
                );
            }
        }

        tracing::debug!(
            roles = table.len(),
            modules = self.module_access.len(),
            "policy compiled"
        );

        Ok(Policy::new(table, matrix))
    }
}

fn ensure_role_names(granted: &BTreeSet<String>) -> Result<(), PolicyError> {
    if granted.iter().any(|r| r.trim().is_empty()) {
        return Err(PolicyError::EmptyRoleName);
    }
    Ok(())
}

/// Compiled, read-only policy shared by every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    role_scopes: RoleScopeTable,
    matrix: ModuleActionMatrix,
}

pub type PolicyRef = Arc<Policy>;

impl Policy {
    #[must_use]
    pub fn new(role_scopes: RoleScopeTable, matrix: ModuleActionMatrix) -> Self {
        Self {
            role_scopes,
            matrix,
        }
    }

    #[must_use]
    pub fn role_scopes(&self) -> &RoleScopeTable {
        &self.role_scopes
    }

    #[must_use]
    pub fn matrix(&self) -> &ModuleActionMatrix {
        &self.matrix
    }
}
