use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Breadth of records a security context may see.
///
/// Variants are declared from narrowest to widest, so `Ord` reflects breadth:
/// `Own < Team < Country < All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Only records owned by the subject.
    Own,
    /// Records of the subject's team, plus records the subject owns.
    Team,
    /// Records in the subject's country.
    Country,
    /// Every record.
    All,
}

impl Scope {
    pub const ALL_SCOPES: [Scope; 4] = [Scope::Own, Scope::Team, Scope::Country, Scope::All];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Own => "own",
            Scope::Team => "team",
            Scope::Country => "country",
            Scope::All => "all",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "own" => Ok(Scope::Own),
            "team" => Ok(Scope::Team),
            "country" => Ok(Scope::Country),
            "all" => Ok(Scope::All),
            other => Err(PolicyError::UnknownScope(other.to_owned())),
        }
    }
}

/// Static mapping from role name to [`Scope`].
///
/// Lookups are exact (case-sensitive). A role that is not in the table resolves
/// to [`Scope::Own`], never to anything wider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleScopeTable {
    entries: HashMap<String, Scope>,
}

impl RoleScopeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a role entry.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, scope: Scope) -> Self {
        self.entries.insert(role.into(), scope);
        self
    }

    /// Resolve the scope for a role name, falling back to [`Scope::Own`].
    #[must_use]
    pub fn scope_for(&self, role: &str) -> Scope {
        self.entries.get(role).copied().unwrap_or(Scope::Own)
    }

    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.entries.contains_key(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Scope)> for RoleScopeTable {
    fn from_iter<I: IntoIterator<Item = (S, Scope)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(r, s)| (r.into(), s)).collect(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn scope_order_reflects_breadth() {
        assert!(Scope::Own < Scope::Team);
        assert!(Scope::Team < Scope::Country);
        assert!(Scope::Country < Scope::All);
    }

    #[test]
    fn scope_parses_and_displays() {
        for scope in Scope::ALL_SCOPES {
            assert_eq!(scope.to_string().parse::<Scope>().unwrap(), scope);
        }
        assert!(matches!(
            "global".parse::<Scope>(),
            Err(PolicyError::UnknownScope(s)) if s == "global"
        ));
    }

    #[test]
    fn unknown_role_falls_back_to_own() {
        let table = RoleScopeTable::new()
            .with_role("admin", Scope::All)
            .with_role("manager", Scope::Team);

        assert_eq!(table.scope_for("admin"), Scope::All);
        assert_eq!(table.scope_for("manager"), Scope::Team);
        assert_eq!(table.scope_for("intern"), Scope::Own);
        assert_eq!(table.scope_for(""), Scope::Own);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let table: RoleScopeTable = [("admin", Scope::All)].into_iter().collect();
        assert_eq!(table.scope_for("Admin"), Scope::Own);
        assert_eq!(table.len(), 1);
        assert!(table.contains("admin"));
    }
}
