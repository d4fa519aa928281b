use std::fmt;

use serde::{Serialize, Serializer};

/// Normalized operation kind checked against the permission matrix.
///
/// Raw action names coming from the request envelope are folded into one of
/// the canonical kinds by [`Action::normalize`]. Anything unrecognized is kept
/// verbatim as [`Action::Other`], which no matrix entry ever grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Export,
    Bulk,
    Manage,
    Other(String),
}

impl Action {
    /// Canonical actions, in matrix order.
    pub const CANONICAL: [Action; 7] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Export,
        Action::Bulk,
        Action::Manage,
    ];

    /// Fold a raw action name into its canonical kind.
    ///
    /// | raw | normalized |
    /// |-----|------------|
    /// | `list`, `get`, `view`, `read` | `read` |
    /// | `create`, `insert` | `create` |
    /// | `update`, `edit`, `patch` | `update` |
    /// | `delete`, `remove` | `delete` |
    /// | `export`, `download` | `export` |
    /// | `bulk_create`, `bulk_update`, `bulk_delete`, `bulk` | `bulk` |
    /// | `manage` | `manage` |
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "list" | "get" | "view" | "read" => Action::Read,
            "create" | "insert" => Action::Create,
            "update" | "edit" | "patch" => Action::Update,
            "delete" | "remove" => Action::Delete,
            "export" | "download" => Action::Export,
            "bulk_create" | "bulk_update" | "bulk_delete" | "bulk" => Action::Bulk,
            "manage" => Action::Manage,
            other => Action::Other(other.to_owned()),
        }
    }

    /// Parse a canonical action name (as used for matrix keys). Aliases are rejected.
    #[must_use]
    pub fn from_canonical(name: &str) -> Option<Self> {
        Self::CANONICAL.into_iter().find(|a| a.as_str() == name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Export => "export",
            Action::Bulk => "bulk",
            Action::Manage => "manage",
            Action::Other(raw) => raw,
        }
    }

    #[must_use]
    pub fn is_canonical(&self) -> bool {
        !matches!(self, Action::Other(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
