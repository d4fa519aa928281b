use serde::{Deserialize, Serialize};

/// A role assigned to a subject in the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

impl Role {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: display_name.into(),
        }
    }

    /// Role whose id and display name are its name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::new(name, name, name)
    }
}
