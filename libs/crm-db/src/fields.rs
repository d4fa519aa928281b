use crm_security::OwnershipDescriptor;
use serde_json::{Map, Value};

/// Column names an entity uses for ownership-based scoping.
///
/// Every scoped entity names its owner column explicitly. Team and country
/// columns are optional: when a context's scope needs a column the entity does
/// not have, the scope condition denies everything instead of widening.
///
/// Global entities (lookup tables, configuration) are declared with
/// [`OwnershipFields::unrestricted`] and receive no scope condition; access to
/// them is governed by the permission matrix alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipFields {
    owner: Option<String>,
    team: Option<String>,
    country: Option<String>,
    created_at: String,
    unrestricted: bool,
}

pub const DEFAULT_CREATED_AT: &str = "created_at";

impl OwnershipFields {
    #[must_use]
    pub fn new(owner_col: &str) -> Self {
        Self {
            owner: Some(owner_col.to_owned()),
            team: None,
            country: None,
            created_at: DEFAULT_CREATED_AT.to_owned(),
            unrestricted: false,
        }
    }

    #[must_use]
    pub fn unrestricted() -> Self {
        Self {
            owner: None,
            team: None,
            country: None,
            created_at: DEFAULT_CREATED_AT.to_owned(),
            unrestricted: true,
        }
    }

    #[must_use]
    pub fn with_team(mut self, team_col: &str) -> Self {
        self.team = Some(team_col.to_owned());
        self
    }

    #[must_use]
    pub fn with_country(mut self, country_col: &str) -> Self {
        self.country = Some(country_col.to_owned());
        self
    }

    /// Column used for the default `DESC` ordering.
    #[must_use]
    pub fn with_created_at(mut self, created_at_col: &str) -> Self {
        self.created_at = created_at_col.to_owned();
        self
    }

    #[must_use]
    pub fn owner_col(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    #[must_use]
    pub fn team_col(&self) -> Option<&str> {
        self.team.as_deref()
    }

    #[must_use]
    pub fn country_col(&self) -> Option<&str> {
        self.country.as_deref()
    }

    #[must_use]
    pub fn created_at_col(&self) -> &str {
        &self.created_at
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    /// Read the ownership attributes of a stored row.
    ///
    /// Missing, null, or non-scalar values become absent; numeric ids are
    /// rendered as strings.
    #[must_use]
    pub fn descriptor_from(&self, row: &Map<String, Value>) -> OwnershipDescriptor {
        let read = |col: Option<&str>| col.and_then(|c| row.get(c)).and_then(scalar_to_string);
        OwnershipDescriptor {
            owner_id: read(self.owner_col()).unwrap_or_default(),
            team_id: read(self.team_col()),
            country_code: read(self.country_col()),
        }
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_reads_configured_columns() {
        let fields = OwnershipFields::new("agent_id")
            .with_team("team_id")
            .with_country("country_code");
        let row = json!({
            "id": "p1",
            "agent_id": "u1",
            "team_id": 7,
            "country_code": null
        });
        let d = fields.descriptor_from(row.as_object().unwrap());
        assert_eq!(d.owner_id, "u1");
        assert_eq!(d.team_id.as_deref(), Some("7"));
        assert_eq!(d.country_code, None);
    }
}
