use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

/// Page-based pagination. Both values are expected to be validated (>= 1) by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    #[must_use]
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Row offset of the first item of this page, `None` for page 0 or on overflow.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.page.checked_sub(1)?.checked_mul(self.limit)
    }
}

/// Caller-supplied list options. Untrusted: field names are whitelisted by the
/// entity handler and values are validated while the query is built.
///
/// Filters live in a `BTreeMap`, so they are always applied in field-name order
/// regardless of how the caller listed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,

    #[serde(default)]
    pub search: Option<String>,

    #[serde(default, alias = "search_fields")]
    pub search_fields: Vec<String>,

    #[serde(default, alias = "order_by")]
    pub order_by: Option<String>,

    #[serde(default, alias = "order_direction")]
    pub order_direction: Option<SortDir>,

    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, field: &str, value: Value) -> Self {
        self.filters.insert(field.to_owned(), value);
        self
    }

    #[must_use]
    pub fn search(mut self, term: &str, fields: &[&str]) -> Self {
        self.search = Some(term.to_owned());
        self.search_fields = fields.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: &str, dir: SortDir) -> Self {
        self.order_by = Some(field.to_owned());
        self.order_direction = Some(dir);
        self
    }

    #[must_use]
    pub fn paginate(mut self, page: u64, limit: u64) -> Self {
        self.pagination = Some(Pagination::new(page, limit));
        self
    }

    /// Search term when both a non-blank term and at least one field are present.
    #[must_use]
    pub fn effective_search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !self.search_fields.is_empty())
    }
}
