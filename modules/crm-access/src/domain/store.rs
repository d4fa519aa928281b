use async_trait::async_trait;
use crm_db::ScopedQuery;
use serde_json::{Map, Value};

/// A stored row as a JSON object.
pub type Record = Map<String, Value>;

/// Table addressing for single-record operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTable {
    pub name: String,
    pub id_column: String,
}

impl EntityTable {
    #[must_use]
    pub fn new(name: &str, id_column: &str) -> Self {
        Self {
            name: name.to_owned(),
            id_column: id_column.to_owned(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FetchResult {
    pub rows: Vec<Record>,
    /// Total matching rows, present when the query carried a count statement.
    pub total: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Persistence port. Implementations execute composed statements verbatim and
/// must not add or drop predicates.
///
/// The `*_many` methods are all-or-nothing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch(&self, query: &ScopedQuery) -> Result<FetchResult, StoreError>;

    async fn get(&self, table: &EntityTable, id: &str) -> Result<Option<Record>, StoreError>;

    async fn insert_many(
        &self,
        table: &EntityTable,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Apply `(id, patch)` pairs and return the updated rows.
    async fn update_many(
        &self,
        table: &EntityTable,
        patches: Vec<(String, Record)>,
    ) -> Result<Vec<Record>, StoreError>;

    async fn delete_many(&self, table: &EntityTable, ids: Vec<String>) -> Result<(), StoreError>;
}
