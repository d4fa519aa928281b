#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crm_access::{
    AccessConfig, AccessModule, EntityTable, FetchResult, IdentityError, IdentityStore, Profile,
    Record, RecordStore, StaticIdentityStore, StoreError, VerifiedIdentity,
};
use crm_db::ScopedQuery;
use crm_security::InMemoryAuditSink;
use parking_lot::Mutex;
use serde_json::Value;

/// Record store fake: keeps rows per table, returns canned rows for list
/// queries, and remembers the SQL it was asked to run.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    list_rows: Mutex<Vec<Record>>,
    queries: Mutex<Vec<String>>,
    count_queries: Mutex<Vec<String>>,
    writes: AtomicUsize,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn seed(&self, table: &str, row: Value) {
        let row = row.as_object().cloned().expect("row must be an object");
        self.tables.lock().entry(table.to_owned()).or_default().push(row);
    }

    pub fn set_list_rows(&self, rows: Vec<Value>) {
        *self.list_rows.lock() = rows
            .into_iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect();
    }

    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub fn count_queries(&self) -> Vec<String> {
        self.count_queries.lock().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_with_backend_error(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    async fn before_call(&self) -> Result<(), StoreError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset".to_owned()));
        }
        Ok(())
    }

    fn id_of(row: &Record, table: &EntityTable) -> Option<String> {
        match row.get(&table.id_column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(&self, query: &ScopedQuery) -> Result<FetchResult, StoreError> {
        self.before_call().await?;
        self.queries.lock().push(query.to_sql());
        if let Some(count) = query.count_sql() {
            self.count_queries.lock().push(count);
        }
        let rows = self.list_rows.lock().clone();
        let total = query.count().map(|_| rows.len() as u64);
        Ok(FetchResult { rows, total })
    }

    async fn get(&self, table: &EntityTable, id: &str) -> Result<Option<Record>, StoreError> {
        self.before_call().await?;
        Ok(self
            .rows(&table.name)
            .into_iter()
            .find(|row| Self::id_of(row, table).as_deref() == Some(id)))
    }

    async fn insert_many(
        &self,
        table: &EntityTable,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, StoreError> {
        self.before_call().await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.tables
            .lock()
            .entry(table.name.clone())
            .or_default()
            .extend(records.iter().cloned());
        Ok(records)
    }

    async fn update_many(
        &self,
        table: &EntityTable,
        patches: Vec<(String, Record)>,
    ) -> Result<Vec<Record>, StoreError> {
        self.before_call().await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock();
        let rows = tables.entry(table.name.clone()).or_default();
        let mut updated = Vec::new();
        for (id, patch) in patches {
            let row = rows
                .iter_mut()
                .find(|row| Self::id_of(row, table).as_deref() == Some(id.as_str()))
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            row.extend(patch);
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete_many(&self, table: &EntityTable, ids: Vec<String>) -> Result<(), StoreError> {
        self.before_call().await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock();
        let rows = tables.entry(table.name.clone()).or_default();
        rows.retain(|row| Self::id_of(row, table).is_none_or(|id| !ids.contains(&id)));
        Ok(())
    }
}

/// Identity store that never answers in time.
pub struct StalledIdentityStore;

#[async_trait]
impl IdentityStore for StalledIdentityStore {
    async fn load_profile(&self, _subject_id: &str) -> Result<Option<Profile>, IdentityError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }
}

/// Identity store that always fails.
pub struct BrokenIdentityStore;

#[async_trait]
impl IdentityStore for BrokenIdentityStore {
    async fn load_profile(&self, _subject_id: &str) -> Result<Option<Profile>, IdentityError> {
        Err(IdentityError::Unavailable("directory offline".to_owned()))
    }
}

pub struct Harness {
    pub module: AccessModule,
    pub store: Arc<MemoryStore>,
    pub audit: Arc<InMemoryAuditSink>,
}

/// Profiles: `u1` agent, `u3` client, `m1` manager (team t1), `cm1` country
/// manager, `a1` admin. Everyone is in DOM.
pub fn default_profiles() -> StaticIdentityStore {
    StaticIdentityStore::new()
        .with_profile("u1", Profile::with_role("agent").team("t1").country("DOM"))
        .with_profile("u3", Profile::with_role("client").country("DOM"))
        .with_profile("m1", Profile::with_role("manager").team("t1").country("DOM"))
        .with_profile("cm1", Profile::with_role("country_manager").country("DOM"))
        .with_profile("a1", Profile::with_role("admin").country("DOM"))
}

pub fn harness() -> Harness {
    harness_with(AccessConfig::default(), Arc::new(default_profiles()))
}

pub fn harness_with(config: AccessConfig, identities: Arc<dyn IdentityStore>) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let audit = Arc::new(InMemoryAuditSink::new());
    let module = AccessModule::build(&config, identities, store.clone(), audit.clone())
        .expect("valid configuration");
    Harness {
        module,
        store,
        audit,
    }
}

pub fn identity(subject: &str) -> VerifiedIdentity {
    VerifiedIdentity::new(subject, format!("{subject}@acme.do"))
}
