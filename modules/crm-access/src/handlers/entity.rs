use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crm_db::{Pagination, QueryOptions, build_scoped_query};
use crm_security::{RecordAccessChecker, SecurityContext};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::AccessConfig;
use crate::domain::error::DomainError;
use crate::domain::registry::{AccessRequest, ModuleHandler};
use crate::domain::store::{Record, RecordStore, StoreError};
use crate::handlers::descriptor::EntityDescriptor;
use crate::handlers::operation::Operation;

/// Size and time limits applied by entity handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerLimits {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub max_bulk_items: usize,
    pub persistence_timeout: Duration,
}

impl HandlerLimits {
    #[must_use]
    pub fn from_config(config: &AccessConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            max_bulk_items: config.max_bulk_items,
            persistence_timeout: config.persistence_timeout,
        }
    }
}

impl Default for HandlerLimits {
    fn default() -> Self {
        Self::from_config(&AccessConfig::default())
    }
}

#[derive(Deserialize)]
struct CreateParams {
    data: Record,
}

#[derive(Deserialize)]
struct UpdateParams {
    id: Value,
    data: Record,
}

#[derive(Deserialize)]
struct BulkCreateParams {
    items: Vec<Record>,
}

#[derive(Deserialize)]
struct BulkUpdateParams {
    items: Vec<UpdateParams>,
}

#[derive(Deserialize)]
struct BulkDeleteParams {
    ids: Vec<Value>,
}

/// Generic handler serving list, export, single-record, and bulk operations
/// for one entity.
pub struct EntityHandler {
    descriptor: EntityDescriptor,
    store: Arc<dyn RecordStore>,
    records: RecordAccessChecker,
    limits: HandlerLimits,
}

impl EntityHandler {
    pub fn new(
        descriptor: EntityDescriptor,
        store: Arc<dyn RecordStore>,
        records: RecordAccessChecker,
        limits: HandlerLimits,
    ) -> Self {
        Self {
            descriptor,
            store,
            records,
            limits,
        }
    }

    async fn persist<T, F>(&self, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.limits.persistence_timeout, fut).await {
            Ok(result) => result.map_err(DomainError::from),
            Err(_) => {
                tracing::warn!(
                    module = self.descriptor.module(),
                    timeout = %humantime::format_duration(self.limits.persistence_timeout),
                    "record store timed out"
                );
                Err(DomainError::Timeout("record store"))
            }
        }
    }

    fn validate_pagination(&self, pagination: Pagination) -> Result<(), DomainError> {
        if pagination.page == 0 {
            return Err(DomainError::invalid_params("page must be at least 1"));
        }
        if pagination.limit == 0 || pagination.limit > self.limits.max_page_size {
            return Err(DomainError::invalid_params(format!(
                "limit must be between 1 and {}",
                self.limits.max_page_size
            )));
        }
        Ok(())
    }

    fn query_options(
        &self,
        request: &AccessRequest,
        export: bool,
    ) -> Result<QueryOptions, DomainError> {
        let mut options: QueryOptions = parse_params(&request.params)?;
        if let Some(p) = request.pagination {
            options.pagination = Some(p);
        }
        if !export && options.pagination.is_none() {
            options.pagination = Some(Pagination::new(1, self.limits.default_page_size));
        }
        if let Some(p) = options.pagination {
            self.validate_pagination(p)?;
        }
        let has_term = options.search.as_deref().is_some_and(|t| !t.trim().is_empty());
        if has_term && options.search_fields.is_empty() {
            options.search_fields = self.descriptor.searchable_fields().to_vec();
        }
        self.descriptor.check_options(&options)?;
        Ok(options)
    }

    #[tracing::instrument(skip_all, fields(module = %self.descriptor.module(), export = export))]
    async fn list(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
        export: bool,
    ) -> Result<Value, DomainError> {
        let options = self.query_options(request, export)?;
        let query = build_scoped_query(
            self.descriptor.base_select(),
            ctx,
            &options,
            self.descriptor.ownership(),
        )?;
        tracing::debug!(sql = %query.to_sql(), scope = %query.scope(), "scoped query built");

        let result = self.persist(self.store.fetch(&query)).await?;
        if export {
            return Ok(json!({ "count": result.rows.len(), "items": result.rows }));
        }
        let page = options.pagination.unwrap_or(Pagination::new(1, self.limits.default_page_size));
        Ok(json!({
            "items": result.rows,
            "total": result.total,
            "page": page.page,
            "limit": page.limit,
        }))
    }

    /// Record-level check. Unrestricted entities are governed by the matrix alone.
    fn authorize_record(
        &self,
        ctx: &SecurityContext,
        action: &str,
        record: &Record,
    ) -> Result<(), DomainError> {
        let ownership = self.descriptor.ownership();
        if ownership.is_unrestricted() {
            return Ok(());
        }
        let descriptor = ownership.descriptor_from(record);
        if self
            .records
            .check(ctx, self.descriptor.module(), action, &descriptor)
        {
            Ok(())
        } else {
            Err(DomainError::forbidden(self.descriptor.module(), action))
        }
    }

    async fn load_authorized(
        &self,
        ctx: &SecurityContext,
        action: &str,
        id: &str,
    ) -> Result<Record, DomainError> {
        let row = self
            .persist(self.store.get(self.descriptor.table(), id))
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("{} '{id}'", self.descriptor.module()))
            })?;
        self.authorize_record(ctx, action, &row)?;
        Ok(row)
    }

    /// Fill missing id, ownership, and creation columns from the context.
    fn stamp(&self, ctx: &SecurityContext, mut record: Record) -> Record {
        let ownership = self.descriptor.ownership();
        fill_missing(
            &mut record,
            &self.descriptor.table().id_column,
            Some(uuid::Uuid::now_v7().to_string()),
        );
        if let Some(col) = ownership.owner_col() {
            fill_missing(&mut record, col, Some(ctx.user_id().to_owned()));
        }
        if let Some(col) = ownership.team_col() {
            fill_missing(&mut record, col, ctx.team_id().map(str::to_owned));
        }
        if let Some(col) = ownership.country_col() {
            let country = Some(ctx.country_code()).filter(|c| !c.is_empty());
            fill_missing(&mut record, col, country.map(str::to_owned));
        }
        fill_missing(
            &mut record,
            ownership.created_at_col(),
            Some(chrono::Utc::now().to_rfc3339()),
        );
        record
    }

    fn prepare_insert(
        &self,
        ctx: &SecurityContext,
        action: &str,
        data: Record,
    ) -> Result<Record, DomainError> {
        let stamped = self.stamp(ctx, data);
        self.authorize_record(ctx, action, &stamped)?;
        Ok(stamped)
    }

    /// Load, check, and re-check the patched row. Returns `(id, patch)`.
    async fn prepare_update(
        &self,
        ctx: &SecurityContext,
        action: &str,
        params: UpdateParams,
    ) -> Result<(String, Record), DomainError> {
        let id = id_string(&params.id)?;
        let existing = self.load_authorized(ctx, action, &id).await?;

        let id_col = &self.descriptor.table().id_column;
        if let Some(new_id) = params.data.get(id_col) {
            if id_string(new_id)? != id {
                return Err(DomainError::invalid_params(format!(
                    "'{id_col}' cannot be changed"
                )));
            }
        }

        let mut patched = existing;
        patched.extend(params.data.clone());
        self.authorize_record(ctx, action, &patched)?;
        Ok((id, params.data))
    }

    fn check_batch_size(&self, len: usize) -> Result<(), DomainError> {
        if len == 0 {
            return Err(DomainError::invalid_params("batch must not be empty"));
        }
        if len > self.limits.max_bulk_items {
            return Err(DomainError::invalid_params(format!(
                "batch of {len} exceeds the limit of {}",
                self.limits.max_bulk_items
            )));
        }
        Ok(())
    }

    async fn create(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError> {
        let params: CreateParams = parse_required(&request.params)?;
        let record = self.prepare_insert(ctx, &request.action, params.data)?;
        let mut created = self
            .persist(self.store.insert_many(self.descriptor.table(), vec![record]))
            .await?;
        created
            .pop()
            .map(Value::Object)
            .ok_or_else(|| DomainError::Internal("store returned no created row".to_owned()))
    }

    async fn update(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError> {
        let params: UpdateParams = parse_required(&request.params)?;
        let patch = self.prepare_update(ctx, &request.action, params).await?;
        let mut updated = self
            .persist(self.store.update_many(self.descriptor.table(), vec![patch]))
            .await?;
        updated
            .pop()
            .map(Value::Object)
            .ok_or_else(|| DomainError::Internal("store returned no updated row".to_owned()))
    }

    async fn delete(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError> {
        let id = id_param(&request.params)?;
        self.load_authorized(ctx, &request.action, &id).await?;
        self.persist(
            self.store
                .delete_many(self.descriptor.table(), vec![id.clone()]),
        )
        .await?;
        Ok(json!({ "deleted": id }))
    }

    async fn get(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError> {
        let id = id_param(&request.params)?;
        self.load_authorized(ctx, &request.action, &id)
            .await
            .map(Value::Object)
    }

    async fn bulk_create(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError> {
        let params: BulkCreateParams = parse_required(&request.params)?;
        self.check_batch_size(params.items.len())?;
        let records = params
            .items
            .into_iter()
            .map(|item| self.prepare_insert(ctx, &request.action, item))
            .collect::<Result<Vec<_>, _>>()?;
        let created = self
            .persist(self.store.insert_many(self.descriptor.table(), records))
            .await?;
        Ok(json!({ "count": created.len(), "items": created }))
    }

    async fn bulk_update(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError> {
        let params: BulkUpdateParams = parse_required(&request.params)?;
        self.check_batch_size(params.items.len())?;
        // Each patch is checked against the stored row, so one id per batch.
        unique_ids(params.items.iter().map(|item| &item.id))?;
        let mut patches = Vec::with_capacity(params.items.len());
        for item in params.items {
            patches.push(self.prepare_update(ctx, &request.action, item).await?);
        }
        let updated = self
            .persist(self.store.update_many(self.descriptor.table(), patches))
            .await?;
        Ok(json!({ "count": updated.len(), "items": updated }))
    }

    async fn bulk_delete(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError> {
        let params: BulkDeleteParams = parse_required(&request.params)?;
        self.check_batch_size(params.ids.len())?;
        let ids = unique_ids(&params.ids)?;
        for id in &ids {
            self.load_authorized(ctx, &request.action, id).await?;
        }
        self.persist(self.store.delete_many(self.descriptor.table(), ids.clone()))
            .await?;
        Ok(json!({ "count": ids.len(), "deleted": ids }))
    }
}

#[async_trait]
impl ModuleHandler for EntityHandler {
    fn module(&self) -> &str {
        self.descriptor.module()
    }

    async fn handle(
        &self,
        ctx: &SecurityContext,
        request: &AccessRequest,
    ) -> Result<Value, DomainError> {
        let operation = Operation::parse(&request.action).ok_or_else(|| {
            DomainError::invalid_params(format!(
                "action '{}' is not supported by module '{}'",
                request.action,
                self.descriptor.module()
            ))
        })?;

        match operation {
            Operation::List => self.list(ctx, request, false).await,
            Operation::Export => self.list(ctx, request, true).await,
            Operation::Get => self.get(ctx, request).await,
            Operation::Create => self.create(ctx, request).await,
            Operation::Update => self.update(ctx, request).await,
            Operation::Delete => self.delete(ctx, request).await,
            Operation::BulkCreate => self.bulk_create(ctx, request).await,
            Operation::BulkUpdate => self.bulk_update(ctx, request).await,
            Operation::BulkDelete => self.bulk_delete(ctx, request).await,
        }
    }
}

fn fill_missing(record: &mut Record, column: &str, value: Option<String>) {
    let missing = record.get(column).is_none_or(Value::is_null);
    if let (true, Some(value)) = (missing, value) {
        record.insert(column.to_owned(), Value::String(value));
    }
}

/// Optional params: `null` means defaults.
fn parse_params<T: DeserializeOwned + Default>(params: &Value) -> Result<T, DomainError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params.clone()).map_err(|e| DomainError::invalid_params(e.to_string()))
}

fn parse_required<T: DeserializeOwned>(params: &Value) -> Result<T, DomainError> {
    serde_json::from_value(params.clone()).map_err(|e| DomainError::invalid_params(e.to_string()))
}

fn id_param(params: &Value) -> Result<String, DomainError> {
    params
        .get("id")
        .ok_or_else(|| DomainError::invalid_params("missing 'id'"))
        .and_then(id_string)
}

fn unique_ids<'a>(
    raw: impl IntoIterator<Item = &'a Value>,
) -> Result<Vec<String>, DomainError> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for value in raw {
        let id = id_string(value)?;
        if !seen.insert(id.clone()) {
            return Err(DomainError::invalid_params(format!(
                "id '{id}' appears more than once in the batch"
            )));
        }
        ids.push(id);
    }
    Ok(ids)
}

fn id_string(raw: &Value) -> Result<String, DomainError> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(DomainError::invalid_params(
            "id must be a non-empty string or a number",
        )),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn fill_missing_keeps_present_values() {
        let mut record = Record::new();
        record.insert("owner_id".to_owned(), json!("u2"));
        record.insert("team_id".to_owned(), Value::Null);

        fill_missing(&mut record, "owner_id", Some("u1".to_owned()));
        fill_missing(&mut record, "team_id", Some("t1".to_owned()));
        fill_missing(&mut record, "country_code", None);

        assert_eq!(record["owner_id"], "u2");
        assert_eq!(record["team_id"], "t1");
        assert!(!record.contains_key("country_code"));
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        assert_eq!(id_string(&json!("p1")).unwrap(), "p1");
        assert_eq!(id_string(&json!(42)).unwrap(), "42");
        assert!(id_string(&json!("  ")).is_err());
        assert!(id_string(&json!(null)).is_err());
        assert!(id_param(&json!({})).is_err());
    }

    #[test]
    fn batch_ids_must_be_unique() {
        let ids = [json!("d1"), json!(2), json!("d3")];
        assert_eq!(unique_ids(&ids).unwrap(), ["d1", "2", "d3"]);

        let dup = [json!("d1"), json!("d2"), json!("d1")];
        assert!(matches!(unique_ids(&dup), Err(DomainError::InvalidParams(_))));

        // Numeric and string forms of the same id collide.
        let mixed = [json!(7), json!("7")];
        assert!(unique_ids(&mixed).is_err());
    }
}
