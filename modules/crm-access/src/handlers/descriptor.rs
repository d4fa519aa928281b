use std::collections::BTreeSet;

use crm_db::sea_query::{Alias, Asterisk, Query, SelectStatement};
use crm_db::{OwnershipFields, QueryOptions};

use crate::domain::error::DomainError;
use crate::domain::store::EntityTable;

/// Static description of a CRM entity: where it lives, how it is owned, and
/// which fields callers may filter, sort, and search on.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    module: String,
    table: EntityTable,
    ownership: OwnershipFields,
    filterable: BTreeSet<String>,
    sortable: BTreeSet<String>,
    searchable: Vec<String>,
}

impl EntityDescriptor {
    /// Ownership columns, the id, and the creation column are filterable; the
    /// id and creation column are sortable.
    #[must_use]
    pub fn new(module: &str, table: EntityTable, ownership: OwnershipFields) -> Self {
        let mut filterable: BTreeSet<String> = [
            ownership.owner_col(),
            ownership.team_col(),
            ownership.country_col(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_owned)
        .collect();
        filterable.insert(table.id_column.clone());
        filterable.insert(ownership.created_at_col().to_owned());

        let sortable = BTreeSet::from([
            table.id_column.clone(),
            ownership.created_at_col().to_owned(),
        ]);

        Self {
            module: module.to_owned(),
            table,
            ownership,
            filterable,
            sortable,
            searchable: Vec::new(),
        }
    }

    #[must_use]
    pub fn filterable(mut self, fields: &[&str]) -> Self {
        self.filterable.extend(fields.iter().map(|f| (*f).to_owned()));
        self
    }

    #[must_use]
    pub fn sortable(mut self, fields: &[&str]) -> Self {
        self.sortable.extend(fields.iter().map(|f| (*f).to_owned()));
        self
    }

    /// Searchable fields, also the default search fields when a caller gives none.
    #[must_use]
    pub fn searchable(mut self, fields: &[&str]) -> Self {
        self.searchable = fields.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn table(&self) -> &EntityTable {
        &self.table
    }

    #[must_use]
    pub fn ownership(&self) -> &OwnershipFields {
        &self.ownership
    }

    #[must_use]
    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable
    }

    /// `SELECT * FROM "<table>"`
    #[must_use]
    pub fn base_select(&self) -> SelectStatement {
        Query::select()
            .column(Asterisk)
            .from(Alias::new(self.table.name.as_str()))
            .to_owned()
    }

    /// Reject filter, order, and search fields outside the whitelists.
    ///
    /// # Errors
    /// [`DomainError::BadFilter`] naming the first offending field.
    pub fn check_options(&self, options: &QueryOptions) -> Result<(), DomainError> {
        if let Some(field) = options.filters.keys().find(|f| !self.filterable.contains(*f)) {
            return Err(DomainError::bad_filter(field, "field is not filterable"));
        }
        if let Some(field) = options
            .order_by
            .as_deref()
            .filter(|f| !self.sortable.contains(*f))
        {
            return Err(DomainError::bad_filter(field, "field is not sortable"));
        }
        if let Some(field) = options
            .search_fields
            .iter()
            .find(|f| !self.searchable.contains(*f))
        {
            return Err(DomainError::bad_filter(field, "field is not searchable"));
        }
        Ok(())
    }
}
