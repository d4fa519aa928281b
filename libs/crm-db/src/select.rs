use std::marker::PhantomData;

use crm_security::{Scope, SecurityContext};
use sea_orm::sea_query::{
    Alias, Asterisk, Condition, Expr, Func, Order, PostgresQueryBuilder, QueryBuilder,
    QueryStatementWriter, SelectStatement, Values,
};

use crate::cond::{ScopeFilter, build_scope_condition};
use crate::error::QueryError;
use crate::fields::OwnershipFields;
use crate::filter::{FilterValue, search_expr};
use crate::options::{Pagination, QueryOptions, SortDir};

/// Typestate marker: no scope applied yet.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Typestate marker: the security scope is part of the `WHERE` clause.
#[derive(Debug, Clone, Copy)]
pub struct Scoped;

/// Builder that refuses to produce a statement before a scope is applied.
///
/// ```ignore
/// let query = ScopedQueryBuilder::new(base, fields)
///     .scope_with(&ctx)
///     .apply(&options)?;
/// ```
///
/// The scope condition is always the first conjunct; caller filters and
/// search are ANDed after it and cannot loosen it.
#[must_use]
#[derive(Debug, Clone)]
pub struct ScopedQueryBuilder<S> {
    select: SelectStatement,
    fields: OwnershipFields,
    scope: Option<Scope>,
    where_: Condition,
    has_where: bool,
    order: Option<(String, SortDir)>,
    pagination: Option<Pagination>,
    _state: PhantomData<S>,
}

impl ScopedQueryBuilder<Unscoped> {
    pub fn new(base: SelectStatement, fields: OwnershipFields) -> Self {
        Self {
            select: base,
            fields,
            scope: None,
            where_: Condition::all(),
            has_where: false,
            order: None,
            pagination: None,
            _state: PhantomData,
        }
    }

    /// `SELECT * FROM "<table>"`.
    pub fn for_table(table: &str, fields: OwnershipFields) -> Self {
        let mut base = SelectStatement::new();
        base.column(Asterisk).from(Alias::new(table));
        Self::new(base, fields)
    }

    pub fn scope_with(self, ctx: &SecurityContext) -> ScopedQueryBuilder<Scoped> {
        let filter = build_scope_condition(ctx, &self.fields);
        if filter.is_deny_all() {
            tracing::debug!(
                user_id = ctx.user_id(),
                scope = %ctx.scope(),
                "scope cannot be expressed on entity, denying all rows"
            );
        }
        let mut next = ScopedQueryBuilder {
            select: self.select,
            fields: self.fields,
            scope: Some(ctx.scope()),
            where_: self.where_,
            has_where: self.has_where,
            order: self.order,
            pagination: self.pagination,
            _state: PhantomData,
        };
        if let Some(cond) = ScopeFilter::into_condition(filter) {
            next.push(cond);
        }
        next
    }
}

impl ScopedQueryBuilder<Scoped> {
    fn push(&mut self, cond: impl Into<sea_orm::sea_query::ConditionExpression>) {
        self.where_ = std::mem::replace(&mut self.where_, Condition::all()).add(cond);
        self.has_where = true;
    }

    /// AND caller filters, in field-name order.
    ///
    /// # Errors
    /// [`QueryError::BadFilter`] when a value is malformed.
    pub fn filters(
        mut self,
        filters: &std::collections::BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, QueryError> {
        for (field, raw) in filters {
            let parsed = FilterValue::parse(field, raw)?;
            self.push(parsed.to_expr(field));
        }
        Ok(self)
    }

    /// AND an OR-group of case-insensitive substring matches.
    pub fn search(mut self, term: &str, fields: &[String]) -> Self {
        let term = term.trim();
        if term.is_empty() || fields.is_empty() {
            return self;
        }
        let any = fields
            .iter()
            .fold(Condition::any(), |acc, f| acc.add(search_expr(f, term)));
        self.push(any);
        self
    }

    pub fn order(mut self, order_by: Option<&str>, dir: Option<SortDir>) -> Self {
        let column = order_by
            .filter(|c| !c.is_empty())
            .unwrap_or(self.fields.created_at_col())
            .to_owned();
        self.order = Some((column, dir.unwrap_or_default()));
        self
    }

    /// # Errors
    /// [`QueryError::InvalidPagination`] for a zero page or limit, or an
    /// offset that does not fit in `u64`.
    pub fn paginate(mut self, pagination: Option<Pagination>) -> Result<Self, QueryError> {
        if let Some(p) = pagination {
            if p.page == 0 {
                return Err(QueryError::InvalidPagination("page must be at least 1"));
            }
            if p.limit == 0 {
                return Err(QueryError::InvalidPagination("limit must be at least 1"));
            }
            if p.offset().is_none() {
                return Err(QueryError::InvalidPagination("offset overflows"));
            }
        }
        self.pagination = pagination;
        Ok(self)
    }

    /// Apply filters, search, ordering, and pagination from `options`.
    ///
    /// # Errors
    /// See [`Self::filters`] and [`Self::paginate`].
    pub fn apply(self, options: &QueryOptions) -> Result<ScopedQuery, QueryError> {
        let b = self.filters(&options.filters)?;
        let b = match options.effective_search() {
            Some(term) => b.search(term, &options.search_fields),
            None => b,
        };
        Ok(b
            .order(options.order_by.as_deref(), options.order_direction)
            .paginate(options.pagination)?
            .build())
    }

    #[must_use]
    pub fn build(self) -> ScopedQuery {
        let mut select = self.select;
        if self.has_where {
            select.cond_where(self.where_);
        }

        let count = self.pagination.map(|_| {
            let mut count = select.clone();
            count
                .clear_selects()
                .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("total"));
            count
        });

        let (column, dir) = self
            .order
            .unwrap_or_else(|| (self.fields.created_at_col().to_owned(), SortDir::Desc));
        select.order_by(
            Alias::new(column),
            match dir {
                SortDir::Asc => Order::Asc,
                SortDir::Desc => Order::Desc,
            },
        );

        if let Some(p) = self.pagination {
            select.limit(p.limit);
            if let Some(offset) = p.offset() {
                select.offset(offset);
            }
        }

        ScopedQuery {
            select,
            count,
            scope: self.scope.unwrap_or(Scope::Own),
            pagination: self.pagination,
        }
    }
}

/// Final scoped statement plus the companion count statement when paginating.
#[derive(Debug, Clone)]
pub struct ScopedQuery {
    select: SelectStatement,
    count: Option<SelectStatement>,
    scope: Scope,
    pagination: Option<Pagination>,
}

impl ScopedQuery {
    #[must_use]
    pub fn select(&self) -> &SelectStatement {
        &self.select
    }

    #[must_use]
    pub fn count(&self) -> Option<&SelectStatement> {
        self.count.as_ref()
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    /// Parameterized SQL for the row query.
    pub fn build<B: QueryBuilder>(&self, builder: B) -> (String, Values) {
        self.select.build(builder)
    }

    /// Inlined Postgres SQL, for logs and tests.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.select.to_string(PostgresQueryBuilder)
    }

    #[must_use]
    pub fn count_sql(&self) -> Option<String> {
        self.count
            .as_ref()
            .map(|c| c.to_string(PostgresQueryBuilder))
    }
}

/// Scope `base` for `ctx` and apply `options`.
///
/// # Errors
/// [`QueryError`] when filters or pagination are malformed.
pub fn build_scoped_query(
    base: SelectStatement,
    ctx: &SecurityContext,
    options: &QueryOptions,
    fields: &OwnershipFields,
) -> Result<ScopedQuery, QueryError> {
    ScopedQueryBuilder::new(base, fields.clone())
        .scope_with(ctx)
        .apply(options)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crm_security::{Role, RoleScopeTable};

    fn ctx(role: &str) -> SecurityContext {
        let table = RoleScopeTable::new()
            .with_role("agent", Scope::Own)
            .with_role("admin", Scope::All);
        SecurityContext::builder("u1")
            .role(Role::named(role))
            .country_code("DOM")
            .build(&table)
    }

    #[test]
    fn default_order_uses_creation_column() {
        let q = ScopedQueryBuilder::for_table(
            "tasks",
            OwnershipFields::new("assigned_to").with_created_at("inserted_at"),
        )
        .scope_with(&ctx("admin"))
        .build();
        assert_eq!(
            q.to_sql(),
            r#"SELECT * FROM "tasks" ORDER BY "inserted_at" DESC"#
        );
        assert!(q.count().is_none());
        assert_eq!(q.scope(), Scope::All);
    }

    #[test]
    #[tracing_test::traced_test]
    fn deny_all_is_logged() {
        let q = ScopedQueryBuilder::for_table("notes", OwnershipFields::new("owner_id"))
            .scope_with(&SecurityContext::builder("").role(Role::named("agent")).build(
                &RoleScopeTable::new().with_role("agent", Scope::Own),
            ))
            .build();
        assert!(q.to_sql().contains("WHERE FALSE"));
        assert!(logs_contain("denying all rows"));
    }

    #[test]
    fn zero_pagination_is_rejected() {
        let b = ScopedQueryBuilder::for_table("tasks", OwnershipFields::new("owner_id"))
            .scope_with(&ctx("agent"));
        assert!(matches!(
            b.clone().paginate(Some(Pagination::new(0, 10))),
            Err(QueryError::InvalidPagination(_))
        ));
        assert!(matches!(
            b.paginate(Some(Pagination::new(1, 0))),
            Err(QueryError::InvalidPagination(_))
        ));
    }

    #[test]
    fn count_shares_where_but_not_order_or_limit() {
        let q = ScopedQueryBuilder::for_table("deals", OwnershipFields::new("owner_id"))
            .scope_with(&ctx("agent"))
            .paginate(Some(Pagination::new(3, 10)))
            .unwrap()
            .build();
        assert_eq!(
            q.count_sql().unwrap(),
            r#"SELECT COUNT(*) AS "total" FROM "deals" WHERE "owner_id" = 'u1'"#
        );
        assert!(q.to_sql().ends_with("LIMIT 10 OFFSET 20"));
    }
}
