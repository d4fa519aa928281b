use crm_security::{Scope, SecurityContext};
use sea_orm::sea_query::{Alias, Condition, Expr};

use crate::fields::OwnershipFields;

/// Outcome of scoping an entity for a given context.
#[derive(Debug, Clone)]
pub enum ScopeFilter {
    /// No row constraint: `all` scope or an unrestricted entity.
    Unrestricted,
    /// Rows must satisfy the condition.
    Restricted(Condition),
    /// Nothing is visible.
    DenyAll,
}

impl ScopeFilter {
    /// Condition to AND into the `WHERE` clause, `None` when unrestricted.
    #[must_use]
    pub fn into_condition(self) -> Option<Condition> {
        match self {
            ScopeFilter::Unrestricted => None,
            ScopeFilter::Restricted(c) => Some(c),
            ScopeFilter::DenyAll => Some(deny_all()),
        }
    }

    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        matches!(self, ScopeFilter::DenyAll)
    }
}

/// Always-false condition, rendered as `WHERE FALSE`.
#[must_use]
pub fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

/// Build the row-level constraint for `ctx` on an entity with `fields`.
///
/// Rules:
/// 1. Unrestricted entity or `all` scope: no constraint.
/// 2. `country`: `country_col = ctx.country_code`.
/// 3. `team`: `team_col = ctx.team_id OR owner_col = ctx.user_id`; without a
///    context team, ownership only.
/// 4. `own`: `owner_col = ctx.user_id`.
///
/// A blank subject id, a blank country, or a column the scope needs but the
/// entity lacks yields [`ScopeFilter::DenyAll`]. Scoping never widens.
#[must_use]
pub fn build_scope_condition(ctx: &SecurityContext, fields: &OwnershipFields) -> ScopeFilter {
    if fields.is_unrestricted() {
        return ScopeFilter::Unrestricted;
    }

    let owner_eq = || {
        let col = fields.owner_col()?;
        (!ctx.user_id().is_empty())
            .then(|| Expr::col(Alias::new(col)).eq(ctx.user_id().to_owned()))
    };

    match ctx.scope() {
        Scope::All => ScopeFilter::Unrestricted,
        Scope::Country => match fields.country_col() {
            Some(col) if !ctx.country_code().is_empty() => ScopeFilter::Restricted(
                Condition::all().add(Expr::col(Alias::new(col)).eq(ctx.country_code().to_owned())),
            ),
            _ => ScopeFilter::DenyAll,
        },
        Scope::Team => {
            let team_eq = match (fields.team_col(), ctx.team_id()) {
                (Some(col), Some(team)) => Some(Expr::col(Alias::new(col)).eq(team.to_owned())),
                _ => None,
            };
            match (team_eq, owner_eq()) {
                (None, None) => ScopeFilter::DenyAll,
                (team, owner) => ScopeFilter::Restricted(
                    Condition::any().add_option(team).add_option(owner),
                ),
            }
        }
        Scope::Own => owner_eq().map_or(ScopeFilter::DenyAll, |eq| {
            ScopeFilter::Restricted(Condition::all().add(eq))
        }),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crm_security::{Role, RoleScopeTable};
    use sea_orm::sea_query::{PostgresQueryBuilder, Query, QueryStatementWriter};

    fn table() -> RoleScopeTable {
        RoleScopeTable::new()
            .with_role("admin", Scope::All)
            .with_role("country_manager", Scope::Country)
            .with_role("manager", Scope::Team)
            .with_role("agent", Scope::Own)
    }

    fn ctx(user: &str, role: &str, team: Option<&str>) -> SecurityContext {
        SecurityContext::builder(user)
            .role(Role::named(role))
            .country_code("DOM")
            .team_id(team.map(str::to_owned))
            .build(&table())
    }

    fn render(filter: ScopeFilter) -> String {
        let mut q = Query::select();
        q.expr(Expr::val(1)).from(Alias::new("t"));
        if let Some(c) = filter.into_condition() {
            q.cond_where(c);
        }
        q.to_string(PostgresQueryBuilder)
    }

    fn full_fields() -> OwnershipFields {
        OwnershipFields::new("owner_id")
            .with_team("team_id")
            .with_country("country_code")
    }

    #[test]
    fn all_scope_and_unrestricted_entities_are_unconstrained() {
        let admin = ctx("u1", "admin", None);
        assert!(matches!(
            build_scope_condition(&admin, &full_fields()),
            ScopeFilter::Unrestricted
        ));
        let agent = ctx("u1", "agent", None);
        assert!(matches!(
            build_scope_condition(&agent, &OwnershipFields::unrestricted()),
            ScopeFilter::Unrestricted
        ));
    }

    #[test]
    fn own_scope_filters_by_owner() {
        let sql = render(build_scope_condition(&ctx("u1", "agent", None), &full_fields()));
        assert!(sql.ends_with(r#"WHERE "owner_id" = 'u1'"#), "{sql}");
    }

    #[test]
    fn country_scope_filters_by_country() {
        let sql = render(build_scope_condition(
            &ctx("u1", "country_manager", None),
            &full_fields(),
        ));
        assert!(sql.ends_with(r#"WHERE "country_code" = 'DOM'"#), "{sql}");
    }

    #[test]
    fn team_scope_is_team_or_owner() {
        let sql = render(build_scope_condition(
            &ctx("u1", "manager", Some("t1")),
            &full_fields(),
        ));
        assert!(sql.contains(r#""team_id" = 't1'"#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
        assert!(sql.contains(r#""owner_id" = 'u1'"#), "{sql}");
    }

    #[test]
    fn team_scope_without_team_is_owner_only() {
        let sql = render(build_scope_condition(
            &ctx("u1", "manager", None),
            &full_fields(),
        ));
        assert!(sql.ends_with(r#"WHERE "owner_id" = 'u1'"#), "{sql}");
    }

    #[test]
    fn missing_columns_deny_all() {
        let owner_only = OwnershipFields::new("owner_id");
        assert!(
            build_scope_condition(&ctx("u1", "country_manager", None), &owner_only).is_deny_all()
        );

        let blank = ctx("", "agent", None);
        let filter = build_scope_condition(&blank, &owner_only);
        assert!(filter.is_deny_all());
        assert!(render(filter).ends_with("WHERE FALSE"));
    }
}
