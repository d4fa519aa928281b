use std::sync::Arc;

use anyhow::{Context, Result, bail};
use crm_access::handlers::{Operation, builtin_descriptors};
use crm_access::{AccessConfig, ContextResolver, StaticIdentityStore, VerifiedIdentity};
use crm_db::{Pagination, QueryOptions, build_scoped_query};
use crm_security::{Action, PermissionChecker, SecurityContext, TracingAuditSink};
use serde_json::{Value, json};

/// Inputs of the `explain` command.
#[derive(Debug, Clone)]
pub struct ExplainRequest {
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub module: String,
    pub action: String,
    /// List options as JSON (`filters`, `search`, `orderBy`, ...).
    pub options: Option<String>,
    pub pagination: Option<Pagination>,
}

/// Resolve the subject's context against the configured profiles, run the
/// permission check, and for list/export actions render the scoped SQL.
///
/// # Errors
/// Fails when the policy does not compile, the context cannot be resolved, or
/// the list options are rejected.
pub async fn explain(config: &AccessConfig, req: &ExplainRequest) -> Result<Value> {
    let policy = Arc::new(config.compile_policy()?);
    let identities = Arc::new(StaticIdentityStore::from_config(config));
    let resolver = ContextResolver::new(identities, policy.clone(), config);

    let identity = VerifiedIdentity {
        subject_id: req.subject.clone(),
        email: req.email.clone(),
        email_verified: req.email_verified,
    };
    let ctx = resolver
        .resolve(Some(&identity))
        .await
        .context("failed to resolve security context")?;

    let checker = PermissionChecker::new(policy, Arc::new(TracingAuditSink));
    let allowed = checker.check(&ctx, &req.module, &req.action);

    let query = if allowed {
        scoped_sql(config, &ctx, req)?
    } else {
        Value::Null
    };

    Ok(json!({
        "context": ctx,
        "permission": {
            "module": req.module,
            "action": req.action,
            "normalized_action": Action::normalize(&req.action).as_str(),
            "decision": if allowed { "allow" } else { "deny" },
        },
        "query": query,
    }))
}

fn scoped_sql(config: &AccessConfig, ctx: &SecurityContext, req: &ExplainRequest) -> Result<Value> {
    let operation = Operation::parse(&req.action);
    if !matches!(operation, Some(Operation::List | Operation::Export)) {
        return Ok(Value::Null);
    }
    let Some(descriptor) = builtin_descriptors()
        .into_iter()
        .find(|d| d.module() == req.module)
    else {
        bail!("module '{}' has no entity descriptor", req.module);
    };

    let mut options: QueryOptions = match &req.options {
        Some(raw) => serde_json::from_str(raw).context("invalid --options JSON")?,
        None => QueryOptions::default(),
    };
    if req.pagination.is_some() {
        options.pagination = req.pagination;
    } else if operation == Some(Operation::List) && options.pagination.is_none() {
        options.pagination = Some(Pagination::new(1, config.default_page_size));
    }
    descriptor.check_options(&options)?;

    let query = build_scoped_query(
        descriptor.base_select(),
        ctx,
        &options,
        descriptor.ownership(),
    )?;
    Ok(json!({
        "scope": query.scope(),
        "sql": query.to_sql(),
        "count_sql": query.count_sql(),
    }))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crm_access::Profile;

    fn config() -> AccessConfig {
        let mut config = AccessConfig::default();
        config.profiles.insert(
            "u1".to_owned(),
            Profile::with_role("agent").team("t1").country("DOM"),
        );
        config
    }

    fn request(action: &str, module: &str) -> ExplainRequest {
        ExplainRequest {
            subject: "u1".to_owned(),
            email: "u1@acme.do".to_owned(),
            email_verified: true,
            module: module.to_owned(),
            action: action.to_owned(),
            options: Some(r#"{"filters": {"status": "active"}}"#.to_owned()),
            pagination: None,
        }
    }

    #[tokio::test]
    async fn explains_allowed_list() {
        let out = explain(&config(), &request("list", "properties")).await.unwrap();
        assert_eq!(out["permission"]["decision"], "allow");
        assert_eq!(out["permission"]["normalized_action"], "read");
        assert_eq!(out["context"]["scope"], "own");
        assert_eq!(
            out["query"]["sql"],
            r#"SELECT * FROM "properties" WHERE "agent_id" = 'u1' AND "status" = 'active' ORDER BY "created_at" DESC LIMIT 20 OFFSET 0"#
        );
    }

    #[tokio::test]
    async fn denied_action_has_no_query() {
        let out = explain(&config(), &request("delete", "users")).await.unwrap();
        assert_eq!(out["permission"]["decision"], "deny");
        assert!(out["query"].is_null());
    }
}
