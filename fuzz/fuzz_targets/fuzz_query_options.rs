#![no_main]

use crm_db::sea_query::{Alias, Query};
use crm_db::{OwnershipFields, QueryOptions, build_scoped_query};
use crm_security::{Role, RoleScopeTable, Scope, SecurityContext};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    let Ok(options) = serde_json::from_slice::<QueryOptions>(data) else {
        return;
    };

    let table = RoleScopeTable::new().with_role("manager", Scope::Team);
    let ctx = SecurityContext::builder("u1")
        .role(Role::named("manager"))
        .team_id(Some("t1".to_owned()))
        .country_code("DOM")
        .build(&table);
    let fields = OwnershipFields::new("agent_id")
        .with_team("team_id")
        .with_country("country_code");

    let mut base = Query::select();
    base.from(Alias::new("properties"));

    // Malformed filters must surface as errors, never as panics.
    if let Ok(query) = build_scoped_query(base, &ctx, &options, &fields) {
        let sql = query.to_sql();
        assert!(sql.contains(r#""team_id" = 't1'"#));
    }
});
