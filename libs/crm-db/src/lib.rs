#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Scope-constrained query building.
//!
//! Every list query for a scoped entity goes through [`ScopedQueryBuilder`],
//! whose typestate makes it impossible to build a statement before the
//! caller's [`crm_security::SecurityContext`] has constrained it.

pub mod cond;
pub mod error;
pub mod fields;
pub mod filter;
pub mod options;
pub mod select;

pub use cond::{ScopeFilter, build_scope_condition, deny_all};
pub use error::QueryError;
pub use fields::OwnershipFields;
pub use filter::{FilterValue, like_contains, like_escape};
pub use options::{Pagination, QueryOptions, SortDir};
pub use select::{ScopedQuery, ScopedQueryBuilder, Scoped, Unscoped, build_scoped_query};

/// Query-builder types re-exported for callers assembling base statements.
pub use sea_orm::sea_query;
