#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Roles, scopes and access decisions for the CRM.
//!
//! Everything in this crate is synchronous and side-effect free apart from
//! audit events: the [`PermissionChecker`] gates (module, action) pairs and the
//! [`RecordAccessChecker`] gates single records, both driven by the
//! [`SecurityContext`] built once per request.
pub mod action;
pub mod audit;
pub mod context;
pub mod error;
pub mod matrix;
pub mod permission;
pub mod policy;
pub mod prelude;
pub mod record_access;
pub mod role;
pub mod scope;

pub use action::Action;
pub use audit::{
    AuditSink, AuditSinkRef, CheckKind, Decision, DecisionEvent, InMemoryAuditSink,
    NoopAuditSink, TracingAuditSink,
};
pub use context::{ContextOrigin, SecurityContext, SecurityContextBuilder};
pub use error::PolicyError;
pub use matrix::{ModuleActionMatrix, ModuleActionMatrixBuilder};
pub use permission::PermissionChecker;
pub use policy::{Policy, PolicyConfig, PolicyRef};
pub use record_access::{OwnershipDescriptor, RecordAccessChecker, check_record_access};
pub use role::Role;
pub use scope::{RoleScopeTable, Scope};
