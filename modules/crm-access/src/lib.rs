#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! CRM access engine: resolves the caller's security context, gates requests
//! through the permission matrix, and serves entity operations with
//! scope-constrained queries and record-level checks.

pub mod config;
pub mod domain;
pub mod handlers;
pub mod infra;
pub mod module;

pub use config::{AccessConfig, ConfigError, ProfileFallback};
pub use domain::context_resolver::ContextResolver;
pub use domain::dispatcher::Dispatcher;
pub use domain::error::DomainError;
pub use domain::identity::{IdentityError, IdentityStore, Profile, VerifiedIdentity};
pub use domain::registry::{AccessRequest, ModuleHandler, ModuleRegistry};
pub use domain::store::{EntityTable, FetchResult, Record, RecordStore, StoreError};
pub use infra::StaticIdentityStore;
pub use module::AccessModule;
