pub mod context_resolver;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod registry;
pub mod store;
