use thiserror::Error;

/// Errors raised while compiling policy configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unknown scope: {0}")]
    UnknownScope(String),

    #[error("unknown action in permission matrix: {0}")]
    UnknownAction(String),

    #[error("role name must not be empty")]
    EmptyRoleName,

    #[error("module name must not be empty")]
    EmptyModuleName,
}
