use crm_db::QueryError;
use http::StatusCode;
use serde_json::{Value, json};

use crate::domain::store::StoreError;

/// Errors surfaced to callers of the dispatcher.
///
/// Authorization failures are always errors, never empty result sets.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Authentication required: missing or invalid identity")]
    Unauthenticated,

    #[error("Profile could not be loaded: {0}")]
    ProfileLoadFailed(String),

    #[error("Forbidden: '{action}' on '{module}' is not permitted")]
    Forbidden { module: String, action: String },

    #[error("Bad filter on '{field}': {reason}")]
    BadFilter { field: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn forbidden(module: &str, action: &str) -> Self {
        Self::Forbidden {
            module: module.to_owned(),
            action: action.to_owned(),
        }
    }

    pub fn bad_filter(field: &str, reason: impl Into<String>) -> Self {
        Self::BadFilter {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::ProfileLoadFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::BadFilter { .. } | Self::InvalidParams(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ProfileLoadFailed(_) => "profile_load_failed",
            Self::Forbidden { .. } => "forbidden",
            Self::BadFilter { .. } => "bad_filter",
            Self::NotFound(_) => "not_found",
            Self::InvalidParams(_) => "invalid_params",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// Response body. Internal details are not exposed.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let status = self.status_code();
        let message = match self {
            Self::Internal(_) => "Internal error".to_owned(),
            other => other.to_string(),
        };
        json!({
            "error": message,
            "code": self.code(),
            "status": status.as_u16(),
        })
    }
}

impl From<QueryError> for DomainError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::BadFilter { field, reason } => Self::BadFilter { field, reason },
            QueryError::InvalidPagination(msg) => Self::InvalidParams(msg.to_owned()),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(format!("record '{id}'")),
            StoreError::Backend(msg) => {
                tracing::error!(error = %msg, "record store failure");
                Self::Internal(msg)
            }
        }
    }
}
