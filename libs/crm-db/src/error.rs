/// Errors raised while turning caller query options into a scoped statement.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A caller-supplied filter value is malformed.
    #[error("bad filter on '{field}': {reason}")]
    BadFilter { field: String, reason: String },

    /// Page or limit is zero, or the offset overflows.
    #[error("invalid pagination: {0}")]
    InvalidPagination(&'static str),
}

impl QueryError {
    pub(crate) fn bad_filter(field: &str, reason: impl Into<String>) -> Self {
        QueryError::BadFilter {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}
