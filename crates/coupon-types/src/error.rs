use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed key `{key}`: {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("invalid entity type: {0}")]
    InvalidEntityType(String),

    #[error("malformed date `{value}`: expected dd-mm-yyyy")]
    MalformedDate { value: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
