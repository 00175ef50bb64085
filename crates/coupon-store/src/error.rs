use coupon_ledger::LedgerError;
use coupon_types::{EntityKind, TypeError};

/// Errors from range index and entity store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The key is absent from the ledger.
    #[error("record not found: {key}")]
    NotFound { key: String },

    /// The type tag does not name a range-indexed entity type.
    #[error("invalid entity type: {0}")]
    InvalidEntityType(String),

    /// The key exists but belongs to another entity type.
    #[error("key {key} is not a {expected} key")]
    UnexpectedKind { key: String, expected: EntityKind },

    #[error("malformed key `{key}`: {reason}")]
    MalformedKey { key: String, reason: String },

    /// Range sentinels are managed by the index and cannot be deleted.
    #[error("key {key} is a reserved range pointer")]
    ReservedKey { key: String },

    /// A range pointer is missing or does not hold a key of its own type.
    #[error("corrupt range pointer {pointer}: {reason}")]
    CorruptPointer { pointer: String, reason: String },

    #[error("record {key} could not be decoded: {reason}")]
    Serialization { key: String, reason: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::MalformedKey { key, reason } => Self::MalformedKey { key, reason },
            TypeError::InvalidEntityType(kind) => Self::InvalidEntityType(kind),
            other => Self::Serialization {
                key: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
