/// Errors produced by ledger primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger {op} failed on `{key}`: {reason}")]
    Io {
        op: &'static str,
        key: String,
        reason: String,
    },

    #[error("read conflict on `{key}`: value changed since the transaction began")]
    Conflict { key: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub fn io(op: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Io {
            op,
            key: key.into(),
            reason: reason.into(),
        }
    }
}
