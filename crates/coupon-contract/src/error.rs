use coupon_ledger::LedgerError;
use coupon_store::StoreError;

/// Errors that abort an invocation. Every variant names the operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    /// Bad argument count, unparsable number/date/JSON, or a key of the wrong shape.
    #[error("{op}: malformed {subject}: {reason}")]
    MalformedInput {
        op: &'static str,
        subject: String,
        reason: String,
    },

    #[error("{op}: record not found: {key}")]
    NotFound { op: &'static str, key: String },

    #[error("{op}: invalid entity type: {kind}")]
    InvalidEntityType { op: &'static str, kind: String },

    /// The host failed or range bookkeeping on the ledger is corrupt.
    #[error("{op}: ledger failure on `{key}`: {reason}")]
    LedgerIo {
        op: &'static str,
        key: String,
        reason: String,
    },

    /// Redemption of a coupon that does not validate.
    #[error("{op}: coupon {key} rejected: {message}")]
    CouponRejected {
        op: &'static str,
        key: String,
        message: String,
    },

    /// The host refused to commit the transaction.
    #[error("{op}: transaction rejected: {reason}")]
    TransactionRejected { op: &'static str, reason: String },

    #[error("{op}: ledger already initialized")]
    AlreadyInitialized { op: &'static str },

    #[error("no such function: {0}")]
    UnknownFunction(String),
}

impl ContractError {
    pub(crate) fn malformed(
        op: &'static str,
        subject: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::MalformedInput {
            op,
            subject: subject.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn from_store(op: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => Self::NotFound { op, key },
            StoreError::InvalidEntityType(kind) => Self::InvalidEntityType { op, kind },
            StoreError::UnexpectedKind { key, expected } => {
                Self::malformed(op, key, format!("not a {expected} key"))
            }
            StoreError::MalformedKey { key, reason } => Self::malformed(op, key, reason),
            StoreError::ReservedKey { key } => {
                Self::malformed(op, key, "reserved range pointer")
            }
            StoreError::Serialization { key, reason } => Self::malformed(op, key, reason),
            StoreError::CorruptPointer { pointer, reason } => Self::LedgerIo {
                op,
                key: pointer,
                reason,
            },
            StoreError::Ledger(err) => Self::from_ledger(op, err),
        }
    }

    pub(crate) fn from_ledger(op: &'static str, err: LedgerError) -> Self {
        match err {
            LedgerError::Conflict { key } => Self::TransactionRejected {
                op,
                reason: format!("read conflict on `{key}`"),
            },
            LedgerError::Io { key, reason, .. } => Self::LedgerIo { op, key, reason },
            LedgerError::Serialization(reason) => Self::LedgerIo {
                op,
                key: String::new(),
                reason,
            },
        }
    }
}

/// Attach the invoking operation to a lower-layer error.
pub(crate) trait During<T> {
    fn during(self, op: &'static str) -> ContractResult<T>;
}

impl<T> During<T> for Result<T, StoreError> {
    fn during(self, op: &'static str) -> ContractResult<T> {
        self.map_err(|e| ContractError::from_store(op, e))
    }
}

impl<T> During<T> for Result<T, LedgerError> {
    fn during(self, op: &'static str) -> ContractResult<T> {
        self.map_err(|e| ContractError::from_ledger(op, e))
    }
}

pub type ContractResult<T> = Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use coupon_types::EntityKind;

    use super::*;

    #[test]
    fn store_errors_keep_key_context() {
        let err = ContractError::from_store(
            "queryByKey",
            StoreError::NotFound {
                key: "coupon:0000000101".into(),
            },
        );
        assert_eq!(err.to_string(), "queryByKey: record not found: coupon:0000000101");

        let err = ContractError::from_store(
            "validateCoupon",
            StoreError::UnexpectedKind {
                key: "customer:0000000101".into(),
                expected: EntityKind::Coupon,
            },
        );
        assert!(matches!(err, ContractError::MalformedInput { subject, .. } if subject == "customer:0000000101"));
    }

    #[test]
    fn conflicts_become_rejections() {
        let err = Err::<(), _>(LedgerError::Conflict {
            key: "couponRangeEndKey".into(),
        })
        .during("createCoupon")
        .unwrap_err();
        assert!(matches!(err, ContractError::TransactionRejected { op: "createCoupon", .. }));
    }
}
