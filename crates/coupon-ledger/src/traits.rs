use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Host transaction timestamp as epoch seconds plus nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl TxTimestamp {
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: elapsed.as_secs() as i64,
            nanos: elapsed.subsec_nanos(),
        }
    }
}

/// One entry yielded by a range scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// One committed change to a key.
///
/// Deletions carry an empty `value` and `is_delete = true`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyModification {
    pub tx_id: String,
    pub value: Vec<u8>,
    pub timestamp: TxTimestamp,
    pub is_delete: bool,
}

/// Range cursor. Dropping it releases the host-side cursor.
pub type StateIter<'a> = Box<dyn Iterator<Item = Result<KeyValue, LedgerError>> + 'a>;

/// History cursor. Dropping it releases the host-side cursor.
pub type HistoryIter<'a> = Box<dyn Iterator<Item = Result<KeyModification, LedgerError>> + 'a>;

/// Primitive operations the ledger host offers to one invocation.
///
/// Writes are staged and become visible to other invocations only when the
/// host commits. Cursors returned by the scan methods must be dropped on
/// every exit path.
pub trait LedgerStub {
    /// Identifier of the transaction this invocation runs in.
    fn tx_id(&self) -> &str;

    fn tx_timestamp(&self) -> TxTimestamp;

    /// Point lookup. Returns `Ok(None)` if the key is absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Idempotent overwrite.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    fn del_state(&mut self, key: &str) -> Result<(), LedgerError>;

    /// Lexicographic scan over `[start, end)`.
    fn get_state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError>;

    /// Committed changes to `key`, oldest first.
    fn get_history_for_key(&self, key: &str) -> Result<HistoryIter<'_>, LedgerError>;
}
