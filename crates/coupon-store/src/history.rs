use chrono::{DateTime, SecondsFormat};
use coupon_ledger::{KeyModification, LedgerError, TxTimestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreResult;
use crate::store::render_record;

/// One rendered change to a key. Deletions carry a `null` value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub tx_id: String,
    pub value: Option<Value>,
    pub timestamp: String,
    pub is_delete: bool,
}

/// Pure conversion from host history to [`HistoryEntry`] rows.
pub struct HistoryFormatter;

impl HistoryFormatter {
    /// Render every change in host order. Stops at the first cursor error.
    pub fn format<I>(changes: I) -> StoreResult<Vec<HistoryEntry>>
    where
        I: IntoIterator<Item = Result<KeyModification, LedgerError>>,
    {
        changes
            .into_iter()
            .map(|change| -> StoreResult<HistoryEntry> { Ok(Self::entry(change?)) })
            .collect()
    }

    pub fn entry(change: KeyModification) -> HistoryEntry {
        let value = if change.is_delete {
            None
        } else {
            Some(render_record(&change.value))
        };
        HistoryEntry {
            tx_id: change.tx_id,
            value,
            timestamp: Self::timestamp(change.timestamp),
            is_delete: change.is_delete,
        }
    }

    /// RFC 3339 in UTC, with as many fractional digits as the nanos need.
    pub fn timestamp(ts: TxTimestamp) -> String {
        match DateTime::from_timestamp(ts.seconds, ts.nanos) {
            Some(at) => at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => format!("{}.{:09}s", ts.seconds, ts.nanos),
        }
    }
}
