use coupon_ledger::LedgerStub;
use coupon_types::{decode, EntityKind, Record, RecordKey};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::history::{HistoryEntry, HistoryFormatter};
use crate::range::RangeIndex;

/// Uniform `{key, record}` envelope returned by range queries.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangeEntry {
    pub key: String,
    pub record: Value,
}

/// What happened to the range index when a record was deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Retirement {
    /// The tail key was deleted and the end pointer moved back.
    #[serde(rename_all = "camelCase")]
    Retired { new_end: RecordKey },
    /// A key below the tail was deleted; the range keeps a hole.
    Unchanged,
    /// The key's type prefix is not range-indexed.
    NotIndexed,
}

/// Result of [`EntityStore::delete`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deletion {
    pub deleted: String,
    pub retirement: Retirement,
}

/// Generic record operations over range-allocated keys.
pub struct EntityStore;

impl EntityStore {
    /// Allocate the next key of `kind` and store `payload` under it verbatim.
    pub fn create<S: LedgerStub + ?Sized>(
        stub: &mut S,
        kind: EntityKind,
        payload: Vec<u8>,
    ) -> StoreResult<RecordKey> {
        RangeIndex::allocate_next(stub, kind, payload)
    }

    /// Build a record around the next key of its kind and store it as JSON.
    pub fn create_record<S, R, F>(stub: &mut S, build: F) -> StoreResult<R>
    where
        S: LedgerStub + ?Sized,
        R: Record,
        F: FnOnce(RecordKey) -> R,
    {
        let key = RangeIndex::peek_next(&*stub, R::KIND)?;
        let record = build(key.clone());
        let bytes = record.to_bytes().map_err(|e| StoreError::Serialization {
            key: key.encoded(),
            reason: e.to_string(),
        })?;
        let allocated = RangeIndex::allocate_next(stub, R::KIND, bytes)?;
        debug_assert_eq!(allocated, key);
        Ok(record)
    }

    /// Point lookup of the stored bytes.
    pub fn get_raw<S: LedgerStub + ?Sized>(stub: &S, key: &str) -> StoreResult<Vec<u8>> {
        stub.get_state(key)?.ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    /// Point lookup decoded as `R`. The key must carry `R`'s type tag.
    pub fn get<S, R>(stub: &S, key: &str) -> StoreResult<R>
    where
        S: LedgerStub + ?Sized,
        R: Record,
    {
        let (tag, _) = decode(key)?;
        if tag != R::KIND.tag() {
            return Err(StoreError::UnexpectedKind {
                key: key.to_string(),
                expected: R::KIND,
            });
        }
        let bytes = Self::get_raw(stub, key)?;
        R::from_bytes(&bytes).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Overwrite an existing record in place.
    pub fn update<S, R>(stub: &mut S, record: &R) -> StoreResult<()>
    where
        S: LedgerStub + ?Sized,
        R: Record,
    {
        let key = record.key().encoded();
        let bytes = record.to_bytes().map_err(|e| StoreError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        stub.put_state(&key, bytes)?;
        Ok(())
    }

    /// Every live record of `kind` in ascending key order.
    pub fn query_by_range<S: LedgerStub + ?Sized>(
        stub: &S,
        kind: EntityKind,
    ) -> StoreResult<Vec<RangeEntry>> {
        let entries = RangeIndex::scan_all(stub, kind)?
            .map(|item| {
                item.map(|(key, value)| RangeEntry {
                    key: key.encoded(),
                    record: render_record(&value),
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        debug!(kind = %kind, count = entries.len(), "range queried");
        Ok(entries)
    }

    /// Every live record of `R`'s kind, decoded.
    pub fn query_records<S, R>(stub: &S) -> StoreResult<Vec<R>>
    where
        S: LedgerStub + ?Sized,
        R: Record,
    {
        RangeIndex::scan_all(stub, R::KIND)?
            .map(|item| -> StoreResult<R> {
                let (key, value) = item?;
                R::from_bytes(&value).map_err(|e| StoreError::Serialization {
                    key: key.encoded(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Remove a record and retire its key if it was the tail of its range.
    ///
    /// Keys whose type prefix is not range-indexed are still deleted; the
    /// result reports [`Retirement::NotIndexed`].
    pub fn delete<S: LedgerStub + ?Sized>(stub: &mut S, key: &str) -> StoreResult<Deletion> {
        if EntityKind::is_pointer_key(key) {
            return Err(StoreError::ReservedKey {
                key: key.to_string(),
            });
        }
        if stub.get_state(key)?.is_none() {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }
        stub.del_state(key)?;

        let indexed = decode(key)
            .map_err(StoreError::from)
            .and_then(|(tag, number)| Ok((tag.parse::<EntityKind>()?, number)));
        let retirement = match indexed {
            Ok((kind, number)) => match RangeIndex::retire(stub, kind, number)? {
                Some(new_end) => Retirement::Retired { new_end },
                None => Retirement::Unchanged,
            },
            Err(err) => {
                warn!(key, error = %err, "deleted key is not range-indexed");
                Retirement::NotIndexed
            }
        };

        debug!(key, ?retirement, "record deleted");
        Ok(Deletion {
            deleted: key.to_string(),
            retirement,
        })
    }

    /// Committed change history of `key`, oldest first.
    pub fn query_history<S: LedgerStub + ?Sized>(
        stub: &S,
        key: &str,
    ) -> StoreResult<Vec<HistoryEntry>> {
        let changes = stub.get_history_for_key(key)?;
        HistoryFormatter::format(changes)
    }
}

/// Stored bytes as JSON, or as a JSON string when they are not JSON.
pub fn render_record(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
