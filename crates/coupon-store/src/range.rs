//! Sequential key ranges emulated with two sentinel pointers per type.

use coupon_ledger::{LedgerStub, StateIter};
use coupon_types::{EntityKind, RecordKey, FIRST_NUMBER};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Current bounds of one entity range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangePointers {
    pub start: RecordKey,
    pub end: RecordKey,
}

impl RangePointers {
    /// Returns `true` if no key was ever allocated or all were retired.
    pub fn is_empty(&self) -> bool {
        self.end.number() < self.start.number()
    }
}

/// Range pointer bookkeeping. All sentinel reads and writes go through here.
pub struct RangeIndex;

impl RangeIndex {
    /// Write both sentinels for `kind`.
    ///
    /// The range always starts at [`FIRST_NUMBER`]; `last` is the highest
    /// number already in use, or `0` for an empty range.
    pub fn initialize<S: LedgerStub + ?Sized>(
        stub: &mut S,
        kind: EntityKind,
        last: u64,
    ) -> StoreResult<RangePointers> {
        let pointers = RangePointers {
            start: kind.key(FIRST_NUMBER),
            end: kind.key(last),
        };
        stub.put_state(
            &kind.start_pointer_key(),
            pointers.start.encoded().into_bytes(),
        )?;
        stub.put_state(&kind.end_pointer_key(), pointers.end.encoded().into_bytes())?;
        debug!(kind = %kind, start = %pointers.start, end = %pointers.end, "range initialized");
        Ok(pointers)
    }

    pub fn pointers<S: LedgerStub + ?Sized>(
        stub: &S,
        kind: EntityKind,
    ) -> StoreResult<RangePointers> {
        Ok(RangePointers {
            start: read_pointer(stub, &kind.start_pointer_key(), kind)?,
            end: read_pointer(stub, &kind.end_pointer_key(), kind)?,
        })
    }

    /// The key the next [`RangeIndex::allocate_next`] call would hand out.
    pub fn peek_next<S: LedgerStub + ?Sized>(
        stub: &S,
        kind: EntityKind,
    ) -> StoreResult<RecordKey> {
        let pointer = kind.end_pointer_key();
        let end = read_pointer(stub, &pointer, kind)?;
        let number = match end.number() {
            0 => FIRST_NUMBER,
            n => n.checked_add(1).ok_or_else(|| StoreError::CorruptPointer {
                pointer,
                reason: "range exhausted".into(),
            })?,
        };
        Ok(kind.key(number))
    }

    /// Write `payload` under the next key of the range, then advance the end
    /// pointer to it.
    pub fn allocate_next<S: LedgerStub + ?Sized>(
        stub: &mut S,
        kind: EntityKind,
        payload: Vec<u8>,
    ) -> StoreResult<RecordKey> {
        let key = Self::peek_next(&*stub, kind)?;
        stub.put_state(&key.encoded(), payload)?;
        stub.put_state(&kind.end_pointer_key(), key.encoded().into_bytes())?;
        debug!(kind = %kind, key = %key, "key allocated");
        Ok(key)
    }

    /// Scan `[start, end + 1)` for `kind`.
    ///
    /// The returned scan owns the host cursor and releases it when dropped.
    /// An empty range opens no cursor at all.
    pub fn scan_all<S: LedgerStub + ?Sized>(
        stub: &S,
        kind: EntityKind,
    ) -> StoreResult<RangeScan<'_>> {
        let pointers = Self::pointers(stub, kind)?;
        if pointers.is_empty() {
            return Ok(RangeScan { cursor: None });
        }
        let stop = pointers.end.successor();
        let cursor = stub.get_state_by_range(&pointers.start.encoded(), &stop.encoded())?;
        Ok(RangeScan {
            cursor: Some(cursor),
        })
    }

    /// Pull the end pointer back by one if `deleted` was the tail key.
    ///
    /// Returns the new end key when the pointer moved.
    pub fn retire<S: LedgerStub + ?Sized>(
        stub: &mut S,
        kind: EntityKind,
        deleted: u64,
    ) -> StoreResult<Option<RecordKey>> {
        let end = read_pointer(&*stub, &kind.end_pointer_key(), kind)?;
        if deleted != end.number() {
            debug!(kind = %kind, deleted, end = %end, "non-tail delete; end pointer kept");
            return Ok(None);
        }
        let new_end = kind.key(end.number().saturating_sub(1));
        stub.put_state(&kind.end_pointer_key(), new_end.encoded().into_bytes())?;
        debug!(kind = %kind, end = %new_end, "end pointer retired");
        Ok(Some(new_end))
    }
}

fn read_pointer<S: LedgerStub + ?Sized>(
    stub: &S,
    pointer: &str,
    kind: EntityKind,
) -> StoreResult<RecordKey> {
    let corrupt = |reason: String| StoreError::CorruptPointer {
        pointer: pointer.to_string(),
        reason,
    };

    let bytes = stub
        .get_state(pointer)?
        .ok_or_else(|| corrupt("pointer missing; ranges not initialized".into()))?;
    let raw = String::from_utf8(bytes).map_err(|e| corrupt(e.to_string()))?;
    let key: RecordKey = raw.parse().map_err(|e: coupon_types::TypeError| corrupt(e.to_string()))?;
    if key.kind() != kind.tag() {
        return Err(corrupt(format!("holds {key}, not a {kind} key")));
    }
    Ok(key)
}

/// Lazy, single-use scan over one entity range.
pub struct RangeScan<'a> {
    cursor: Option<StateIter<'a>>,
}

impl Iterator for RangeScan<'_> {
    type Item = StoreResult<(RecordKey, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.cursor.as_mut()?.next()?;
        Some(item.map_err(StoreError::from).and_then(|kv| {
            let key = kv.key.parse::<RecordKey>()?;
            Ok((key, kv.value))
        }))
    }
}
