//! Entity storage on top of the ledger primitives.
//!
//! The ledger has no auto-increment. Each entity type instead owns a range
//! of sequential keys bounded by two sentinel entries, `<type>RangeStartKey`
//! and `<type>RangeEndKey`. All pointer bookkeeping lives in [`RangeIndex`];
//! [`EntityStore`] builds create/read/query/delete on top of it, and
//! [`HistoryFormatter`] turns per-key change history into JSON-ready rows.
//!
//! # Design Rules
//!
//! 1. Only `RangeIndex` reads or writes range pointers.
//! 2. Allocation never reuses a live number; tail deletes free the number.
//! 3. Scans tolerate holes left by non-tail deletes.
//! 4. Every cursor is dropped before the operation returns, on all paths.

pub mod error;
pub mod history;
pub mod range;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use history::{HistoryEntry, HistoryFormatter};
pub use range::{RangeIndex, RangePointers, RangeScan};
pub use store::{render_record, Deletion, EntityStore, RangeEntry, Retirement};
