//! Ledger primitives for the coupon ledger.
//!
//! The business layer talks to the ledger only through [`LedgerStub`]:
//! point get, point put, point delete, end-exclusive range scan and per-key
//! history. This crate provides:
//! - The [`LedgerStub`] trait boundary and its value types
//! - [`InMemoryLedger`], a host that runs each invocation in a
//!   [`Transaction`] over a consistent snapshot and validates read sets at
//!   commit
//! - Cursor accounting so leaked range/history iterators are observable

pub mod cursor;
pub mod error;
pub mod memory;
pub mod traits;

pub use cursor::Cursor;
pub use error::LedgerError;
pub use memory::{InMemoryLedger, LedgerSnapshot, Transaction, TxReceipt};
pub use traits::{HistoryIter, KeyModification, KeyValue, LedgerStub, StateIter, TxTimestamp};
