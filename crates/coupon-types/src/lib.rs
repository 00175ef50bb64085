//! Foundation types for the coupon ledger.
//!
//! This crate provides the key format, entity kinds, calendar dates and
//! record shapes shared by every other coupon-ledger crate.
//!
//! # Key Types
//!
//! - [`RecordKey`]: `"<type>:<number>"` key with a zero-padded suffix
//! - [`EntityKind`]: the range-indexed entity types
//! - [`LedgerDate`]: `dd-mm-yyyy` calendar date
//! - [`Coupon`], [`Customer`], [`Partner`], [`Address`], [`SalesTransaction`]

pub mod date;
pub mod error;
pub mod key;
pub mod kind;
pub mod records;

pub use date::LedgerDate;
pub use error::TypeError;
pub use key::{canonicalize, decode, encode, RecordKey, FIRST_NUMBER, SUFFIX_WIDTH};
pub use kind::EntityKind;
pub use records::{
    Address, Coupon, CouponStatus, Customer, Partner, Record, SalesTransaction,
};
