//! The coupon contract.
//!
//! Named functions with positional string arguments are routed to entity
//! store operations and the coupon lifecycle. One invocation runs inside one
//! host transaction; any error discards every write it staged.
//!
//! # Key Types
//!
//! - [`Contract`]: function dispatcher and host adapter
//! - [`CouponLifecycle`]: validation and redemption rules
//! - [`Verdict`]: `{isValid, message}` outcome of a validity check
//! - [`ContractConfig`]: seeding and clock settings
//! - [`ContractError`]: invocation failures, each naming its operation

pub mod clock;
pub mod config;
pub mod contract;
pub mod error;
pub mod lifecycle;
pub mod payload;
pub mod seed;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ContractConfig;
pub use contract::{Contract, Function, Redemption, Submission};
pub use error::{ContractError, ContractResult};
pub use lifecycle::{CouponLifecycle, Settlement, Verdict};
pub use payload::{NewAddress, NewCoupon, NewCustomer, NewPartner, NewSalesTransaction};
pub use seed::Seeded;
