//! Entity records as they are stored on the ledger (JSON, camelCase).

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::date::LedgerDate;
use crate::error::TypeError;
use crate::key::RecordKey;
use crate::kind::EntityKind;

/// A JSON record living under a range-allocated key.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn key(&self) -> &RecordKey;

    fn to_bytes(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// Coupon lifecycle status. `Issued -> Redeemed` is the only transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    Issued,
    Redeemed,
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued => write!(f, "ISSUED"),
            Self::Redeemed => write!(f, "REDEEMED"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub key: RecordKey,
    pub name: String,
    pub created_date: LedgerDate,
    pub expiry_date: LedgerDate,
    pub discount_amount: f64,
    pub revenue_share_percent: f64,
    pub status: CouponStatus,
    pub customer_key: RecordKey,
}

impl Coupon {
    pub fn is_issued(&self) -> bool {
        self.status == CouponStatus::Issued
    }

    /// Move the coupon to `Redeemed`. Returns `false` if it already was.
    pub fn mark_redeemed(&mut self) -> bool {
        match self.status {
            CouponStatus::Issued => {
                self.status = CouponStatus::Redeemed;
                true
            }
            CouponStatus::Redeemed => false,
        }
    }
}

impl Record for Coupon {
    const KIND: EntityKind = EntityKind::Coupon;

    fn key(&self) -> &RecordKey {
        &self.key
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub key: RecordKey,
    pub name: String,
    pub email: String,
}

impl Record for Customer {
    const KIND: EntityKind = EntityKind::Customer;

    fn key(&self) -> &RecordKey {
        &self.key
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub key: RecordKey,
    pub name: String,
    /// Lookup-only reference; the partner does not own the address.
    pub address_key: RecordKey,
}

impl Record for Partner {
    const KIND: EntityKind = EntityKind::Partner;

    fn key(&self) -> &RecordKey {
        &self.key
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub key: RecordKey,
    pub street: String,
    pub zip: String,
    pub state: String,
    pub country: String,
}

impl Record for Address {
    const KIND: EntityKind = EntityKind::Address;

    fn key(&self) -> &RecordKey {
        &self.key
    }
}

/// Economics of one redemption. Written once, never updated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesTransaction {
    pub key: RecordKey,
    pub partner_key: RecordKey,
    pub coupon_key: RecordKey,
    pub original_price: f64,
    pub sales_amount: f64,
    pub revenue_share_amount: f64,
    pub settlement_amount: f64,
}

impl Record for SalesTransaction {
    const KIND: EntityKind = EntityKind::SalesTransaction;

    fn key(&self) -> &RecordKey {
        &self.key
    }
}
