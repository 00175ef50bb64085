use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::{encode, RecordKey};

/// Entity types that own a range of sequential keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Customer,
    Partner,
    Address,
    Coupon,
    SalesTransaction,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        Self::Customer,
        Self::Partner,
        Self::Address,
        Self::Coupon,
        Self::SalesTransaction,
    ];

    /// The type tag used as the key prefix.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Partner => "partner",
            Self::Address => "address",
            Self::Coupon => "coupon",
            Self::SalesTransaction => "salesTransaction",
        }
    }

    /// Sentinel key holding the lowest key of this range.
    pub fn start_pointer_key(&self) -> String {
        format!("{}RangeStartKey", self.tag())
    }

    /// Sentinel key holding the highest live key of this range.
    pub fn end_pointer_key(&self) -> String {
        format!("{}RangeEndKey", self.tag())
    }

    /// Returns `true` if `key` is one of the range sentinels.
    pub fn is_pointer_key(key: &str) -> bool {
        Self::ALL
            .iter()
            .any(|kind| key == kind.start_pointer_key() || key == kind.end_pointer_key())
    }

    pub fn key(&self, number: u64) -> RecordKey {
        RecordKey::new(self.tag(), number)
    }

    pub fn encode(&self, number: u64) -> String {
        encode(self.tag(), number)
    }
}

impl FromStr for EntityKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| TypeError::InvalidEntityType(s.to_string()))
    }
}

impl TryFrom<&RecordKey> for EntityKind {
    type Error = TypeError;

    fn try_from(key: &RecordKey) -> Result<Self, Self::Error> {
        key.kind().parse()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.tag().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_tag_is_invalid_entity_type() {
        assert_eq!(
            "voucher".parse::<EntityKind>().unwrap_err(),
            TypeError::InvalidEntityType("voucher".into())
        );
    }

    #[test]
    fn pointer_keys_are_recognized() {
        assert_eq!(EntityKind::Coupon.start_pointer_key(), "couponRangeStartKey");
        assert_eq!(
            EntityKind::SalesTransaction.end_pointer_key(),
            "salesTransactionRangeEndKey"
        );
        assert!(EntityKind::is_pointer_key("customerRangeEndKey"));
        assert!(!EntityKind::is_pointer_key("customer:0000000101"));
    }

    #[test]
    fn pointer_keys_sit_outside_record_ranges() {
        let kind = EntityKind::Coupon;
        let lo = kind.encode(0);
        let hi = kind.encode(u64::MAX);
        let start = kind.start_pointer_key();
        assert!(!(lo <= start && start < hi));
    }
}
