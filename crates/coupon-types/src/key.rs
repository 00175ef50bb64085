//! The `"<type>:<number>"` record key format.
//!
//! Numeric suffixes are zero-padded to [`SUFFIX_WIDTH`] digits so that the
//! lexicographic order used by ledger range scans matches numeric order for
//! every number below `10^SUFFIX_WIDTH`. Past that bound keys still encode,
//! but grow wider and stop sorting numerically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Digits in an encoded numeric suffix.
pub const SUFFIX_WIDTH: usize = 10;

/// First number handed out for an empty range.
pub const FIRST_NUMBER: u64 = 101;

/// Encode a type tag and number into a record key.
///
/// ```
/// assert_eq!(coupon_types::encode("coupon", 101), "coupon:0000000101");
/// ```
pub fn encode(kind: &str, number: u64) -> String {
    format!("{kind}:{number:0width$}", width = SUFFIX_WIDTH)
}

/// Split a record key on its last `:` into type tag and number.
///
/// Both padded and unpadded suffixes are accepted.
pub fn decode(key: &str) -> Result<(&str, u64), TypeError> {
    let malformed = |reason: &str| TypeError::MalformedKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (kind, suffix) = key
        .rsplit_once(':')
        .ok_or_else(|| malformed("missing `:` separator"))?;
    if kind.is_empty() {
        return Err(malformed("empty type tag"));
    }
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("suffix is not a non-negative integer"));
    }
    let number = suffix
        .parse::<u64>()
        .map_err(|e| malformed(&e.to_string()))?;
    Ok((kind, number))
}

/// The padded form of `key` when it decodes as a record key, `key` itself
/// otherwise (range pointers, free-form keys).
///
/// ```
/// assert_eq!(coupon_types::canonicalize("customer:101"), "customer:0000000101");
/// assert_eq!(coupon_types::canonicalize("couponRangeEndKey"), "couponRangeEndKey");
/// ```
pub fn canonicalize(key: &str) -> String {
    match decode(key) {
        Ok((kind, number)) => encode(kind, number),
        Err(_) => key.to_string(),
    }
}

/// A decoded record key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    kind: String,
    number: u64,
}

impl RecordKey {
    pub fn new(kind: impl Into<String>, number: u64) -> Self {
        Self {
            kind: kind.into(),
            number,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// The key one number further along the same range.
    pub fn successor(&self) -> Self {
        Self::new(self.kind.clone(), self.number.saturating_add(1))
    }

    /// The encoded ledger key.
    pub fn encoded(&self) -> String {
        encode(&self.kind, self.number)
    }
}

impl FromStr for RecordKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, number) = decode(s)?;
        Ok(Self::new(kind, number))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded())
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({})", self.encoded())
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded())
    }
}

impl<'de> Deserialize<'de> for RecordKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encode_pads_suffix() {
        assert_eq!(encode("coupon", 101), "coupon:0000000101");
        assert_eq!(encode("customer", 0), "customer:0000000000");
    }

    #[test]
    fn decode_accepts_unpadded_suffix() {
        assert_eq!(decode("customer:101").unwrap(), ("customer", 101));
    }

    #[test]
    fn canonicalize_pads_record_keys_only() {
        assert_eq!(canonicalize("customer:101"), "customer:0000000101");
        assert_eq!(canonicalize("customer:0000000101"), "customer:0000000101");
        assert_eq!(canonicalize("customerRangeStartKey"), "customerRangeStartKey");
        assert_eq!(canonicalize("coupon:1x"), "coupon:1x");
    }

    #[test]
    fn decode_splits_on_last_separator() {
        assert_eq!(decode("a:b:7").unwrap(), ("a:b", 7));
    }

    #[test]
    fn decode_rejects_bad_suffixes() {
        for key in ["coupon", "coupon:", "coupon:-1", "coupon:1x", ":5", "coupon:+3"] {
            let err = decode(key).unwrap_err();
            assert!(matches!(err, TypeError::MalformedKey { .. }), "{key}");
        }
    }

    #[test]
    fn padded_keys_sort_numerically_across_decades() {
        assert!(encode("coupon", 999) < encode("coupon", 1000));
        assert!(encode("coupon", 9) < encode("coupon", 10));
    }

    #[test]
    fn record_key_serializes_as_string() {
        let key = RecordKey::new("partner", 101);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"partner:0000000101\"");
        let parsed: RecordKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn successor_advances_number() {
        let key = RecordKey::new("coupon", 101);
        assert_eq!(key.successor().number(), 102);
        assert_eq!(key.successor().kind(), "coupon");
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(kind in "[a-zA-Z][a-zA-Z0-9_:]{0,15}", n in any::<u64>()) {
            let key = encode(&kind, n);
            let (decoded_kind, decoded_n) = decode(&key).unwrap();
            prop_assert_eq!(decoded_kind, kind.as_str());
            prop_assert_eq!(decoded_n, n);
        }

        #[test]
        fn order_is_numeric_within_width(a in 0u64..10_000_000_000, b in 0u64..10_000_000_000) {
            prop_assert_eq!(encode("t", a).cmp(&encode("t", b)), a.cmp(&b));
        }
    }
}
