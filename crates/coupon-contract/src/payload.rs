//! JSON payloads accepted by the create functions.

use coupon_types::{LedgerDate, RecordKey};
use serde::Deserialize;

use crate::error::{ContractError, ContractResult};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    pub name: String,
    /// Defaults to the contract's current day.
    #[serde(default)]
    pub created_date: Option<LedgerDate>,
    pub expiry_date: LedgerDate,
    pub discount_amount: f64,
    pub revenue_share_percent: f64,
    pub customer_key: RecordKey,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSalesTransaction {
    pub partner_key: RecordKey,
    pub coupon_key: RecordKey,
    pub original_price: f64,
    pub sales_amount: f64,
    pub revenue_share_amount: f64,
    pub settlement_amount: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub street: String,
    pub zip: String,
    pub state: String,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPartner {
    pub name: String,
    pub address: NewAddress,
}

/// Parse a JSON argument for `op`.
pub(crate) fn parse<T: serde::de::DeserializeOwned>(op: &'static str, raw: &str) -> ContractResult<T> {
    serde_json::from_str(raw).map_err(|e| ContractError::malformed(op, "payload", e))
}

/// Parse a positional key argument named `param`.
pub(crate) fn record_key(op: &'static str, param: &str, raw: &str) -> ContractResult<RecordKey> {
    raw.parse()
        .map_err(|e: coupon_types::TypeError| ContractError::malformed(op, param, e))
}

pub(crate) fn require_name(op: &'static str, field: &str, value: &str) -> ContractResult<()> {
    if value.trim().is_empty() {
        return Err(ContractError::malformed(op, field, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_finite(op: &'static str, amounts: &[(&str, f64)]) -> ContractResult<()> {
    match amounts.iter().find(|(_, v)| !v.is_finite()) {
        Some((field, _)) => Err(ContractError::malformed(op, *field, "not a finite number")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_payload_parses_dates_and_keys() {
        let coupon: NewCoupon = parse(
            "createCoupon",
            r#"{
                "name": "Festival Offer",
                "expiryDate": "22-12-2030",
                "discountAmount": 10.5,
                "revenueSharePercent": 5,
                "customerKey": "customer:0000000102"
            }"#,
        )
        .unwrap();
        assert_eq!(coupon.created_date, None);
        assert_eq!(coupon.customer_key.number(), 102);
        assert_eq!(coupon.expiry_date.to_string(), "22-12-2030");
    }

    #[test]
    fn bad_dates_are_malformed_input() {
        let err = parse::<NewCoupon>(
            "createCoupon",
            r#"{"name":"x","expiryDate":"2030-12-22","discountAmount":1,"revenueSharePercent":1,"customerKey":"customer:0000000101"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::MalformedInput { op: "createCoupon", .. }));
    }

    #[test]
    fn key_arguments_are_parsed_to_padded_form() {
        let key = record_key("validateCoupon", "customerKey", "customer:101").unwrap();
        assert_eq!(key.encoded(), "customer:0000000101");
        let err = record_key("validateCoupon", "customerKey", "Arun").unwrap_err();
        assert!(matches!(err, ContractError::MalformedInput { subject, .. } if subject == "customerKey"));
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(require_name("createCustomer", "name", "  ").is_err());
        assert!(require_name("createCustomer", "name", "Arun").is_ok());
    }
}
