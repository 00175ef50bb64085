//! Coupon validation and redemption.
//!
//! A coupon is `ISSUED` when created and becomes `REDEEMED` exactly once,
//! when a partner redeems it and a sales transaction records the economics.

use std::sync::Arc;

use chrono::NaiveDate;
use coupon_ledger::LedgerStub;
use coupon_store::EntityStore;
use coupon_types::{
    Coupon, CouponStatus, EntityKind, LedgerDate, Partner, RecordKey, SalesTransaction, TypeError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{ContractError, ContractResult, During};
use crate::payload::record_key;

pub const VALID: &str = "valid";
pub const NOT_OWNED: &str = "coupon not owned by customer";
pub const INVALID_STATUS: &str = "invalid status";
pub const EXPIRED: &str = "coupon expired";

/// Outcome of a validity check. A negative verdict is a result, not an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_valid: bool,
    pub message: String,
}

impl Verdict {
    fn valid() -> Self {
        Self {
            is_valid: true,
            message: VALID.into(),
        }
    }

    fn rejected(message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

/// Amounts derived from one redemption.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settlement {
    pub sales_amount: f64,
    pub revenue_share_amount: f64,
    pub settlement_amount: f64,
}

impl Settlement {
    /// Negative results are not clamped.
    pub fn compute(original_price: f64, discount_amount: f64, revenue_share_percent: f64) -> Self {
        let sales_amount = original_price - discount_amount;
        let revenue_share_amount = original_price * revenue_share_percent / 100.0;
        Self {
            sales_amount,
            revenue_share_amount,
            settlement_amount: sales_amount - revenue_share_amount,
        }
    }
}

/// The coupon fields a validity check reads, with the expiry left raw.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Terms {
    customer_key: RecordKey,
    status: CouponStatus,
    expiry_date: String,
}

impl Terms {
    fn fetch<S: LedgerStub + ?Sized>(
        stub: &S,
        op: &'static str,
        coupon_key: &RecordKey,
    ) -> ContractResult<Self> {
        let key = coupon_key.encoded();
        if coupon_key.kind() != EntityKind::Coupon.tag() {
            return Err(ContractError::malformed(op, key, "not a coupon key"));
        }
        let bytes = EntityStore::get_raw(stub, &key).during(op)?;
        serde_json::from_slice(&bytes).map_err(|e| ContractError::malformed(op, key, e))
    }
}

/// Ownership, then status. `None` when both pass.
fn screen(owner: &RecordKey, status: CouponStatus, customer_key: &RecordKey) -> Option<Verdict> {
    if owner != customer_key {
        return Some(Verdict::rejected(NOT_OWNED));
    }
    if status != CouponStatus::Issued {
        return Some(Verdict::rejected(INVALID_STATUS));
    }
    None
}

pub struct CouponLifecycle {
    clock: Arc<dyn Clock>,
}

impl CouponLifecycle {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Check `coupon_key` on behalf of `customer_key`. Read-only.
    ///
    /// Both keys may be given padded or unpadded.
    pub fn validate<S: LedgerStub + ?Sized>(
        &self,
        stub: &S,
        coupon_key: &str,
        customer_key: &str,
    ) -> ContractResult<Verdict> {
        const OP: &str = "validateCoupon";
        let coupon_key = record_key(OP, "couponKey", coupon_key)?;
        let customer_key = record_key(OP, "customerKey", customer_key)?;
        let terms = Terms::fetch(stub, OP, &coupon_key)?;
        let verdict = self.judge(OP, &coupon_key, &terms, &customer_key)?;
        debug!(coupon = %coupon_key, customer = %customer_key, valid = verdict.is_valid, "coupon validated");
        Ok(verdict)
    }

    /// Ownership, then status, then expiry. The first failing check decides.
    pub fn evaluate(&self, coupon: &Coupon, customer_key: &RecordKey) -> Verdict {
        screen(&coupon.customer_key, coupon.status, customer_key)
            .unwrap_or_else(|| self.expiry_verdict(coupon.expiry_date))
    }

    /// [`evaluate`](Self::evaluate) over stored terms. The expiry is parsed
    /// only once ownership and status have passed.
    fn judge(
        &self,
        op: &'static str,
        coupon_key: &RecordKey,
        terms: &Terms,
        customer_key: &RecordKey,
    ) -> ContractResult<Verdict> {
        if let Some(verdict) = screen(&terms.customer_key, terms.status, customer_key) {
            return Ok(verdict);
        }
        let expiry: LedgerDate = terms
            .expiry_date
            .parse()
            .map_err(|e: TypeError| ContractError::malformed(op, coupon_key.encoded(), e))?;
        Ok(self.expiry_verdict(expiry))
    }

    fn expiry_verdict(&self, expiry: LedgerDate) -> Verdict {
        if self.clock.today() >= expiry.as_naive() {
            return Verdict::rejected(EXPIRED);
        }
        Verdict::valid()
    }

    /// Redeem a coupon at `partner_key` for an asset priced `original_price`.
    ///
    /// Writes one sales transaction and flips the coupon to `REDEEMED`.
    /// Nothing is written unless the coupon validates for its own customer.
    pub fn redeem<S: LedgerStub + ?Sized>(
        &self,
        stub: &mut S,
        coupon_key: &str,
        partner_key: &str,
        original_price: f64,
    ) -> ContractResult<SalesTransaction> {
        const OP: &str = "redeemCoupon";

        if !original_price.is_finite() {
            return Err(ContractError::malformed(OP, "assetOriginalPrice", "not a finite number"));
        }
        let coupon_key = record_key(OP, "couponKey", coupon_key)?;
        let partner_key = record_key(OP, "partnerKey", partner_key)?;
        let terms = Terms::fetch(&*stub, OP, &coupon_key)?;
        let partner: Partner = EntityStore::get(&*stub, &partner_key.encoded()).during(OP)?;

        let verdict = self.judge(OP, &coupon_key, &terms, &terms.customer_key)?;
        if !verdict.is_valid {
            return Err(ContractError::CouponRejected {
                op: OP,
                key: coupon_key.encoded(),
                message: verdict.message,
            });
        }
        let mut coupon: Coupon = EntityStore::get(&*stub, &coupon_key.encoded()).during(OP)?;

        let settlement = Settlement::compute(
            original_price,
            coupon.discount_amount,
            coupon.revenue_share_percent,
        );
        let sale = EntityStore::create_record(&mut *stub, |key| SalesTransaction {
            key,
            partner_key: partner.key.clone(),
            coupon_key: coupon.key.clone(),
            original_price,
            sales_amount: settlement.sales_amount,
            revenue_share_amount: settlement.revenue_share_amount,
            settlement_amount: settlement.settlement_amount,
        })
        .during(OP)?;

        coupon.mark_redeemed();
        EntityStore::update(&mut *stub, &coupon).during(OP)?;

        info!(
            coupon = %coupon.key,
            partner = %partner.key,
            sale = %sale.key,
            settlement = sale.settlement_amount,
            "coupon redeemed"
        );
        Ok(sale)
    }
}

#[cfg(test)]
mod tests {
    use coupon_ledger::{
        HistoryIter, InMemoryLedger, LedgerError, StateIter, Transaction, TxTimestamp,
    };
    use coupon_store::RangeIndex;
    use coupon_types::{Address, Customer};
    use proptest::prelude::*;

    use super::*;
    use crate::clock::FixedClock;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lifecycle_on(today: NaiveDate) -> CouponLifecycle {
        CouponLifecycle::new(Arc::new(FixedClock(today)))
    }

    /// Fresh ledger with one customer, one partner and one coupon
    /// (discount 10, share 20 %, expiring 31-12-2030).
    fn fixture() -> InMemoryLedger {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        for kind in EntityKind::ALL {
            RangeIndex::initialize(&mut tx, kind, 0).unwrap();
        }
        let customer = EntityStore::create_record(&mut tx, |key| Customer {
            key,
            name: "Arun".into(),
            email: "arun@gmail.com".into(),
        })
        .unwrap();
        let address = EntityStore::create_record(&mut tx, |key| Address {
            key,
            street: "1 Main St".into(),
            zip: "560001".into(),
            state: "KA".into(),
            country: "IN".into(),
        })
        .unwrap();
        EntityStore::create_record(&mut tx, |key| Partner {
            key,
            name: "Store".into(),
            address_key: address.key.clone(),
        })
        .unwrap();
        EntityStore::create_record(&mut tx, |key| Coupon {
            key,
            name: "Festival Offer".into(),
            created_date: LedgerDate::from_ymd(2024, 1, 1).unwrap(),
            expiry_date: LedgerDate::from_ymd(2030, 12, 31).unwrap(),
            discount_amount: 10.0,
            revenue_share_percent: 20.0,
            status: CouponStatus::Issued,
            customer_key: customer.key.clone(),
        })
        .unwrap();
        tx.commit().unwrap();
        ledger
    }

    const COUPON: &str = "coupon:0000000101";
    const CUSTOMER: &str = "customer:0000000101";
    const PARTNER: &str = "partner:0000000101";

    #[test]
    fn issued_coupon_validates_for_its_owner() {
        let ledger = fixture();
        let tx = ledger.begin().unwrap();
        let verdict = lifecycle_on(day(2025, 6, 1)).validate(&tx, COUPON, CUSTOMER).unwrap();
        assert_eq!(verdict, Verdict::valid());
    }

    #[test]
    fn ownership_is_checked_first() {
        let ledger = fixture();
        let tx = ledger.begin().unwrap();
        let verdict = lifecycle_on(day(2031, 1, 1))
            .validate(&tx, COUPON, "customer:0000000102")
            .unwrap();
        assert_eq!(verdict.message, NOT_OWNED);
    }

    #[test]
    fn expiry_day_itself_is_expired() {
        let ledger = fixture();
        let tx = ledger.begin().unwrap();
        let lifecycle = lifecycle_on(day(2030, 12, 31));
        let verdict = lifecycle.validate(&tx, COUPON, CUSTOMER).unwrap();
        assert_eq!(verdict, Verdict::rejected(EXPIRED));
        let day_before = lifecycle_on(day(2030, 12, 30));
        assert!(day_before.validate(&tx, COUPON, CUSTOMER).unwrap().is_valid);
    }

    #[test]
    fn missing_coupon_is_an_error_not_a_verdict() {
        let ledger = fixture();
        let tx = ledger.begin().unwrap();
        let err = lifecycle_on(day(2025, 1, 1))
            .validate(&tx, "coupon:0000000999", CUSTOMER)
            .unwrap_err();
        assert!(matches!(err, ContractError::NotFound { .. }));
    }

    #[test]
    fn unparsable_stored_expiry_is_malformed() {
        let ledger = fixture();
        let mut tx = ledger.begin().unwrap();
        let mut raw: serde_json::Value =
            serde_json::from_slice(&tx.get_state(COUPON).unwrap().unwrap()).unwrap();
        raw["expiryDate"] = "31/12/2030".into();
        tx.put_state(COUPON, serde_json::to_vec(&raw).unwrap()).unwrap();

        let err = lifecycle_on(day(2025, 1, 1))
            .validate(&tx, COUPON, CUSTOMER)
            .unwrap_err();
        assert!(matches!(err, ContractError::MalformedInput { .. }));
    }

    #[test]
    fn corrupt_expiry_does_not_mask_earlier_checks() {
        let ledger = fixture();
        let mut tx = ledger.begin().unwrap();
        let mut raw: serde_json::Value =
            serde_json::from_slice(&tx.get_state(COUPON).unwrap().unwrap()).unwrap();
        raw["expiryDate"] = "someday".into();
        tx.put_state(COUPON, serde_json::to_vec(&raw).unwrap()).unwrap();
        let lifecycle = lifecycle_on(day(2025, 1, 1));

        let verdict = lifecycle.validate(&tx, COUPON, "customer:0000000102").unwrap();
        assert_eq!(verdict, Verdict::rejected(NOT_OWNED));

        raw["status"] = "REDEEMED".into();
        tx.put_state(COUPON, serde_json::to_vec(&raw).unwrap()).unwrap();
        let verdict = lifecycle.validate(&tx, COUPON, CUSTOMER).unwrap();
        assert_eq!(verdict, Verdict::rejected(INVALID_STATUS));
    }

    #[test]
    fn unpadded_keys_name_the_same_records() {
        let ledger = fixture();
        let lifecycle = lifecycle_on(day(2025, 6, 1));
        let mut tx = ledger.begin().unwrap();
        let verdict = lifecycle.validate(&tx, "coupon:101", "customer:101").unwrap();
        assert_eq!(verdict, Verdict::valid());

        let sale = lifecycle.redeem(&mut tx, "coupon:101", "partner:101", 100.0).unwrap();
        assert_eq!(sale.coupon_key.encoded(), COUPON);
        assert_eq!(sale.partner_key.encoded(), PARTNER);
    }

    #[test]
    fn non_coupon_key_is_malformed() {
        let ledger = fixture();
        let tx = ledger.begin().unwrap();
        let err = lifecycle_on(day(2025, 6, 1))
            .validate(&tx, CUSTOMER, CUSTOMER)
            .unwrap_err();
        assert!(matches!(err, ContractError::MalformedInput { subject, .. } if subject == CUSTOMER));
    }

    #[test]
    fn redemption_records_settlement_and_flips_status() {
        let ledger = fixture();
        let lifecycle = lifecycle_on(day(2025, 6, 1));
        let mut tx = ledger.begin().unwrap();
        let sale = lifecycle.redeem(&mut tx, COUPON, PARTNER, 100.0).unwrap();
        tx.commit().unwrap();

        assert_eq!(sale.key.encoded(), "salesTransaction:0000000101");
        assert_eq!(sale.sales_amount, 90.0);
        assert_eq!(sale.revenue_share_amount, 20.0);
        assert_eq!(sale.settlement_amount, 70.0);

        let tx = ledger.begin().unwrap();
        let coupon: Coupon = EntityStore::get(&tx, COUPON).unwrap();
        assert_eq!(coupon.status, CouponStatus::Redeemed);
        let sales: Vec<SalesTransaction> = EntityStore::query_records(&tx).unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].coupon_key.encoded(), COUPON);

        let verdict = lifecycle.validate(&tx, COUPON, CUSTOMER).unwrap();
        assert_eq!(verdict, Verdict::rejected(INVALID_STATUS));
    }

    #[test]
    fn redeemed_coupon_cannot_be_redeemed_again() {
        let ledger = fixture();
        let lifecycle = lifecycle_on(day(2025, 6, 1));
        let mut tx = ledger.begin().unwrap();
        lifecycle.redeem(&mut tx, COUPON, PARTNER, 100.0).unwrap();
        let err = lifecycle.redeem(&mut tx, COUPON, PARTNER, 100.0).unwrap_err();
        assert!(matches!(err, ContractError::CouponRejected { message, .. } if message == INVALID_STATUS));
    }

    #[test]
    fn expired_coupon_is_not_redeemed() {
        let ledger = fixture();
        let mut tx = ledger.begin().unwrap();
        let err = lifecycle_on(day(2031, 1, 1))
            .redeem(&mut tx, COUPON, PARTNER, 100.0)
            .unwrap_err();
        assert!(matches!(err, ContractError::CouponRejected { message, .. } if message == EXPIRED));
        assert_eq!(tx.pending_writes(), 0);
    }

    #[test]
    fn missing_partner_fails_before_any_write() {
        let ledger = fixture();
        let mut tx = ledger.begin().unwrap();
        let err = lifecycle_on(day(2025, 6, 1))
            .redeem(&mut tx, COUPON, "partner:0000000999", 100.0)
            .unwrap_err();
        assert!(matches!(err, ContractError::NotFound { key, .. } if key == "partner:0000000999"));
        assert_eq!(tx.pending_writes(), 0);
    }

    /// Delegates to a transaction but refuses writes under one prefix.
    struct RefusingStub<'l> {
        inner: Transaction<'l>,
        refused: &'static str,
    }

    impl LedgerStub for RefusingStub<'_> {
        fn tx_id(&self) -> &str {
            self.inner.tx_id()
        }

        fn tx_timestamp(&self) -> TxTimestamp {
            self.inner.tx_timestamp()
        }

        fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
            self.inner.get_state(key)
        }

        fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
            if key.starts_with(self.refused) {
                return Err(LedgerError::io("put", key, "disk full"));
            }
            self.inner.put_state(key, value)
        }

        fn del_state(&mut self, key: &str) -> Result<(), LedgerError> {
            self.inner.del_state(key)
        }

        fn get_state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError> {
            self.inner.get_state_by_range(start, end)
        }

        fn get_history_for_key(&self, key: &str) -> Result<HistoryIter<'_>, LedgerError> {
            self.inner.get_history_for_key(key)
        }
    }

    #[test]
    fn failed_sale_write_leaves_coupon_issued() {
        let ledger = fixture();
        let mut stub = RefusingStub {
            inner: ledger.begin().unwrap(),
            refused: "salesTransaction:",
        };
        let err = lifecycle_on(day(2025, 6, 1))
            .redeem(&mut stub, COUPON, PARTNER, 100.0)
            .unwrap_err();
        assert!(matches!(err, ContractError::LedgerIo { .. }));

        let coupon: Coupon = EntityStore::get(&stub, COUPON).unwrap();
        assert_eq!(coupon.status, CouponStatus::Issued);
    }

    #[test]
    fn non_finite_price_is_malformed() {
        let ledger = fixture();
        let mut tx = ledger.begin().unwrap();
        let err = lifecycle_on(day(2025, 6, 1))
            .redeem(&mut tx, COUPON, PARTNER, f64::NAN)
            .unwrap_err();
        assert!(matches!(err, ContractError::MalformedInput { .. }));
    }

    proptest! {
        #[test]
        fn redeemed_coupons_never_validate(
            offset in -3650i64..3650,
            discount in 0.0f64..1000.0,
            share in 0.0f64..100.0,
        ) {
            let today = day(2025, 6, 1) + chrono::Duration::days(offset);
            let coupon = Coupon {
                key: EntityKind::Coupon.key(101),
                name: "any".into(),
                created_date: LedgerDate::from_ymd(2020, 1, 1).unwrap(),
                expiry_date: LedgerDate::from_ymd(2030, 1, 1).unwrap(),
                discount_amount: discount,
                revenue_share_percent: share,
                status: CouponStatus::Redeemed,
                customer_key: EntityKind::Customer.key(101),
            };
            let verdict = lifecycle_on(today).evaluate(&coupon, &EntityKind::Customer.key(101));
            prop_assert!(!verdict.is_valid);
        }

        #[test]
        fn settlement_splits_the_sale(price in 0.0f64..1e6, discount in 0.0f64..1e3, share in 0.0f64..100.0) {
            let s = Settlement::compute(price, discount, share);
            prop_assert!((s.sales_amount - s.revenue_share_amount - s.settlement_amount).abs() < 1e-6);
        }
    }
}
