use std::fmt;
use std::str::FromStr;

use coupon_ledger::{InMemoryLedger, LedgerStub, Transaction, TxReceipt};
use coupon_store::EntityStore;
use coupon_types::{
    canonicalize, Address, Coupon, CouponStatus, Customer, EntityKind, LedgerDate, Partner,
    RecordKey, SalesTransaction,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ContractConfig;
use crate::error::{ContractError, ContractResult, During};
use crate::lifecycle::CouponLifecycle;
use crate::payload::{
    parse, record_key, require_finite, require_name, NewCoupon, NewCustomer, NewPartner,
    NewSalesTransaction,
};
use crate::seed;

/// Every function routable through [`Contract::invoke`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    InitLedger,
    CreateCoupon,
    CreateSalesTransaction,
    CreateCustomer,
    CreatePartner,
    QueryByKey,
    QueryByRange,
    ValidateCoupon,
    RedeemCoupon,
    DeleteRecord,
    QueryHistoryByKey,
    QueryCouponsByCustomer,
}

impl Function {
    pub const ALL: [Function; 12] = [
        Self::InitLedger,
        Self::CreateCoupon,
        Self::CreateSalesTransaction,
        Self::CreateCustomer,
        Self::CreatePartner,
        Self::QueryByKey,
        Self::QueryByRange,
        Self::ValidateCoupon,
        Self::RedeemCoupon,
        Self::DeleteRecord,
        Self::QueryHistoryByKey,
        Self::QueryCouponsByCustomer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::InitLedger => "initLedger",
            Self::CreateCoupon => "createCoupon",
            Self::CreateSalesTransaction => "createSalesTransaction",
            Self::CreateCustomer => "createCustomer",
            Self::CreatePartner => "createPartner",
            Self::QueryByKey => "queryByKey",
            Self::QueryByRange => "queryByRange",
            Self::ValidateCoupon => "validateCoupon",
            Self::RedeemCoupon => "redeemCoupon",
            Self::DeleteRecord => "deleteRecord",
            Self::QueryHistoryByKey => "queryHistoryByKey",
            Self::QueryCouponsByCustomer => "queryCouponsByCustomer",
        }
    }

    /// Positional argument names, in order.
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            Self::InitLedger => &[],
            Self::CreateCoupon
            | Self::CreateSalesTransaction
            | Self::CreateCustomer
            | Self::CreatePartner => &["payload"],
            Self::QueryByKey | Self::DeleteRecord | Self::QueryHistoryByKey => &["key"],
            Self::QueryByRange => &["recordType"],
            Self::ValidateCoupon => &["couponKey", "customerKey"],
            Self::RedeemCoupon => &["assetOriginalPrice", "couponKey", "partnerKey"],
            Self::QueryCouponsByCustomer => &["customerKey"],
        }
    }

    /// Read-only functions never stage writes.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::QueryByKey
                | Self::QueryByRange
                | Self::ValidateCoupon
                | Self::QueryHistoryByKey
                | Self::QueryCouponsByCustomer
        )
    }
}

impl FromStr for Function {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| ContractError::UnknownFunction(s.to_string()))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of `redeemCoupon`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub coupon_key: RecordKey,
    pub sales_transaction_key: RecordKey,
}

/// A committed invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub payload: Vec<u8>,
    pub receipt: TxReceipt,
}

/// The coupon contract: routes named functions to store and lifecycle
/// operations inside one host transaction.
pub struct Contract {
    config: ContractConfig,
    lifecycle: CouponLifecycle,
}

impl Contract {
    pub fn new(config: ContractConfig) -> Self {
        let lifecycle = CouponLifecycle::new(config.clock());
        Self { config, lifecycle }
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &CouponLifecycle {
        &self.lifecycle
    }

    /// Run `function` against an open transaction.
    ///
    /// Writes are staged on `stub`; the caller commits or discards them.
    pub fn invoke<S: LedgerStub + ?Sized>(
        &self,
        stub: &mut S,
        function: &str,
        args: &[String],
    ) -> ContractResult<Vec<u8>> {
        let function: Function = function.parse()?;
        let op = function.name();
        let params = function.params();
        if args.len() != params.len() {
            return Err(ContractError::malformed(
                op,
                "arguments",
                format!(
                    "expected {} ({}), got {}",
                    params.len(),
                    params.join(", "),
                    args.len()
                ),
            ));
        }
        debug!(function = op, tx = stub.tx_id(), "invoking");

        match function {
            Function::InitLedger => {
                self.init_ledger(stub)?;
                Ok(Vec::new())
            }
            Function::CreateCoupon => key_bytes(self.create_coupon(stub, &args[0])?),
            Function::CreateSalesTransaction => {
                key_bytes(self.create_sales_transaction(stub, &args[0])?)
            }
            Function::CreateCustomer => key_bytes(self.create_customer(stub, &args[0])?),
            Function::CreatePartner => key_bytes(self.create_partner(stub, &args[0])?),
            Function::QueryByKey => {
                EntityStore::get_raw(&*stub, &canonicalize(&args[0])).during(op)
            }
            Function::QueryByRange => {
                let kind: EntityKind = args[0].parse().map_err(|_| {
                    ContractError::InvalidEntityType {
                        op,
                        kind: args[0].clone(),
                    }
                })?;
                json(op, &EntityStore::query_by_range(&*stub, kind).during(op)?)
            }
            Function::ValidateCoupon => {
                json(op, &self.lifecycle.validate(&*stub, &args[0], &args[1])?)
            }
            Function::RedeemCoupon => {
                let price = parse_price(op, &args[0])?;
                let sale = self.lifecycle.redeem(stub, &args[1], &args[2], price)?;
                json(
                    op,
                    &Redemption {
                        coupon_key: sale.coupon_key,
                        sales_transaction_key: sale.key,
                    },
                )
            }
            Function::DeleteRecord => {
                json(op, &EntityStore::delete(stub, &canonicalize(&args[0])).during(op)?)
            }
            Function::QueryHistoryByKey => {
                let key = canonicalize(&args[0]);
                json(op, &EntityStore::query_history(&*stub, &key).during(op)?)
            }
            Function::QueryCouponsByCustomer => {
                json(op, &self.coupons_by_customer(&*stub, &args[0])?)
            }
        }
    }

    /// Run `function` in a fresh transaction on `ledger` and commit it if the
    /// invocation succeeds. Failed invocations leave the ledger untouched.
    pub fn submit(
        &self,
        ledger: &InMemoryLedger,
        function: &str,
        args: &[String],
    ) -> ContractResult<Submission> {
        let tx = ledger.begin().during(submit_op(function))?;
        self.submit_in(tx, function, args)
    }

    /// [`submit`](Self::submit) on a transaction the caller already began.
    ///
    /// The transaction reads the snapshot taken when it began; a concurrent
    /// commit that touched its reads makes the commit fail with
    /// [`ContractError::TransactionRejected`].
    pub fn submit_in(
        &self,
        mut tx: Transaction<'_>,
        function: &str,
        args: &[String],
    ) -> ContractResult<Submission> {
        let op = submit_op(function);
        let payload = match self.invoke(&mut tx, function, args) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(function, error = %err, "invocation failed; transaction discarded");
                return Err(err);
            }
        };
        let receipt = tx.commit().during(op)?;
        info!(function, height = receipt.height, writes = receipt.writes, "transaction committed");
        Ok(Submission { payload, receipt })
    }

    /// Initialize a fresh ledger: range pointers, plus the sample data when
    /// `seed_on_init` is set.
    pub fn init(&self, ledger: &InMemoryLedger) -> ContractResult<TxReceipt> {
        self.submit(ledger, Function::InitLedger.name(), &[])
            .map(|submission| submission.receipt)
    }

    fn init_ledger<S: LedgerStub + ?Sized>(&self, stub: &mut S) -> ContractResult<()> {
        const OP: &str = "initLedger";
        if seed::is_initialized(&*stub).during(OP)? {
            return Err(ContractError::AlreadyInitialized { op: OP });
        }
        seed::seed(stub, self.config.seed_on_init).during(OP)?;
        Ok(())
    }

    fn create_coupon<S: LedgerStub + ?Sized>(
        &self,
        stub: &mut S,
        raw: &str,
    ) -> ContractResult<RecordKey> {
        const OP: &str = "createCoupon";
        let new: NewCoupon = parse(OP, raw)?;
        require_name(OP, "name", &new.name)?;
        require_finite(
            OP,
            &[
                ("discountAmount", new.discount_amount),
                ("revenueSharePercent", new.revenue_share_percent),
            ],
        )?;
        let customer: Customer = EntityStore::get(&*stub, &new.customer_key.encoded()).during(OP)?;
        let created_date = new
            .created_date
            .unwrap_or_else(|| LedgerDate::new(self.lifecycle.today()));

        let coupon = EntityStore::create_record(stub, |key| Coupon {
            key,
            name: new.name,
            created_date,
            expiry_date: new.expiry_date,
            discount_amount: new.discount_amount,
            revenue_share_percent: new.revenue_share_percent,
            status: CouponStatus::Issued,
            customer_key: customer.key,
        })
        .during(OP)?;
        info!(key = %coupon.key, customer = %coupon.customer_key, "coupon issued");
        Ok(coupon.key)
    }

    fn create_sales_transaction<S: LedgerStub + ?Sized>(
        &self,
        stub: &mut S,
        raw: &str,
    ) -> ContractResult<RecordKey> {
        const OP: &str = "createSalesTransaction";
        let new: NewSalesTransaction = parse(OP, raw)?;
        require_finite(
            OP,
            &[
                ("originalPrice", new.original_price),
                ("salesAmount", new.sales_amount),
                ("revenueShareAmount", new.revenue_share_amount),
                ("settlementAmount", new.settlement_amount),
            ],
        )?;
        let coupon: Coupon = EntityStore::get(&*stub, &new.coupon_key.encoded()).during(OP)?;
        let partner: Partner = EntityStore::get(&*stub, &new.partner_key.encoded()).during(OP)?;

        let sale = EntityStore::create_record(stub, |key| SalesTransaction {
            key,
            partner_key: partner.key,
            coupon_key: coupon.key,
            original_price: new.original_price,
            sales_amount: new.sales_amount,
            revenue_share_amount: new.revenue_share_amount,
            settlement_amount: new.settlement_amount,
        })
        .during(OP)?;
        Ok(sale.key)
    }

    fn create_customer<S: LedgerStub + ?Sized>(
        &self,
        stub: &mut S,
        raw: &str,
    ) -> ContractResult<RecordKey> {
        const OP: &str = "createCustomer";
        let new: NewCustomer = parse(OP, raw)?;
        require_name(OP, "name", &new.name)?;
        let customer = EntityStore::create_record(stub, |key| Customer {
            key,
            name: new.name,
            email: new.email,
        })
        .during(OP)?;
        Ok(customer.key)
    }

    /// Creates the address first, then the partner pointing at it.
    fn create_partner<S: LedgerStub + ?Sized>(
        &self,
        stub: &mut S,
        raw: &str,
    ) -> ContractResult<RecordKey> {
        const OP: &str = "createPartner";
        let new: NewPartner = parse(OP, raw)?;
        require_name(OP, "name", &new.name)?;
        let address = EntityStore::create_record(&mut *stub, |key| Address {
            key,
            street: new.address.street,
            zip: new.address.zip,
            state: new.address.state,
            country: new.address.country,
        })
        .during(OP)?;
        let partner = EntityStore::create_record(stub, |key| Partner {
            key,
            name: new.name,
            address_key: address.key,
        })
        .during(OP)?;
        Ok(partner.key)
    }

    fn coupons_by_customer<S: LedgerStub + ?Sized>(
        &self,
        stub: &S,
        customer_key: &str,
    ) -> ContractResult<Vec<Coupon>> {
        const OP: &str = "queryCouponsByCustomer";
        let customer_key = record_key(OP, "customerKey", customer_key)?;
        let customer: Customer = EntityStore::get(stub, &customer_key.encoded()).during(OP)?;
        let coupons: Vec<Coupon> = EntityStore::query_records(stub).during(OP)?;
        Ok(coupons
            .into_iter()
            .filter(|coupon| coupon.customer_key == customer.key)
            .collect())
    }
}

impl Default for Contract {
    fn default() -> Self {
        Self::new(ContractConfig::default())
    }
}

fn submit_op(function: &str) -> &'static str {
    function
        .parse::<Function>()
        .map(|f| f.name())
        .unwrap_or("submit")
}

fn key_bytes(key: RecordKey) -> ContractResult<Vec<u8>> {
    Ok(key.encoded().into_bytes())
}

fn json<T: Serialize>(op: &'static str, value: &T) -> ContractResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ContractError::malformed(op, "result", e))
}

fn parse_price(op: &'static str, raw: &str) -> ContractResult<f64> {
    let price: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ContractError::malformed(op, "assetOriginalPrice", e))?;
    if !price.is_finite() {
        return Err(ContractError::malformed(op, "assetOriginalPrice", "not a finite number"));
    }
    Ok(price)
}
