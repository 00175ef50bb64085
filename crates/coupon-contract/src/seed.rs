//! Sample data written by `initLedger`.

use coupon_ledger::LedgerStub;
use coupon_store::{EntityStore, RangeIndex, StoreResult};
use coupon_types::{Address, Customer, EntityKind, Partner};
use tracing::info;

const CUSTOMERS: [(&str, &str); 6] = [
    ("Arun", "arun@gmail.com"),
    ("Asha", "asha@gmail.com"),
    ("Varun", "varun@gmail.com"),
    ("Ramu", "ramu@gmail.com"),
    ("Shyam", "shyam@gmail.com"),
    ("Asha", "asha@gmail.com"),
];

/// Counts of what [`seed`] wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Seeded {
    pub customers: usize,
    pub addresses: usize,
    pub partners: usize,
}

/// Returns `true` once any range pointer exists.
pub fn is_initialized<S: LedgerStub + ?Sized>(stub: &S) -> StoreResult<bool> {
    for kind in EntityKind::ALL {
        if stub.get_state(&kind.end_pointer_key())?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Write empty ranges for every entity type, then the sample records when
/// `with_samples` is set. Customers end up at 101..=106 and the address and
/// partner at 101; coupons and sales transactions stay empty.
pub fn seed<S: LedgerStub + ?Sized>(stub: &mut S, with_samples: bool) -> StoreResult<Seeded> {
    for kind in EntityKind::ALL {
        RangeIndex::initialize(&mut *stub, kind, 0)?;
    }
    if !with_samples {
        info!("ranges initialized without sample data");
        return Ok(Seeded::default());
    }

    for (name, email) in CUSTOMERS {
        EntityStore::create_record(&mut *stub, |key| Customer {
            key,
            name: name.into(),
            email: email.into(),
        })?;
    }
    let address = EntityStore::create_record(&mut *stub, |key| Address {
        key,
        street: "14 Brigade Road".into(),
        zip: "560025".into(),
        state: "Karnataka".into(),
        country: "India".into(),
    })?;
    EntityStore::create_record(&mut *stub, |key| Partner {
        key,
        name: "City Mart".into(),
        address_key: address.key.clone(),
    })?;

    let seeded = Seeded {
        customers: CUSTOMERS.len(),
        addresses: 1,
        partners: 1,
    };
    info!(customers = seeded.customers, partners = seeded.partners, "ledger seeded");
    Ok(seeded)
}
