use std::sync::Arc;

use coupon_types::LedgerDate;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, FixedClock, SystemClock};

/// Configuration for the coupon contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Whether `initLedger` inserts the sample customers, address and
    /// partner. When `false` only the range pointers are written.
    pub seed_on_init: bool,
    /// Fixed `dd-mm-yyyy` day used for expiry checks instead of the
    /// system clock.
    pub today: Option<LedgerDate>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            seed_on_init: true,
            today: None,
        }
    }
}

impl ContractConfig {
    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.today {
            Some(day) => Arc::new(FixedClock(day.as_naive())),
            None => Arc::new(SystemClock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_day_overrides_system_clock() {
        let config: ContractConfig = serde_json::from_str(r#"{"today":"01-03-2024"}"#).unwrap();
        assert!(config.seed_on_init);
        assert_eq!(
            config.clock().today(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn bad_fixed_day_is_rejected() {
        let parsed = serde_json::from_str::<ContractConfig>(r#"{"today":"2024-03-01"}"#);
        assert!(parsed.is_err());
    }
}
