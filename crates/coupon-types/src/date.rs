use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

const FORMAT: &str = "%d-%m-%Y";

/// Calendar date stored on records as a `dd-mm-yyyy` string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerDate(NaiveDate);

impl LedgerDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for LedgerDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl FromStr for LedgerDate {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), FORMAT)
            .map(Self)
            .map_err(|_| TypeError::MalformedDate {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for LedgerDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl fmt::Debug for LedgerDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerDate({self})")
    }
}

impl Serialize for LedgerDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LedgerDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_month_year() {
        let date: LedgerDate = "22-12-2019".parse().unwrap();
        assert_eq!(date, LedgerDate::from_ymd(2019, 12, 22).unwrap());
        assert_eq!(date.to_string(), "22-12-2019");
    }

    #[test]
    fn rejects_other_layouts() {
        for raw in ["2019-12-22", "32-01-2020", "12/22/2019", ""] {
            assert!(raw.parse::<LedgerDate>().is_err(), "{raw}");
        }
    }

    #[test]
    fn serde_uses_string_form() {
        let date = LedgerDate::from_ymd(2020, 1, 5).unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"05-01-2020\"");
        let bad = serde_json::from_str::<LedgerDate>("\"not-a-date\"");
        assert!(bad.is_err());
    }
}
