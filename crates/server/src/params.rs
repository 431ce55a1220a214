//! Query-string readers. A missing or empty parameter reads as `None`; a
//! malformed one records a field error and also reads as `None`.
//!
//! Clients may also spell "no filter" as `price=-1`, the nil UUID or the
//! zero month `01-0001`; the `*_filter` helpers fold those into `None`.

use std::collections::HashMap;
use std::str::FromStr;

use models::validator::Validator;
use models::MonthDate;
use uuid::Uuid;

pub const ANY_PRICE: i32 = -1;

pub fn price_filter(price: Option<i32>) -> Option<i32> {
    price.filter(|&p| p != ANY_PRICE)
}

pub fn uuid_filter(id: Option<Uuid>) -> Option<Uuid> {
    id.filter(|u| !u.is_nil())
}

pub fn date_filter(date: Option<MonthDate>) -> Option<MonthDate> {
    date.filter(|d| !(d.year() == 1 && d.month() == 1))
}

#[derive(Debug, Default, Clone)]
pub struct QueryParams(HashMap<String, String>);

impl From<HashMap<String, String>> for QueryParams {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl QueryParams {
    fn raw(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|s| !s.is_empty())
    }

    pub fn read_string(&self, key: &str) -> Option<String> {
        self.raw(key).map(str::to_string)
    }

    pub fn read_int<T: FromStr>(&self, key: &str, v: &mut Validator) -> Option<T> {
        let s = self.raw(key)?;
        match s.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                v.add_error(key, "must be an integer");
                None
            }
        }
    }

    pub fn read_uuid(&self, key: &str, v: &mut Validator) -> Option<Uuid> {
        let s = self.raw(key)?;
        match Uuid::parse_str(s) {
            Ok(u) => Some(u),
            Err(_) => {
                v.add_error(key, "must be a valid UUID");
                None
            }
        }
    }

    /// Accepts `MM-YYYY`, optionally wrapped in double quotes.
    pub fn read_date(&self, key: &str, v: &mut Validator) -> Option<MonthDate> {
        let s = self.raw(key)?;
        match MonthDate::parse(s.trim_matches('"')) {
            Ok(d) => Some(d),
            Err(_) => {
                v.add_error(key, "must be a valid date");
                None
            }
        }
    }
}
