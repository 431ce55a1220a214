//! Pagination and sort parameters for list queries, plus the derived
//! page metadata returned alongside results.

use serde::{Deserialize, Serialize};

use crate::validator::{permitted_value, Validator};

pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl From<SortDirection> for sea_orm::Order {
    fn from(value: SortDirection) -> Self {
        match value {
            SortDirection::Asc => sea_orm::Order::Asc,
            SortDirection::Desc => sea_orm::Order::Desc,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    /// Column name, optionally prefixed with `-` for descending order.
    pub sort: String,
    pub sort_safelist: &'static [&'static str],
}

impl Filters {
    /// Column named by `sort`, without the descending marker.
    ///
    /// # Panics
    ///
    /// Panics when `sort` is not in the safelist. Callers run
    /// [`validate_filters`] first, so reaching this is a programming error.
    pub fn sort_column(&self) -> &str {
        assert!(
            permitted_value(self.sort.as_str(), self.sort_safelist),
            "unsafe sort parameter: {}",
            self.sort
        );
        self.sort.strip_prefix('-').unwrap_or(&self.sort)
    }

    pub fn sort_direction(&self) -> SortDirection {
        if self.sort.starts_with('-') { SortDirection::Desc } else { SortDirection::Asc }
    }

    pub fn limit(&self) -> u64 {
        self.page_size.max(0) as u64
    }

    pub fn offset(&self) -> u64 {
        ((self.page - 1) * self.page_size).max(0) as u64
    }
}

pub fn validate_filters(v: &mut Validator, f: &Filters) {
    v.check(f.page > 0, "page", "must be greater than zero");
    v.check(f.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
    v.check(f.page_size > 0, "page_size", "must be greater than zero");
    v.check(f.page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");

    v.check(permitted_value(f.sort.as_str(), f.sort_safelist), "sort", "invalid sort value");
}

/// Pagination summary; zero fields are left out of the JSON body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

pub fn calculate_metadata(total_records: i64, page: i64, page_size: i64) -> Metadata {
    if total_records == 0 || page_size <= 0 {
        return Metadata::default();
    }

    Metadata {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: (total_records + page_size - 1) / page_size,
        total_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAFELIST: &[&str] = &["id", "price", "-id", "-price"];

    fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
        Filters { page, page_size, sort: sort.to_string(), sort_safelist: SAFELIST }
    }

    #[test]
    fn valid_filters_pass() {
        let mut v = Validator::new();
        validate_filters(&mut v, &filters(1, 20, "-price"));
        assert!(v.is_valid());
    }

    #[test]
    fn violations_accumulate() {
        let mut v = Validator::new();
        validate_filters(&mut v, &filters(0, 101, "dropped_column"));
        let errs = v.into_errors();
        assert_eq!(errs.len(), 3);
        assert_eq!(errs["page"], "must be greater than zero");
        assert_eq!(errs["page_size"], "must be a maximum of 100");
        assert_eq!(errs["sort"], "invalid sort value");
    }

    #[test]
    fn page_upper_bound() {
        let mut v = Validator::new();
        validate_filters(&mut v, &filters(MAX_PAGE + 1, 0, "id"));
        assert_eq!(v.errors()["page"], "must be a maximum of 10 million");
        assert_eq!(v.errors()["page_size"], "must be greater than zero");
    }

    #[test]
    fn sort_column_and_direction() {
        let f = filters(1, 10, "-price");
        assert_eq!(f.sort_column(), "price");
        assert_eq!(f.sort_direction(), SortDirection::Desc);

        let f = filters(1, 10, "id");
        assert_eq!(f.sort_column(), "id");
        assert_eq!(f.sort_direction(), SortDirection::Asc);
    }

    #[test]
    #[should_panic(expected = "unsafe sort parameter")]
    fn sort_column_outside_safelist_panics() {
        filters(1, 10, "-year").sort_column();
    }

    #[test]
    fn limit_and_offset() {
        let f = filters(3, 25, "id");
        assert_eq!(f.limit(), 25);
        assert_eq!(f.offset(), 50);
        assert_eq!(filters(1, 25, "id").offset(), 0);
    }

    #[test]
    fn metadata_for_empty_result_is_zero() {
        assert_eq!(calculate_metadata(0, 4, 20), Metadata::default());
        assert_eq!(serde_json::to_value(Metadata::default()).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn metadata_rounds_last_page_up() {
        assert_eq!(
            calculate_metadata(95, 2, 20),
            Metadata { current_page: 2, page_size: 20, first_page: 1, last_page: 5, total_records: 95 }
        );
        assert_eq!(calculate_metadata(100, 1, 20).last_page, 5);
        assert_eq!(calculate_metadata(1, 1, 100).last_page, 1);
    }
}
