use chrono::{DateTime, Utc};
use models::validator::Validator;
use models::MonthDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sort tokens accepted by the list operation.
pub const SORT_SAFELIST: &[&str] = &[
    "id", "service_name", "price", "start_date",
    "-id", "-service_name", "-price", "-start_date",
];
pub const DEFAULT_SORT: &str = "id";
pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

const MAX_SERVICE_NAME_BYTES: usize = 500;

/// Subscription record (business view).
///
/// `price` and `start_date` are optional only so that incomplete input can be
/// represented and rejected by [`validate_subscription`]; stored records
/// always carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub service_name: String,
    pub price: Option<i32>,
    pub user_id: Uuid,
    pub start_date: Option<MonthDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<MonthDate>,
    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
    pub version: i32,
}

impl From<models::subscription::Model> for Subscription {
    fn from(m: models::subscription::Model) -> Self {
        Self {
            id: m.id,
            service_name: m.service_name,
            price: Some(m.price),
            user_id: m.user_id,
            start_date: Some(MonthDate::from_date(m.start_date)),
            end_date: m.end_date.map(MonthDate::from_date),
            created_at: Some(m.created_at.with_timezone(&Utc)),
            version: m.version,
        }
    }
}

/// Creation input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSubscriptionInput {
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub price: Option<i32>,
    #[serde(default)]
    pub user_id: Uuid,
    #[serde(default)]
    pub start_date: Option<MonthDate>,
    #[serde(default)]
    pub end_date: Option<MonthDate>,
}

impl From<CreateSubscriptionInput> for Subscription {
    fn from(input: CreateSubscriptionInput) -> Self {
        Self {
            id: 0,
            service_name: input.service_name,
            price: input.price,
            user_id: input.user_id,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: None,
            version: 0,
        }
    }
}

/// Partial update: only present fields override the stored record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubscriptionInput {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub price: Option<i32>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub start_date: Option<MonthDate>,
    #[serde(default)]
    pub end_date: Option<MonthDate>,
}

impl UpdateSubscriptionInput {
    pub fn apply_to(self, s: &mut Subscription) {
        if let Some(service_name) = self.service_name {
            s.service_name = service_name;
        }
        if let Some(price) = self.price {
            s.price = Some(price);
        }
        if let Some(user_id) = self.user_id {
            s.user_id = user_id;
        }
        if let Some(start_date) = self.start_date {
            s.start_date = Some(start_date);
        }
        if let Some(end_date) = self.end_date {
            s.end_date = Some(end_date);
        }
    }
}

pub fn validate_subscription(v: &mut Validator, s: &Subscription) {
    v.check(!s.service_name.is_empty(), "service_name", "must be provided");
    v.check(s.service_name.len() <= MAX_SERVICE_NAME_BYTES, "service_name", "must not be more than 500 bytes long");

    v.check(s.price.is_some(), "price", "must be provided");
    if let Some(price) = s.price {
        v.check(price >= 0, "price", "must be a positive integer");
    }

    v.check(!s.user_id.is_nil(), "user_id", "must not be empty");

    v.check(s.start_date.is_some(), "start_date", "must be provided");
    if let (Some(start), Some(end)) = (s.start_date, s.end_date) {
        v.check(start <= end, "start_date", "must be before end_date");
    }
}

/// List predicates; `None` leaves the field unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionFilter {
    /// Word-level match against the service name.
    pub service_name: Option<String>,
    pub price: Option<i32>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<MonthDate>,
}

/// Price-sum predicates. `from`/`to` bound `start_date` inclusively;
/// a missing bound leaves that side open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSumQuery {
    pub user_id: Option<Uuid>,
    /// Exact service name.
    pub service_name: Option<String>,
    pub from: Option<MonthDate>,
    pub to: Option<MonthDate>,
}

impl PriceSumQuery {
    pub fn validate(&self, v: &mut Validator) {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            v.check(from <= to, "start_date", "must be before end_date");
        }
    }
}
