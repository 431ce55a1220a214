use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use models::filters::{calculate_metadata, Filters, Metadata};
use models::subscription::{self, Column};
use models::validator::Validator;
use models::MonthDate;
use sea_orm::prelude::{Date, DateTimeWithTimeZone, Uuid};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, warn};

use crate::subscription::domain::{PriceSumQuery, Subscription, SubscriptionFilter};
use crate::subscription::errors::SubscriptionError;
use crate::subscription::repository::SubscriptionRepository;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Postgres-backed repository. Every statement is bounded by `query_timeout`;
/// a timed-out statement is cancelled and reported as `Timeout`.
pub struct SeaOrmSubscriptionRepository {
    pub db: DatabaseConnection,
    query_timeout: Duration,
}

impl SeaOrmSubscriptionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, query_timeout: DEFAULT_QUERY_TIMEOUT }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, SubscriptionError>
    where
        F: Future<Output = Result<T, DbErr>> + Send,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "subscription store operation failed");
                Err(SubscriptionError::from(e))
            }
            Err(_) => {
                warn!(op, timeout_ms = self.query_timeout.as_millis() as u64, "subscription store operation timed out");
                Err(SubscriptionError::Timeout)
            }
        }
    }
}

/// Columns the table declares NOT NULL but the record keeps optional.
fn required_fields(s: &Subscription) -> Result<(i32, MonthDate), SubscriptionError> {
    let mut v = Validator::new();
    v.check(s.price.is_some(), "price", "must be provided");
    v.check(s.start_date.is_some(), "start_date", "must be provided");
    match (s.price, s.start_date) {
        (Some(price), Some(start)) => Ok((price, start)),
        _ => Err(SubscriptionError::Validation(v.into_errors())),
    }
}

/// Row plus the `COUNT(*) OVER ()` window total.
#[derive(Debug, FromQueryResult)]
struct CountedRow {
    total_records: i64,
    id: i64,
    service_name: String,
    price: i32,
    user_id: Uuid,
    start_date: Date,
    end_date: Option<Date>,
    created_at: DateTimeWithTimeZone,
    version: i32,
}

impl From<CountedRow> for Subscription {
    fn from(r: CountedRow) -> Self {
        subscription::Model {
            id: r.id,
            service_name: r.service_name,
            price: r.price,
            user_id: r.user_id,
            start_date: r.start_date,
            end_date: r.end_date,
            created_at: r.created_at,
            version: r.version,
        }
        .into()
    }
}

fn list_condition(f: &SubscriptionFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(name) = &f.service_name {
        cond = cond.add(Expr::cust_with_values(
            "to_tsvector('simple', service_name) @@ plainto_tsquery('simple', ?)",
            [name.clone()],
        ));
    }
    if let Some(price) = f.price {
        cond = cond.add(Column::Price.eq(price));
    }
    if let Some(user_id) = f.user_id {
        cond = cond.add(Column::UserId.eq(user_id));
    }
    if let Some(start) = f.start_date {
        cond = cond.add(Column::StartDate.eq(start.first_day()));
    }
    cond
}

fn sum_condition(q: &PriceSumQuery) -> Condition {
    let mut cond = Condition::all();
    if let Some(from) = q.from {
        cond = cond.add(Column::StartDate.gte(from.first_day()));
    }
    if let Some(to) = q.to {
        cond = cond.add(Column::StartDate.lte(to.first_day()));
    }
    if let Some(name) = &q.service_name {
        cond = cond.add(Column::ServiceName.eq(name.clone()));
    }
    if let Some(user_id) = q.user_id {
        cond = cond.add(Column::UserId.eq(user_id));
    }
    cond
}

#[async_trait]
impl SubscriptionRepository for SeaOrmSubscriptionRepository {
    async fn insert(&self, s: &mut Subscription) -> Result<(), SubscriptionError> {
        let (price, start) = required_fields(s)?;
        let am = subscription::ActiveModel {
            id: NotSet,
            service_name: Set(s.service_name.clone()),
            price: Set(price),
            user_id: Set(s.user_id),
            start_date: Set(start.first_day()),
            end_date: Set(s.end_date.map(MonthDate::first_day)),
            created_at: NotSet,
            version: NotSet,
        };
        let created = self.bounded("insert", am.insert(&self.db)).await?;
        s.id = created.id;
        s.created_at = Some(created.created_at.with_timezone(&Utc));
        s.version = created.version;
        debug!(id = s.id, "subscription inserted");
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Subscription, SubscriptionError> {
        if id < 1 {
            return Err(SubscriptionError::NotFound);
        }
        self.bounded("get", subscription::Entity::find_by_id(id).one(&self.db))
            .await?
            .map(Subscription::from)
            .ok_or(SubscriptionError::NotFound)
    }

    async fn update(&self, s: &mut Subscription) -> Result<(), SubscriptionError> {
        let (price, start) = required_fields(s)?;
        let stmt = subscription::Entity::update_many()
            .col_expr(Column::ServiceName, Expr::value(s.service_name.clone()))
            .col_expr(Column::Price, Expr::value(price))
            .col_expr(Column::UserId, Expr::value(s.user_id))
            .col_expr(Column::StartDate, Expr::value(start.first_day()))
            .col_expr(Column::EndDate, Expr::value(s.end_date.map(MonthDate::first_day)))
            .col_expr(Column::Version, Expr::col(Column::Version).add(1))
            .filter(Column::Id.eq(s.id))
            .filter(Column::Version.eq(s.version));

        let res = self.bounded("update", stmt.exec(&self.db)).await?;
        if res.rows_affected == 0 {
            return Err(SubscriptionError::EditConflict);
        }
        s.version += 1;
        debug!(id = s.id, version = s.version, "subscription updated");
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), SubscriptionError> {
        let res = self.bounded("delete", subscription::Entity::delete_by_id(id).exec(&self.db)).await?;
        if res.rows_affected == 0 {
            return Err(SubscriptionError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, filter: &SubscriptionFilter, filters: &Filters) -> Result<(Vec<Subscription>, Metadata), SubscriptionError> {
        let sort_column = Column::from_str(filters.sort_column())
            .map_err(|_| SubscriptionError::Store(format!("sort column {} has no table column", filters.sort_column())))?;

        let query = subscription::Entity::find()
            .column_as(Expr::cust("COUNT(*) OVER ()"), "total_records")
            .filter(list_condition(filter))
            .order_by(sort_column, filters.sort_direction().into())
            .order_by_asc(Column::Id)
            .limit(filters.limit())
            .offset(filters.offset())
            .into_model::<CountedRow>();

        let rows = self.bounded("list", query.all(&self.db)).await?;
        let total = rows.first().map_or(0, |r| r.total_records);
        let metadata = calculate_metadata(total, filters.page, filters.page_size);
        Ok((rows.into_iter().map(Subscription::from).collect(), metadata))
    }

    async fn sum(&self, q: &PriceSumQuery) -> Result<i64, SubscriptionError> {
        let query = subscription::Entity::find()
            .select_only()
            .column_as(Column::Price.sum(), "total")
            .filter(sum_condition(q))
            .into_tuple::<Option<i64>>();

        let total = self.bounded("sum", query.one(&self.db)).await?;
        Ok(total.flatten().unwrap_or(0))
    }
}
