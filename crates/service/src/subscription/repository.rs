use async_trait::async_trait;
use models::filters::{Filters, Metadata};

use super::domain::{PriceSumQuery, Subscription, SubscriptionFilter};
use super::errors::SubscriptionError;

/// Persistence boundary for subscriptions.
///
/// `list` expects filters that already passed
/// [`validate_filters`](models::filters::validate_filters).
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Persist a new record and write the assigned id, created_at and version back into it.
    async fn insert(&self, subscription: &mut Subscription) -> Result<(), SubscriptionError>;
    async fn get(&self, id: i64) -> Result<Subscription, SubscriptionError>;
    /// Compare-and-swap on `(id, version)`. On success `subscription.version` is incremented;
    /// a missing row and a stale version both yield `EditConflict`.
    async fn update(&self, subscription: &mut Subscription) -> Result<(), SubscriptionError>;
    async fn delete(&self, id: i64) -> Result<(), SubscriptionError>;
    async fn list(&self, filter: &SubscriptionFilter, filters: &Filters) -> Result<(Vec<Subscription>, Metadata), SubscriptionError>;
    async fn sum(&self, query: &PriceSumQuery) -> Result<i64, SubscriptionError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::cmp::Ordering;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use chrono::Utc;
    use models::filters::{calculate_metadata, SortDirection};

    #[derive(Default)]
    pub struct MockSubscriptionRepository {
        rows: Mutex<BTreeMap<i64, Subscription>>,
        next_id: Mutex<i64>,
    }

    impl MockSubscriptionRepository {
        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    /// Lowercased alphanumeric words, close to Postgres' `simple` text-search config.
    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    fn matches_words(haystack: &str, query: &str) -> bool {
        let wanted = tokens(query);
        let have = tokens(haystack);
        !wanted.is_empty() && wanted.iter().all(|w| have.contains(w))
    }

    fn matches(s: &Subscription, f: &SubscriptionFilter) -> bool {
        f.service_name.as_deref().map_or(true, |q| matches_words(&s.service_name, q))
            && f.price.map_or(true, |p| s.price == Some(p))
            && f.user_id.map_or(true, |u| s.user_id == u)
            && f.start_date.map_or(true, |d| s.start_date == Some(d))
    }

    fn compare(a: &Subscription, b: &Subscription, column: &str) -> Ordering {
        match column {
            "service_name" => a.service_name.cmp(&b.service_name),
            "price" => a.price.cmp(&b.price),
            "start_date" => a.start_date.cmp(&b.start_date),
            _ => a.id.cmp(&b.id),
        }
    }

    #[async_trait]
    impl SubscriptionRepository for MockSubscriptionRepository {
        async fn insert(&self, subscription: &mut Subscription) -> Result<(), SubscriptionError> {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            subscription.id = *next_id;
            subscription.created_at = Some(Utc::now());
            subscription.version = 1;
            self.rows.lock().unwrap().insert(subscription.id, subscription.clone());
            Ok(())
        }

        async fn get(&self, id: i64) -> Result<Subscription, SubscriptionError> {
            if id < 1 {
                return Err(SubscriptionError::NotFound);
            }
            self.rows.lock().unwrap().get(&id).cloned().ok_or(SubscriptionError::NotFound)
        }

        async fn update(&self, subscription: &mut Subscription) -> Result<(), SubscriptionError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(&subscription.id) {
                Some(stored) if stored.version == subscription.version => {
                    let created_at = stored.created_at;
                    *stored = subscription.clone();
                    stored.created_at = created_at;
                    stored.version += 1;
                    subscription.version = stored.version;
                    Ok(())
                }
                _ => Err(SubscriptionError::EditConflict),
            }
        }

        async fn delete(&self, id: i64) -> Result<(), SubscriptionError> {
            self.rows.lock().unwrap().remove(&id).map(|_| ()).ok_or(SubscriptionError::NotFound)
        }

        async fn list(&self, filter: &SubscriptionFilter, filters: &Filters) -> Result<(Vec<Subscription>, Metadata), SubscriptionError> {
            let column = filters.sort_column();
            let direction = filters.sort_direction();

            let mut matched: Vec<Subscription> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|s| matches(s, filter))
                .cloned()
                .collect();
            matched.sort_by(|a, b| {
                let primary = compare(a, b, column);
                let primary = if direction == SortDirection::Desc { primary.reverse() } else { primary };
                primary.then(a.id.cmp(&b.id))
            });

            let total = matched.len() as i64;
            let page: Vec<Subscription> = matched
                .into_iter()
                .skip(filters.offset() as usize)
                .take(filters.limit() as usize)
                .collect();
            // The window count is only observable on returned rows.
            let total = if page.is_empty() { 0 } else { total };
            Ok((page, calculate_metadata(total, filters.page, filters.page_size)))
        }

        async fn sum(&self, query: &PriceSumQuery) -> Result<i64, SubscriptionError> {
            let rows = self.rows.lock().unwrap();
            let total = rows
                .values()
                .filter(|s| match s.start_date {
                    Some(start) => query.from.map_or(true, |from| start >= from) && query.to.map_or(true, |to| start <= to),
                    None => false,
                })
                .filter(|s| query.service_name.as_deref().map_or(true, |name| s.service_name == name))
                .filter(|s| query.user_id.map_or(true, |u| s.user_id == u))
                .filter_map(|s| s.price)
                .map(i64::from)
                .sum();
            Ok(total)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn word_matching_is_token_based() {
            assert!(matches_words("Yandex Plus", "plus"));
            assert!(matches_words("Yandex Plus", "PLUS yandex"));
            assert!(!matches_words("Yandex Plus", "Plu"));
            assert!(!matches_words("Yandex Plus", "Yandex Music"));
            assert!(!matches_words("Yandex Plus", "!!"));
        }
    }
}
