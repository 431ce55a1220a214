use std::sync::Arc;

use models::filters::{validate_filters, Filters, Metadata};
use models::validator::Validator;
use tracing::{debug, info, instrument};

use super::domain::{
    validate_subscription, CreateSubscriptionInput, PriceSumQuery, Subscription, SubscriptionFilter,
    UpdateSubscriptionInput,
};
use super::errors::SubscriptionError;
use super::repository::SubscriptionRepository;

/// Subscription business service independent of web framework
#[derive(Clone)]
pub struct SubscriptionService {
    repo: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionService {
    pub fn new(repo: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repo }
    }

    /// Validate and persist a new subscription.
    ///
    /// # Examples
    /// ```
    /// use service::subscription::{SubscriptionService, repository::mock::MockSubscriptionRepository};
    /// use service::subscription::domain::CreateSubscriptionInput;
    /// use models::MonthDate;
    /// use std::sync::Arc;
    /// let svc = SubscriptionService::new(Arc::new(MockSubscriptionRepository::default()));
    /// let input = CreateSubscriptionInput {
    ///     service_name: "Yandex Plus".into(),
    ///     price: Some(400),
    ///     user_id: uuid::Uuid::new_v4(),
    ///     start_date: MonthDate::parse("07-2025").ok(),
    ///     end_date: None,
    /// };
    /// let created = tokio_test::block_on(svc.create(input)).unwrap();
    /// assert_eq!(created.id, 1);
    /// assert_eq!(created.version, 1);
    /// ```
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn create(&self, input: CreateSubscriptionInput) -> Result<Subscription, SubscriptionError> {
        let mut subscription = Subscription::from(input);

        let mut v = Validator::new();
        validate_subscription(&mut v, &subscription);
        v.finish()?;

        self.repo.insert(&mut subscription).await?;
        info!(id = subscription.id, service_name = %subscription.service_name, "subscription_created");
        Ok(subscription)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Subscription, SubscriptionError> {
        self.repo.get(id).await
    }

    /// Partial update guarded by the record version.
    ///
    /// When `expected_version` is given and differs from the stored version the
    /// call fails with `EditConflict` before anything is written. A concurrent
    /// writer that lands between the read and the write also yields `EditConflict`.
    ///
    /// # Examples
    /// ```
    /// use service::subscription::{SubscriptionService, repository::mock::MockSubscriptionRepository};
    /// use service::subscription::domain::{CreateSubscriptionInput, UpdateSubscriptionInput};
    /// use models::MonthDate;
    /// use std::sync::Arc;
    /// let svc = SubscriptionService::new(Arc::new(MockSubscriptionRepository::default()));
    /// let created = tokio_test::block_on(svc.create(CreateSubscriptionInput {
    ///     service_name: "Netflix".into(),
    ///     price: Some(900),
    ///     user_id: uuid::Uuid::new_v4(),
    ///     start_date: MonthDate::parse("01-2025").ok(),
    ///     end_date: None,
    /// })).unwrap();
    /// let patch = UpdateSubscriptionInput { price: Some(950), ..Default::default() };
    /// let updated = tokio_test::block_on(svc.update(created.id, patch, None)).unwrap();
    /// assert_eq!(updated.price, Some(950));
    /// assert_eq!(updated.service_name, "Netflix");
    /// assert_eq!(updated.version, 2);
    /// ```
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: i64,
        patch: UpdateSubscriptionInput,
        expected_version: Option<i32>,
    ) -> Result<Subscription, SubscriptionError> {
        let mut subscription = self.repo.get(id).await?;
        if let Some(expected) = expected_version {
            if expected != subscription.version {
                debug!(expected, stored = subscription.version, "version mismatch");
                return Err(SubscriptionError::EditConflict);
            }
        }

        patch.apply_to(&mut subscription);

        let mut v = Validator::new();
        validate_subscription(&mut v, &subscription);
        v.finish()?;

        self.repo.update(&mut subscription).await?;
        info!(id, version = subscription.version, "subscription_updated");
        Ok(subscription)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), SubscriptionError> {
        if id < 1 {
            return Err(SubscriptionError::NotFound);
        }
        self.repo.delete(id).await?;
        info!(id, "subscription_deleted");
        Ok(())
    }

    /// Filtered, sorted page of subscriptions.
    ///
    /// `v` carries errors already found while reading the request; filter
    /// checks are added to it so every problem is reported at once.
    #[instrument(skip(self, v, filter))]
    pub async fn list(
        &self,
        mut v: Validator,
        filter: SubscriptionFilter,
        filters: Filters,
    ) -> Result<(Vec<Subscription>, Metadata), SubscriptionError> {
        validate_filters(&mut v, &filters);
        v.finish()?;

        let (rows, metadata) = self.repo.list(&filter, &filters).await?;
        debug!(returned = rows.len(), total = metadata.total_records, "subscriptions_listed");
        Ok((rows, metadata))
    }

    /// Total price of the matching subscriptions; `0` when nothing matches.
    #[instrument(skip(self, v))]
    pub async fn sum(&self, mut v: Validator, query: PriceSumQuery) -> Result<i64, SubscriptionError> {
        query.validate(&mut v);
        v.finish()?;
        self.repo.sum(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::domain::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, DEFAULT_SORT, SORT_SAFELIST};
    use crate::subscription::repository::mock::MockSubscriptionRepository;
    use models::MonthDate;
    use uuid::Uuid;

    fn month(s: &str) -> MonthDate {
        MonthDate::parse(s).unwrap()
    }

    fn input(user_id: Uuid, name: &str, price: i32, start: &str) -> CreateSubscriptionInput {
        CreateSubscriptionInput {
            service_name: name.into(),
            price: Some(price),
            user_id,
            start_date: Some(month(start)),
            end_date: None,
        }
    }

    fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
        Filters { page, page_size, sort: sort.into(), sort_safelist: SORT_SAFELIST }
    }

    fn default_filters() -> Filters {
        filters(DEFAULT_PAGE, DEFAULT_PAGE_SIZE, DEFAULT_SORT)
    }

    fn setup() -> (Arc<MockSubscriptionRepository>, SubscriptionService) {
        let repo = Arc::new(MockSubscriptionRepository::default());
        let svc = SubscriptionService::new(repo.clone());
        (repo, svc)
    }

    #[tokio::test]
    async fn create_rejects_invalid_input_without_writing() {
        let (repo, svc) = setup();
        let bad = CreateSubscriptionInput { service_name: String::new(), price: Some(-1), ..Default::default() };

        match svc.create(bad).await {
            Err(SubscriptionError::Validation(errs)) => {
                assert_eq!(errs["service_name"], "must be provided");
                assert_eq!(errs["price"], "must be a positive integer");
                assert_eq!(errs["user_id"], "must not be empty");
                assert_eq!(errs["start_date"], "must be provided");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn get_missing_and_non_positive_ids() {
        let (_, svc) = setup();
        assert!(matches!(svc.get(0).await, Err(SubscriptionError::NotFound)));
        assert!(matches!(svc.get(-3).await, Err(SubscriptionError::NotFound)));
        assert!(matches!(svc.get(42).await, Err(SubscriptionError::NotFound)));
    }

    #[tokio::test]
    async fn update_keeps_absent_fields() {
        let (_, svc) = setup();
        let user = Uuid::new_v4();
        let created = svc.create(input(user, "Yandex Plus", 400, "07-2025")).await.unwrap();

        let patch = UpdateSubscriptionInput { end_date: Some(month("12-2025")), ..Default::default() };
        let updated = svc.update(created.id, patch, None).await.unwrap();

        assert_eq!(updated.service_name, "Yandex Plus");
        assert_eq!(updated.price, Some(400));
        assert_eq!(updated.user_id, user);
        assert_eq!(updated.end_date, Some(month("12-2025")));
        assert_eq!(updated.version, created.version + 1);
        assert_eq!(svc.get(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_validates_merged_record() {
        let (_, svc) = setup();
        let created = svc.create(input(Uuid::new_v4(), "Spotify", 200, "07-2025")).await.unwrap();

        let patch = UpdateSubscriptionInput { end_date: Some(month("01-2025")), ..Default::default() };
        match svc.update(created.id, patch, None).await {
            Err(SubscriptionError::Validation(errs)) => assert_eq!(errs["start_date"], "must be before end_date"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(svc.get(created.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let (_, svc) = setup();
        let res = svc.update(7, UpdateSubscriptionInput::default(), None).await;
        assert!(matches!(res, Err(SubscriptionError::NotFound)));
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let (_, svc) = setup();
        let created = svc.create(input(Uuid::new_v4(), "Spotify", 200, "07-2025")).await.unwrap();

        let first = svc.update(created.id, UpdateSubscriptionInput { price: Some(250), ..Default::default() }, Some(1));
        assert_eq!(first.await.unwrap().version, 2);

        let second = svc.update(created.id, UpdateSubscriptionInput { price: Some(300), ..Default::default() }, Some(1));
        assert!(matches!(second.await, Err(SubscriptionError::EditConflict)));
        assert_eq!(svc.get(created.id).await.unwrap().price, Some(250));
    }

    /// Holds every reader at a barrier after `get`, so all writers start from the same version.
    struct LockstepRepository {
        inner: MockSubscriptionRepository,
        readers: tokio::sync::Barrier,
    }

    #[async_trait::async_trait]
    impl SubscriptionRepository for LockstepRepository {
        async fn insert(&self, s: &mut Subscription) -> Result<(), SubscriptionError> {
            self.inner.insert(s).await
        }
        async fn get(&self, id: i64) -> Result<Subscription, SubscriptionError> {
            let found = self.inner.get(id).await;
            self.readers.wait().await;
            found
        }
        async fn update(&self, s: &mut Subscription) -> Result<(), SubscriptionError> {
            self.inner.update(s).await
        }
        async fn delete(&self, id: i64) -> Result<(), SubscriptionError> {
            self.inner.delete(id).await
        }
        async fn list(&self, f: &SubscriptionFilter, p: &Filters) -> Result<(Vec<Subscription>, Metadata), SubscriptionError> {
            self.inner.list(f, p).await
        }
        async fn sum(&self, q: &PriceSumQuery) -> Result<i64, SubscriptionError> {
            self.inner.sum(q).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_from_same_version_have_one_winner() {
        const WRITERS: usize = 4;
        let mut seed: Subscription = input(Uuid::new_v4(), "Kinopoisk", 300, "03-2025").into();
        let inner = MockSubscriptionRepository::default();
        inner.insert(&mut seed).await.unwrap();

        let repo = Arc::new(LockstepRepository { inner, readers: tokio::sync::Barrier::new(WRITERS) });
        let svc = SubscriptionService::new(repo.clone());

        let mut tasks = Vec::new();
        for price in [310, 320, 330, 340] {
            let svc = svc.clone();
            let id = seed.id;
            tasks.push(tokio::spawn(async move {
                svc.update(id, UpdateSubscriptionInput { price: Some(price), ..Default::default() }, None).await
            }));
        }

        let mut winners = Vec::new();
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(s) => winners.push(s),
                Err(SubscriptionError::EditConflict) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(winners.len(), 1);
        assert_eq!(conflicts, WRITERS - 1);
        assert_eq!(winners[0].version, 2);

        let stored = repo.inner.get(seed.id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.price, winners[0].price);
    }

    #[tokio::test]
    async fn lost_update_is_detected_at_write() {
        let (repo, svc) = setup();
        let created = svc.create(input(Uuid::new_v4(), "Kinopoisk", 300, "03-2025")).await.unwrap();

        let mut a = repo.get(created.id).await.unwrap();
        let mut b = repo.get(created.id).await.unwrap();
        a.price = Some(1);
        b.price = Some(2);
        repo.update(&mut a).await.unwrap();
        assert!(matches!(repo.update(&mut b).await, Err(SubscriptionError::EditConflict)));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (repo, svc) = setup();
        let created = svc.create(input(Uuid::new_v4(), "Okko", 100, "02-2025")).await.unwrap();
        svc.delete(created.id).await.unwrap();
        assert!(repo.is_empty());
        assert!(matches!(svc.get(created.id).await, Err(SubscriptionError::NotFound)));
        assert!(matches!(svc.delete(created.id).await, Err(SubscriptionError::NotFound)));
        assert!(matches!(svc.delete(0).await, Err(SubscriptionError::NotFound)));
    }

    #[tokio::test]
    async fn list_without_filters_returns_everything_by_id() {
        let (_, svc) = setup();
        let user = Uuid::new_v4();
        for (name, price) in [("B", 2), ("A", 1), ("C", 3)] {
            svc.create(input(user, name, price, "07-2025")).await.unwrap();
        }

        let (rows, meta) = svc.list(Validator::new(), SubscriptionFilter::default(), default_filters()).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(meta.total_records, 3);
        assert_eq!(meta.first_page, 1);
        assert_eq!(meta.last_page, 1);
    }

    #[tokio::test]
    async fn list_narrows_by_words_and_sorts_descending() {
        let (_, svc) = setup();
        let user = Uuid::new_v4();
        svc.create(input(user, "Yandex Plus", 400, "07-2025")).await.unwrap();
        svc.create(input(user, "Netflix", 900, "07-2025")).await.unwrap();
        svc.create(input(user, "Plus Music", 150, "08-2025")).await.unwrap();

        let filter = SubscriptionFilter { service_name: Some("plus".into()), ..Default::default() };
        let (rows, _) = svc.list(Validator::new(), filter, filters(1, 20, "-price")).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.service_name.as_str()).collect::<Vec<_>>(), vec!["Yandex Plus", "Plus Music"]);

        let filter = SubscriptionFilter { start_date: Some(month("08-2025")), ..Default::default() };
        let (rows, _) = svc.list(Validator::new(), filter, default_filters()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn list_pages_and_reports_metadata() {
        let (_, svc) = setup();
        let user = Uuid::new_v4();
        for i in 0..5 {
            svc.create(input(user, "Service", 100 + i, "07-2025")).await.unwrap();
        }

        let (rows, meta) = svc.list(Validator::new(), SubscriptionFilter::default(), filters(2, 2, "id")).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(meta.current_page, 2);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.total_records, 5);

        let (rows, meta) = svc.list(Validator::new(), SubscriptionFilter::default(), filters(9, 2, "id")).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(meta, Metadata::default());
    }

    #[tokio::test]
    async fn list_reports_request_and_filter_errors_together() {
        let (_, svc) = setup();
        let mut v = Validator::new();
        v.add_error("price", "must be an integer");

        match svc.list(v, SubscriptionFilter::default(), filters(0, 20, "year")).await {
            Err(SubscriptionError::Validation(errs)) => {
                assert_eq!(errs["price"], "must be an integer");
                assert_eq!(errs["page"], "must be greater than zero");
                assert_eq!(errs["sort"], "invalid sort value");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sum_over_inclusive_range() {
        let (_, svc) = setup();
        let user = Uuid::new_v4();
        svc.create(input(user, "Yandex Plus", 400, "07-2025")).await.unwrap();
        svc.create(input(user, "Yandex Plus", 400, "09-2025")).await.unwrap();
        svc.create(input(user, "Netflix", 900, "08-2025")).await.unwrap();
        svc.create(input(Uuid::new_v4(), "Yandex Plus", 400, "08-2025")).await.unwrap();

        let q = PriceSumQuery { user_id: Some(user), from: Some(month("07-2025")), to: Some(month("08-2025")), ..Default::default() };
        assert_eq!(svc.sum(Validator::new(), q).await.unwrap(), 1300);

        let q = PriceSumQuery { service_name: Some("Yandex Plus".into()), ..Default::default() };
        assert_eq!(svc.sum(Validator::new(), q).await.unwrap(), 1200);

        let q = PriceSumQuery { user_id: Some(Uuid::new_v4()), ..Default::default() };
        assert_eq!(svc.sum(Validator::new(), q).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sum_rejects_inverted_range() {
        let (_, svc) = setup();
        let q = PriceSumQuery { from: Some(month("09-2025")), to: Some(month("01-2025")), ..Default::default() };
        assert!(matches!(svc.sum(Validator::new(), q).await, Err(SubscriptionError::Validation(_))));
    }
}
