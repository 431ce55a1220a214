use std::collections::HashMap;

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use common::types::DataResponse;
use models::filters::{Filters, Metadata};
use models::validator::Validator;
use serde::Serialize;
use service::subscription::domain::{
    CreateSubscriptionInput, PriceSumQuery, Subscription, SubscriptionFilter, UpdateSubscriptionInput,
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, DEFAULT_SORT, SORT_SAFELIST,
};
use tracing::debug;

use super::ServerState;
use crate::errors::{ApiError, RequestMeta};
use crate::params::{date_filter, price_filter, uuid_filter, QueryParams};

pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Subscription,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionsListResponse {
    pub metadata: Metadata,
    pub subscriptions: Vec<Subscription>,
}

fn read_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::BadRequest("invalid id parameter".into())),
    }
}

fn read_query(query: Result<Query<HashMap<String, String>>, QueryRejection>) -> Result<QueryParams, ApiError> {
    query
        .map(|Query(map)| QueryParams::from(map))
        .map_err(|rej| ApiError::BadRequest(rej.body_text()))
}

fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rej| ApiError::BadRequest(rej.body_text()))
}

fn read_expected_version(headers: &HeaderMap) -> Result<Option<i32>, ApiError> {
    let Some(raw) = headers.get(EXPECTED_VERSION_HEADER) else { return Ok(None) };
    raw.to_str()
        .ok()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| ApiError::BadRequest("invalid X-Expected-Version header".into())))
        .transpose()
}

#[utoipa::path(
    post, path = "/v1/subscriptions", tag = "subscriptions",
    request_body = crate::openapi::CreateSubscriptionDoc,
    responses(
        (status = 201, description = "Created", body = crate::openapi::SubscriptionResponseDoc),
        (status = 400, description = "Malformed body", body = crate::openapi::ErrorResponseDoc),
        (status = 422, description = "Validation failed", body = crate::openapi::ErrorResponseDoc),
        (status = 500, description = "Server error", body = crate::openapi::ErrorResponseDoc),
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    meta: RequestMeta,
    payload: Result<Json<CreateSubscriptionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    let input = read_body(payload)?;
    let subscription = state.subscriptions.create(input).await.map_err(|e| meta.fail(e))?;
    Ok((StatusCode::CREATED, Json(SubscriptionResponse { subscription })))
}

#[utoipa::path(
    get, path = "/v1/subscriptions/{id}", tag = "subscriptions",
    params(("id" = i64, Path, description = "Subscription id")),
    responses(
        (status = 200, description = "Found", body = crate::openapi::SubscriptionResponseDoc),
        (status = 400, description = "Invalid id", body = crate::openapi::ErrorResponseDoc),
        (status = 404, description = "Not found", body = crate::openapi::ErrorResponseDoc),
    )
)]
pub async fn read(
    State(state): State<ServerState>,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let id = read_id(&id)?;
    let subscription = state.subscriptions.get(id).await.map_err(|e| meta.fail(e))?;
    Ok(Json(SubscriptionResponse { subscription }))
}

#[utoipa::path(
    patch, path = "/v1/subscriptions/{id}", tag = "subscriptions",
    params(
        ("id" = i64, Path, description = "Subscription id"),
        ("X-Expected-Version" = Option<i32>, Header, description = "Reject the update unless the stored version matches"),
    ),
    request_body = crate::openapi::UpdateSubscriptionDoc,
    responses(
        (status = 200, description = "Updated", body = crate::openapi::SubscriptionResponseDoc),
        (status = 400, description = "Invalid id or body", body = crate::openapi::ErrorResponseDoc),
        (status = 404, description = "Not found", body = crate::openapi::ErrorResponseDoc),
        (status = 409, description = "Edit conflict", body = crate::openapi::ErrorResponseDoc),
        (status = 422, description = "Validation failed", body = crate::openapi::ErrorResponseDoc),
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    meta: RequestMeta,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<UpdateSubscriptionInput>, JsonRejection>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let id = read_id(&id)?;
    let expected_version = read_expected_version(&headers)?;
    let patch = match payload {
        Ok(Json(patch)) => patch,
        Err(rej) => {
            // A missing record or stale version outranks a bad body.
            let current = state.subscriptions.get(id).await.map_err(|e| meta.fail(e))?;
            if expected_version.is_some_and(|v| v != current.version) {
                return Err(ApiError::EditConflict);
            }
            return Err(ApiError::BadRequest(rej.body_text()));
        }
    };
    let subscription = state
        .subscriptions
        .update(id, patch, expected_version)
        .await
        .map_err(|e| meta.fail(e))?;
    Ok(Json(SubscriptionResponse { subscription }))
}

#[utoipa::path(
    delete, path = "/v1/subscriptions/{id}", tag = "subscriptions",
    params(("id" = i64, Path, description = "Subscription id")),
    responses(
        (status = 200, description = "Deleted", body = crate::openapi::MessageResponseDoc),
        (status = 400, description = "Invalid id", body = crate::openapi::ErrorResponseDoc),
        (status = 404, description = "Not found", body = crate::openapi::ErrorResponseDoc),
    )
)]
pub async fn delete(
    State(state): State<ServerState>,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<&'static str>>, ApiError> {
    let id = read_id(&id)?;
    state.subscriptions.delete(id).await.map_err(|e| meta.fail(e))?;
    Ok(Json(DataResponse { data: "subscription successfully deleted" }))
}

#[utoipa::path(
    get, path = "/v1/subscriptions", tag = "subscriptions",
    params(
        ("service_name" = Option<String>, Query, description = "Words that must all appear in the service name"),
        ("price" = Option<i32>, Query, description = "Exact price; -1 means any"),
        ("user_id" = Option<String>, Query, description = "Owner UUID"),
        ("start_date" = Option<String>, Query, description = "Start month, MM-YYYY"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("page_size" = Option<i64>, Query, description = "Items per page, default 20, at most 100"),
        ("sort" = Option<String>, Query, description = "id, service_name, price or start_date; prefix with - for descending"),
    ),
    responses(
        (status = 200, description = "Page of subscriptions", body = crate::openapi::SubscriptionsListDoc),
        (status = 422, description = "Validation failed", body = crate::openapi::ErrorResponseDoc),
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    meta: RequestMeta,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<SubscriptionsListResponse>, ApiError> {
    let q = read_query(query)?;
    let mut v = Validator::new();

    let filter = SubscriptionFilter {
        service_name: q.read_string("service_name"),
        price: price_filter(q.read_int("price", &mut v)),
        user_id: uuid_filter(q.read_uuid("user_id", &mut v)),
        start_date: date_filter(q.read_date("start_date", &mut v)),
    };
    let filters = Filters {
        page: q.read_int("page", &mut v).unwrap_or(DEFAULT_PAGE),
        page_size: q.read_int("page_size", &mut v).unwrap_or(DEFAULT_PAGE_SIZE),
        sort: q.read_string("sort").unwrap_or_else(|| DEFAULT_SORT.to_string()),
        sort_safelist: SORT_SAFELIST,
    };
    debug!(?filter, page = filters.page, page_size = filters.page_size, sort = %filters.sort, "list request");

    let (subscriptions, metadata) = state
        .subscriptions
        .list(v, filter, filters)
        .await
        .map_err(|e| meta.fail(e))?;
    Ok(Json(SubscriptionsListResponse { metadata, subscriptions }))
}

#[utoipa::path(
    get, path = "/v1/sum-subscriptions-price", tag = "subscriptions",
    params(
        ("user_id" = Option<String>, Query, description = "Owner UUID"),
        ("service_name" = Option<String>, Query, description = "Exact service name"),
        ("start_date" = Option<String>, Query, description = "First month of the range, MM-YYYY"),
        ("end_date" = Option<String>, Query, description = "Last month of the range, MM-YYYY"),
    ),
    responses(
        (status = 200, description = "Total price", body = crate::openapi::SumResponseDoc),
        (status = 422, description = "Validation failed", body = crate::openapi::ErrorResponseDoc),
    )
)]
pub async fn sum_price(
    State(state): State<ServerState>,
    meta: RequestMeta,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<DataResponse<i64>>, ApiError> {
    let q = read_query(query)?;
    let mut v = Validator::new();

    let sum_query = PriceSumQuery {
        user_id: uuid_filter(q.read_uuid("user_id", &mut v)),
        service_name: q.read_string("service_name"),
        from: date_filter(q.read_date("start_date", &mut v)),
        to: q.read_date("end_date", &mut v),
    };

    let data = state.subscriptions.sum(v, sum_query).await.map_err(|e| meta.fail(e))?;
    Ok(Json(DataResponse { data }))
}
