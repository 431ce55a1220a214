use std::collections::BTreeMap;

use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct SubscriptionDoc {
    pub id: i64,
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    /// MM-YYYY
    #[schema(example = "07-2025")]
    pub start_date: String,
    /// MM-YYYY; omitted when open-ended
    #[schema(example = "12-2025")]
    pub end_date: Option<String>,
    pub version: i32,
}

#[derive(ToSchema)]
pub struct CreateSubscriptionDoc {
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    #[schema(example = "07-2025")]
    pub start_date: String,
    #[schema(example = "12-2025")]
    pub end_date: Option<String>,
}

/// Absent fields keep their stored value.
#[derive(ToSchema)]
pub struct UpdateSubscriptionDoc {
    pub service_name: Option<String>,
    pub price: Option<i32>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(ToSchema)]
pub struct SubscriptionResponseDoc { pub subscription: SubscriptionDoc }

#[derive(ToSchema)]
pub struct MetadataDoc {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

#[derive(ToSchema)]
pub struct SubscriptionsListDoc {
    pub metadata: MetadataDoc,
    pub subscriptions: Vec<SubscriptionDoc>,
}

#[derive(ToSchema)]
pub struct MessageResponseDoc { pub data: String }

#[derive(ToSchema)]
pub struct SumResponseDoc { pub data: i64 }

/// `error` is a message string, or a `field -> message` object for validation failures.
#[derive(ToSchema)]
pub struct ErrorResponseDoc { pub error: BTreeMap<String, String> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::subscriptions::list,
        crate::routes::subscriptions::create,
        crate::routes::subscriptions::read,
        crate::routes::subscriptions::update,
        crate::routes::subscriptions::delete,
        crate::routes::subscriptions::sum_price,
    ),
    components(
        schemas(
            HealthResponse,
            SubscriptionDoc,
            CreateSubscriptionDoc,
            UpdateSubscriptionDoc,
            SubscriptionResponseDoc,
            MetadataDoc,
            SubscriptionsListDoc,
            MessageResponseDoc,
            SumResponseDoc,
            ErrorResponseDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "subscriptions")
    )
)]
pub struct ApiDoc;
