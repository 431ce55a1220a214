use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use models::validator::FieldErrors;
use service::subscription::errors::SubscriptionError;
use thiserror::Error;
use tracing::error;

const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
const EDIT_CONFLICT_MESSAGE: &str = "unable to update the record due to an edit conflict, please try again";
const TIMEOUT_MESSAGE: &str = "the server took too long to process your request, please try again";
const SERVER_ERROR_MESSAGE: &str = "the server encountered a problem and could not process your request";

/// Error envelope returned by every handler as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    EditConflict,
    Validation(FieldErrors),
    Timeout,
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg })),
            ApiError::NotFound => (StatusCode::NOT_FOUND, serde_json::json!({ "error": NOT_FOUND_MESSAGE })),
            ApiError::EditConflict => (StatusCode::CONFLICT, serde_json::json!({ "error": EDIT_CONFLICT_MESSAGE })),
            ApiError::Validation(errs) => (StatusCode::UNPROCESSABLE_ENTITY, serde_json::json!({ "error": errs })),
            ApiError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, serde_json::json!({ "error": TIMEOUT_MESSAGE })),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, serde_json::json!({ "error": SERVER_ERROR_MESSAGE })),
        };
        (status, Json(body)).into_response()
    }
}

/// Method and URI of the current request, kept for error logs.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub uri: Uri,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self { method: parts.method.clone(), uri: parts.uri.clone() })
    }
}

impl RequestMeta {
    /// Map a service failure onto the envelope. Store failures are logged
    /// here and reach the client only as a generic message.
    pub fn fail(&self, e: SubscriptionError) -> ApiError {
        match e {
            SubscriptionError::Validation(errs) => ApiError::Validation(errs),
            SubscriptionError::NotFound => ApiError::NotFound,
            SubscriptionError::EditConflict => ApiError::EditConflict,
            SubscriptionError::Timeout => {
                error!(method = %self.method, uri = %self.uri, code = e.code(), "store timeout");
                ApiError::Timeout
            }
            SubscriptionError::Store(ref detail) => {
                error!(method = %self.method, uri = %self.uri, code = e.code(), error = %detail, "store error");
                ApiError::Internal
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(#[from] models::errors::ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RequestMeta {
        RequestMeta { method: Method::GET, uri: Uri::from_static("/v1/subscriptions/1") }
    }

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (SubscriptionError::NotFound, StatusCode::NOT_FOUND),
            (SubscriptionError::EditConflict, StatusCode::CONFLICT),
            (SubscriptionError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
            (SubscriptionError::Store("connection reset".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (SubscriptionError::Validation(FieldErrors::new()), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, status) in cases {
            assert_eq!(meta().fail(err).into_response().status(), status);
        }
    }
}
