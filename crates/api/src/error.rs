//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;
use order_store::StoreError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Coordinator error.
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Fulfillment(err) => (fulfillment_status(err), err.kind()),
        };
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(error = %message, kind, "request failed");
        }

        let retryable = matches!(&self, ApiError::Fulfillment(err) if err.is_retryable());
        let body = serde_json::json!({
            "error": message,
            "kind": kind,
            "retryable": retryable,
        });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_status(err: &FulfillmentError) -> StatusCode {
    match err {
        FulfillmentError::Validation(_) => StatusCode::BAD_REQUEST,
        FulfillmentError::ProductNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        FulfillmentError::InsufficientStock { .. } => StatusCode::CONFLICT,
        FulfillmentError::InventoryUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        FulfillmentError::InventoryRejected { .. } => StatusCode::BAD_GATEWAY,
        FulfillmentError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        FulfillmentError::InvalidTransition { .. } | FulfillmentError::IllegalState { .. } => {
            StatusCode::CONFLICT
        }
        FulfillmentError::Store(StoreError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
        FulfillmentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
