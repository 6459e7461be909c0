//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use placeorder::{PlaceOrderError, ServiceError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Place-order engine error.
    PlaceOrder(PlaceOrderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PlaceOrder(err) => place_order_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn place_order_error_to_response(err: PlaceOrderError) -> (StatusCode, String) {
    let status = match &err {
        PlaceOrderError::Locked | PlaceOrderError::LeaseLost => StatusCode::LOCKED,
        PlaceOrderError::NoProcess => StatusCode::NOT_FOUND,
        PlaceOrderError::AlreadyFinal => StatusCode::CONFLICT,
        PlaceOrderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PlaceOrderError::Service(ServiceError::Cart(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        PlaceOrderError::Service(_) => StatusCode::BAD_GATEWAY,
        PlaceOrderError::Rollback(_) | PlaceOrderError::Store(_) | PlaceOrderError::Lock(_) => {
            tracing::error!(error = %err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<PlaceOrderError> for ApiError {
    fn from(err: PlaceOrderError) -> Self {
        ApiError::PlaceOrder(err)
    }
}
