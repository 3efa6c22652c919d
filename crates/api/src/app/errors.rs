use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use orderdesk_core::DomainError;
use orderdesk_orders::{OrderStatus, PaymentStatus};

/// Map the domain taxonomy onto HTTP.
///
/// Ownership failures arrive as `NotFound` (never a permission error), so
/// the mapping cannot leak an order's existence to non-owners.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", err.to_string())
        }
        DomainError::InvalidState(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", msg)
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Internal(msg) => {
            tracing::error!("internal error: {msg}");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Unrecognized status values are rejected before any store call.
pub fn parse_order_status(s: &str) -> Result<OrderStatus, axum::response::Response> {
    OrderStatus::parse(s).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: pending, confirmed, shipped, delivered, cancelled",
        )
    })
}

pub fn parse_payment_status(s: &str) -> Result<PaymentStatus, axum::response::Response> {
    PaymentStatus::parse(s).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: pending, paid, failed, refunded",
        )
    })
}
