use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use orderdesk_core::{OrderId, PaymentId};
use orderdesk_infra::payment::verify_callback_signature;

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;

/// Payment-gateway confirmation callback.
///
/// The signature is the caller's only authority: anything that fails
/// verification (including unparseable ids, which cannot have been signed)
/// gets a plain unsuccessful response and mutates nothing.
pub async fn callback(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PaymentCallbackRequest>,
) -> axum::response::Response {
    let ids: Result<(OrderId, PaymentId), _> = body
        .order_id
        .parse()
        .and_then(|order_id| body.payment_id.parse().map(|payment_id| (order_id, payment_id)));
    let Ok((order_id, payment_id)) = ids else {
        return verification_failed();
    };

    if !verify_callback_signature(
        order_id,
        payment_id,
        &body.signature,
        services.payment_webhook_secret(),
    ) {
        tracing::warn!(order_id = %order_id, "payment callback signature mismatch");
        return verification_failed();
    }

    match services
        .order_store()
        .record_payment(order_id, payment_id)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"success": true}))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn verification_failed() -> axum::response::Response {
    (StatusCode::OK, Json(serde_json::json!({"success": false}))).into_response()
}
