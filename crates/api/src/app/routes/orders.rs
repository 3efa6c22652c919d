use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};

use orderdesk_core::OrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/search", get(search_orders))
        .route("/statistics", get(order_statistics))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/status", patch(update_order_status))
        .route("/:id/payment-status", patch(update_payment_status))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let cmd = match body.into_command() {
        Ok(cmd) => cmd,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let receipt = match services.order_store().place_order(&cmd).await {
        Ok(receipt) => receipt,
        Err(e) => return errors::domain_error_to_response(e),
    };

    services.notifier().order_placed(&receipt);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "order_id": receipt.order_id.to_string(),
            "affected_retailer_ids": receipt
                .retailer_ids
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>(),
        })),
    )
        .into_response()
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(retailer): Extension<crate::context::RetailerContext>,
    Query(query): Query<dto::ListOrdersQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref() {
        Some(s) => match errors::parse_order_status(s) {
            Ok(status) => Some(status),
            Err(response) => return response,
        },
        None => None,
    };

    match services
        .order_store()
        .list_orders(retailer.retailer_id(), status)
        .await
    {
        Ok(orders) => {
            let items = orders
                .into_iter()
                .map(dto::scoped_order_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(retailer): Extension<crate::context::RetailerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };

    match services
        .order_store()
        .get_order(retailer.retailer_id(), order_id)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::scoped_order_to_json(order))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(retailer): Extension<crate::context::RetailerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let next = match errors::parse_order_status(&body.status) {
        Ok(status) => status,
        Err(response) => return response,
    };

    match services
        .order_store()
        .update_order_status(retailer.retailer_id(), order_id, next)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"id": order_id.to_string(), "order_status": next.as_str()})),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_payment_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(retailer): Extension<crate::context::RetailerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let next = match errors::parse_payment_status(&body.status) {
        Ok(status) => status,
        Err(response) => return response,
    };

    match services
        .order_store()
        .update_payment_status(retailer.retailer_id(), order_id, next)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"id": order_id.to_string(), "payment_status": next.as_str()})),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(retailer): Extension<crate::context::RetailerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };

    match services
        .order_store()
        .delete_order(retailer.retailer_id(), order_id)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"id": order_id.to_string(), "deleted": true})),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn search_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(retailer): Extension<crate::context::RetailerContext>,
    Query(query): Query<dto::SearchOrdersQuery>,
) -> axum::response::Response {
    match services
        .order_store()
        .search_orders(retailer.retailer_id(), &query.q)
        .await
    {
        Ok(orders) => {
            let items = orders
                .into_iter()
                .map(dto::scoped_order_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn order_statistics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(retailer): Extension<crate::context::RetailerContext>,
) -> axum::response::Response {
    match services
        .order_store()
        .order_statistics(retailer.retailer_id())
        .await
    {
        Ok(stats) => (StatusCode::OK, Json(dto::order_stats_to_json(stats))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
