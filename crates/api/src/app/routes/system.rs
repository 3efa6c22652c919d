use axum::{Json, http::StatusCode, response::IntoResponse};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    axum::extract::Extension(retailer): axum::extract::Extension<crate::context::RetailerContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "retailer_id": retailer.retailer_id().to_string(),
        "principal_id": retailer.principal_id().to_string(),
    }))
}
