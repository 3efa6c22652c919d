use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use orderdesk_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::context::RetailerContext;

/// Shared verifier handed to the auth layer.
#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Bearer-token middleware: resolves the retailer context or answers 401.
///
/// Every order-dashboard route sits behind this layer, so handlers can rely
/// on `RetailerContext` being present in request extensions.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(token) = bearer_token(req.headers()) else {
        return Err(unauthorized("missing bearer token"));
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("token rejected: {e}");
            return Err(unauthorized("invalid or expired token"));
        }
    };

    req.extensions_mut()
        .insert(RetailerContext::new(claims.retailer_id, claims.sub));

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn unauthorized(message: &'static str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}
