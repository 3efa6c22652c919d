//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store backend selection and shared service handles
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(jwt_secret: String, payment_webhook_secret: String) -> Router {
    let services = Arc::new(services::build_services(payment_webhook_secret).await);
    build_app_with_services(jwt_secret, services)
}

/// Router over explicit services; tests use this to seed the in-memory
/// backend before spawning the server.
pub fn build_app_with_services(jwt_secret: String, services: Arc<services::AppServices>) -> Router {
    let jwt = Arc::new(orderdesk_auth::Hs256JwtValidator::new(
        jwt_secret.into_bytes(),
    ));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require auth + retailer context.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    // The payment callback authenticates with its signature, not a bearer
    // token, so it stays outside the auth middleware.
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/payments/callback", post(routes::payments::callback))
        .merge(protected)
        .layer(Extension(services))
}
