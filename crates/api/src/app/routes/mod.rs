use axum::{Router, routing::get};

pub mod orders;
pub mod payments;
pub mod system;

/// Router for all authenticated (retailer-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/orders", orders::router())
}
