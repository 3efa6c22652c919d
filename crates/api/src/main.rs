#[tokio::main]
async fn main() {
    orderdesk_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });
    let webhook_secret = std::env::var("PAYMENT_WEBHOOK_SECRET").unwrap_or_else(|_| {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET not set; using insecure dev default");
        "dev-webhook-secret".to_string()
    });
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let app = orderdesk_api::app::build_app(jwt_secret, webhook_secret).await;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
