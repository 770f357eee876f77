use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/trigger-scrape", get(handlers::trigger_scrape))
        .route("/health-check", get(handlers::health_check))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(app: Router, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("🌍 Server running on http://localhost:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
