use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use tracing::{error, info};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Answers right away; the job keeps running after the response is sent.
pub async fn trigger_scrape(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Manual trigger received");
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        if let Err(e) = pipeline.run().await {
            error!("News processing job failed: {}", e);
        }
    });
    Json(Message {
        message: "Triggered successfully.",
    })
}

pub async fn health_check() -> impl IntoResponse {
    Json(Message {
        message: "Server is working fine.",
    })
}
