use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::classifier::CONFIDENCE_THRESHOLD;
use crate::db::models::ImpactSummary;
use crate::error::Result;
use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.rewards.store();
    let database = match store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Health check could not reach the store: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": "healthy",
        "service": "Waste Rewards",
        "version": env!("CARGO_PKG_VERSION"),
        "store": store.backend_name(),
        "database": database,
    }))
}

#[derive(Debug, Serialize)]
pub struct PublicConfigResponse {
    pub login_url: String,
    pub confidence_threshold: f64,
    pub classifier_configured: bool,
}

// what the frontend needs before anyone has signed in
pub async fn public_config(State(state): State<Arc<AppState>>) -> Json<PublicConfigResponse> {
    Json(PublicConfigResponse {
        login_url: state.config.login_url.clone(),
        confidence_threshold: CONFIDENCE_THRESHOLD,
        classifier_configured: state.rewards.classifier().is_configured(),
    })
}

pub async fn get_impact(State(state): State<Arc<AppState>>) -> Result<Json<ImpactSummary>> {
    let impact = state.rewards.store().impact_summary().await?;
    Ok(Json(impact))
}
