use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::classifier::{Identification, ImageInput};
use crate::db::models::{ReportRecord, UserRecord};
use crate::error::Result;
use crate::geocode::Place;
use crate::rewards::manager::{ReportInput, ReportOutcome};
use crate::AppState;

const DEFAULT_RECENT_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    /// data URL or bare base64
    pub image: String,
    pub mime_type: Option<String>,
}

pub async fn classify_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<Identification>> {
    let image = ImageInput::parse(&request.image, request.mime_type.as_deref())?;
    let identification = state.rewards.classifier().identify(&image).await?;

    Ok(Json(identification))
}

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub waste_type: String,
    pub amount: String,
    pub image_url: Option<String>,
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
    Json(request): Json<CreateReportRequest>,
) -> Result<Json<ReportOutcome>> {
    let outcome = state
        .rewards
        .record_report(
            user.id,
            ReportInput {
                location: request.location,
                latitude: request.latitude,
                longitude: request.longitude,
                waste_type: request.waste_type,
                amount: request.amount,
                image_url: request.image_url,
            },
        )
        .await?;

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecentReportsResponse {
    pub reports: Vec<ReportRecord>,
}

pub async fn recent_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<RecentReportsResponse>> {
    let reports = state
        .rewards
        .recent_reports(query.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
        .await?;

    Ok(Json(RecentReportsResponse { reports }))
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub places: Vec<Place>,
}

pub async fn search_locations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<LocationsResponse>> {
    let places = state.geocoder.search(query.q.trim()).await?;

    Ok(Json(LocationsResponse { places }))
}
