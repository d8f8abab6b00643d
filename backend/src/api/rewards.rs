use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::models::UserRecord;
use crate::error::Result;
use crate::rewards::manager::{RedemptionOutcome, RewardsSummary};
use crate::rewards::{Coupon, COUPONS};
use crate::AppState;

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
) -> Result<Json<RewardsSummary>> {
    let summary = state.rewards.summary(user.id).await?;

    Ok(Json(summary))
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub coupons: &'static [Coupon],
}

pub async fn get_catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse { coupons: COUPONS })
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub coupon_id: u32,
}

pub async fn redeem(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<RedemptionOutcome>> {
    let outcome = state.rewards.redeem(user.id, request.coupon_id).await?;

    Ok(Json(outcome))
}
