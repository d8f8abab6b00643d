use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::db::models::UserRecord;
use crate::error::Result;
use crate::rewards::manager::LeaderboardRow;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardRow>,
}

pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
) -> Result<Json<LeaderboardResponse>> {
    let entries = state.rewards.leaderboard(&user).await?;

    Ok(Json(LeaderboardResponse { entries }))
}
