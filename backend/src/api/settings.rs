use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::models::{NotificationRecord, UserRecord};
use crate::error::{Result, RewardsError};
use crate::points::level_for_points;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub user: UserRecord,
    pub balance: i64,
    pub level: i64,
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
) -> Result<Json<SettingsResponse>> {
    let balance = state.rewards.balance(user.id).await?;

    Ok(Json(SettingsResponse {
        level: level_for_points(balance),
        balance,
        user,
    }))
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationRecord>,
}

pub async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
) -> Result<Json<NotificationsResponse>> {
    let notifications = state.rewards.store().unread_notifications(user.id).await?;

    Ok(Json(NotificationsResponse { notifications }))
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub id: i64,
    pub read: bool,
}

// only the owner can mark a notification; anything else reads as missing
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
    Path(notification_id): Path<i64>,
) -> Result<Json<MarkReadResponse>> {
    let updated = state
        .rewards
        .store()
        .mark_notification_read(user.id, notification_id)
        .await?;

    if !updated {
        return Err(RewardsError::NotFound(format!("notification {notification_id}")));
    }

    Ok(Json(MarkReadResponse {
        id: notification_id,
        read: true,
    }))
}
