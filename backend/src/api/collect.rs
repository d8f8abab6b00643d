use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::report::ImageRequest;
use crate::classifier::ImageInput;
use crate::db::models::{UserRecord, WasteLocationRecord};
use crate::error::Result;
use crate::rewards::manager::CollectionOutcome;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<WasteLocationRecord>,
}

pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<TasksResponse>> {
    let tasks = state.rewards.list_tasks().await?;

    Ok(Json(TasksResponse { tasks }))
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: WasteLocationRecord,
}

pub async fn claim_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
    Path(task_id): Path<i64>,
) -> Result<Json<TaskResponse>> {
    let task = state.rewards.claim_task(user.id, task_id).await?;

    Ok(Json(TaskResponse { task }))
}

pub async fn verify_collection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
    Path(task_id): Path<i64>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<CollectionOutcome>> {
    let image = ImageInput::parse(&request.image, request.mime_type.as_deref())?;
    let outcome = state
        .rewards
        .complete_collection(user.id, task_id, &image)
        .await?;

    Ok(Json(outcome))
}
