use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::classifier::{Expectation, Identification, ImageInput, Strictness, Verification};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub image: String,
    pub mime_type: Option<String>,
    #[serde(flatten)]
    pub expectation: Expectation,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VerifyResponse {
    Identify {
        #[serde(flatten)]
        result: Identification,
    },
    Verify {
        passed: bool,
        #[serde(flatten)]
        result: Verification,
    },
}

/// Identification when the caller states no expectation, strict
/// verification otherwise.
pub async fn verify_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let image = ImageInput::parse(&request.image, request.mime_type.as_deref())?;
    let classifier = state.rewards.classifier();

    if request.expectation.is_empty() {
        let result = classifier.identify(&image).await?;
        return Ok(Json(VerifyResponse::Identify { result }));
    }

    let result = classifier
        .verify(&image, &request.expectation, Strictness::Strict)
        .await?;

    Ok(Json(VerifyResponse::Verify {
        passed: result.passed(),
        result,
    }))
}
