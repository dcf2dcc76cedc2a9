// src/handlers/image.rs

use crate::error::PipelineError;
use crate::AppState;
use axum::{extract::Extension, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct ImageGenerationResponse {
    pub image_url: String,
}

pub async fn generate_image(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ImageGenerationRequest>,
) -> Result<Json<ImageGenerationResponse>, PipelineError> {
    let image_url = state.orchestrator.run_image_generation(&request.prompt).await?;
    Ok(Json(ImageGenerationResponse { image_url }))
}
