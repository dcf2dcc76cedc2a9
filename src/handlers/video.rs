// src/handlers/video.rs

use crate::error::PipelineError;
use crate::pipeline::GenerationRequest;
use crate::AppState;
use axum::{extract::Extension, response::Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct VideoGenerationResponse {
    pub video_url: String,
}

pub async fn generate_video(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<VideoGenerationResponse>, PipelineError> {
    let artifacts = state.orchestrator.run_generation(&request).await?;
    Ok(Json(VideoGenerationResponse {
        video_url: artifacts.video_url,
    }))
}
