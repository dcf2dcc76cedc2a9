// src/handlers/translate.rs

use crate::error::PipelineError;
use crate::AppState;
use axum::{
    extract::{Extension, Multipart},
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct VideoTranslationResponse {
    pub translated_video_url: String,
    pub original_audio: String,
    pub translated_audio: String,
}

/// Multipart upload: one `video_file` part plus a `target_language` text
/// field. The upload is parked under the upload dir and handed to the
/// dubbing pipeline, which owns its deletion from then on.
pub async fn translate_video(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<VideoTranslationResponse>, PipelineError> {
    let mut video: Option<(String, Vec<u8>)> = None;
    let mut target_language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::Validation(format!("invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("video_file") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("upload.mp4")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    PipelineError::Validation(format!("failed to read upload: {}", e))
                })?;
                video = Some((file_name, bytes.to_vec()));
            }
            Some("target_language") => {
                let value = field.text().await.map_err(|e| {
                    PipelineError::Validation(format!("failed to read target_language: {}", e))
                })?;
                target_language = Some(value);
            }
            _ => {}
        }
    }

    let (file_name, bytes) = video
        .ok_or_else(|| PipelineError::Validation("missing video_file field".to_string()))?;
    let target_language = target_language
        .ok_or_else(|| PipelineError::Validation("missing target_language field".to_string()))?;
    if bytes.is_empty() {
        return Err(PipelineError::Validation("uploaded video is empty".to_string()));
    }

    let upload_path = state
        .config
        .upload_dir
        .join(format!("upload_{}.mp4", Uuid::new_v4()));
    tokio::fs::write(&upload_path, &bytes)
        .await
        .map_err(|e| PipelineError::Storage(format!("failed to save upload: {}", e)))?;

    let artifacts = state
        .orchestrator
        .run_dubbing(&upload_path, &file_name, &target_language)
        .await?;

    Ok(Json(VideoTranslationResponse {
        translated_video_url: artifacts.video_url,
        original_audio: artifacts.original_audio_url,
        translated_audio: artifacts.translated_audio_url,
    }))
}
