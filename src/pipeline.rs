// src/pipeline.rs
//! Job model and the PipelineOrchestrator that sequences the components
//! for the two top-level jobs: generate-video and translate-video.

use crate::assemble::{VideoAssembler, OUTPUT_FILE};
use crate::dubbing::{DubbingArtifacts, DubbingPipeline};
use crate::error::{PipelineError, Result};
use crate::scenes::SceneAssetGenerator;
use crate::store::AssetStore;
use crate::story::StoryGenerator;
use crate::upstream::ImageSynthesis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

pub const VIDEO_PREFIX: &str = "temp_videos";
pub const TRANSLATION_PREFIX: &str = "temp_translations";
pub const IMAGE_PREFIX: &str = "temp_images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Generate,
    Translate,
}

/// One pipeline invocation. The id is derived from the input, so repeated
/// requests for the same input share a workspace instead of leaking
/// directories.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub target_language: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    fn new(id: String, kind: JobKind, target_language: Option<String>) -> Self {
        let job = Self {
            id,
            kind,
            target_language,
            created_at: Utc::now(),
        };
        tracing::info!(
            job_id = %job.id,
            kind = ?job.kind,
            target_language = job.target_language.as_deref().unwrap_or("en"),
            created_at = %job.created_at,
            "Job created"
        );
        job
    }

    fn succeeded(&self) {
        tracing::info!(job_id = %self.id, kind = ?self.kind, "Job succeeded");
    }

    fn failed(&self, error: &PipelineError) {
        tracing::error!(
            job_id = %self.id,
            kind = ?self.kind,
            error_kind = error.kind(),
            "Job failed: {}",
            error
        );
    }
}

fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..6])
}

pub fn generation_job_id(prompt: &str) -> String {
    format!("video_{}", short_digest(prompt))
}

pub fn translation_job_id(file_name: &str) -> String {
    format!("translation_{}", short_digest(file_name))
}

pub fn image_job_id(prompt: &str) -> String {
    format!("image_{}", short_digest(prompt))
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationArtifacts {
    pub video_url: String,
}

pub struct PipelineOrchestrator {
    store: AssetStore,
    story: StoryGenerator,
    scenes: SceneAssetGenerator,
    assembler: VideoAssembler,
    dubbing: DubbingPipeline,
    images: Arc<dyn ImageSynthesis>,
    scene_count: usize,
}

impl PipelineOrchestrator {
    pub fn new(
        store: AssetStore,
        story: StoryGenerator,
        scenes: SceneAssetGenerator,
        assembler: VideoAssembler,
        dubbing: DubbingPipeline,
        images: Arc<dyn ImageSynthesis>,
        scene_count: usize,
    ) -> Self {
        Self {
            store,
            story,
            scenes,
            assembler,
            dubbing,
            images,
            scene_count,
        }
    }

    /// Prompt -> storyboard -> scene assets -> assembled video ->
    /// published URL. Fail-fast: the first stage error terminates the job;
    /// the partial workspace is retained for diagnostics.
    pub async fn run_generation(&self, request: &GenerationRequest) -> Result<GenerationArtifacts> {
        if request.prompt.trim().is_empty() {
            return Err(PipelineError::Validation("prompt is empty".to_string()));
        }

        let job = Job::new(
            generation_job_id(&request.prompt),
            JobKind::Generate,
            request.target_language.clone(),
        );

        let result = self.generation_stages(&job, request).await;
        match &result {
            Ok(_) => job.succeeded(),
            Err(e) => job.failed(e),
        }
        result
    }

    async fn generation_stages(
        &self,
        job: &Job,
        request: &GenerationRequest,
    ) -> Result<GenerationArtifacts> {
        let workspace = self.store.workspace(&job.id, VIDEO_PREFIX)?;

        let storyboard = self
            .story
            .generate(&request.prompt, self.scene_count, request.style.as_deref())
            .await?;

        let assets = self
            .scenes
            .generate_all(
                &storyboard.scenes,
                &workspace,
                request.target_language.as_deref(),
            )
            .await?;

        self.assembler.assemble(&assets, &workspace)?;
        let video_url = workspace.publish(OUTPUT_FILE)?;

        Ok(GenerationArtifacts { video_url })
    }

    /// Uploaded video -> dubbed video in the target language.
    pub async fn run_dubbing(
        &self,
        upload: &Path,
        file_name: &str,
        target_language: &str,
    ) -> Result<DubbingArtifacts> {
        let job = Job::new(
            translation_job_id(file_name),
            JobKind::Translate,
            Some(target_language.to_string()),
        );

        let workspace = self.store.workspace(&job.id, TRANSLATION_PREFIX)?;
        let result = self.dubbing.run(upload, target_language, &workspace).await;
        match &result {
            Ok(_) => job.succeeded(),
            Err(e) => job.failed(e),
        }
        result
    }

    /// Standalone image generation: one published image URL.
    pub async fn run_image_generation(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::Validation("prompt is empty".to_string()));
        }

        let job_id = image_job_id(prompt);
        let workspace = self.store.workspace(&job_id, IMAGE_PREFIX)?;

        let bytes = self.images.generate_image(prompt).await?;
        tokio::fs::write(workspace.path("image.jpg"), &bytes)
            .await
            .map_err(|e| PipelineError::Storage(format!("failed to write image: {}", e)))?;

        workspace.publish("image.jpg")
    }
}
