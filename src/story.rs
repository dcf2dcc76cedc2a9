// src/story.rs
//! Storyboard model and the StoryGenerator: one structured LLM completion
//! turned into an ordered, validated sequence of scenes.

use crate::error::{PipelineError, Result};
use crate::upstream::TextGeneration;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// One narrative beat. Indices are 1-based, contiguous, and define
/// playback order; scenes are never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub index: usize,
    pub title: String,
    pub description: String,
    pub image_prompt: String,
    pub narration: String,
    pub background_music: String,
    pub duration_seconds: f64,
    pub transition: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Storyboard {
    pub title: String,
    pub theme: String,
    pub scenes: Vec<Scene>,
}

// Wire shape of the structured completion, mirroring the function schema.
#[derive(Debug, Deserialize)]
struct StoryboardResponse {
    title: String,
    theme: String,
    scenes: Vec<SceneResponse>,
}

#[derive(Debug, Deserialize)]
struct SceneResponse {
    title: String,
    description: String,
    media: MediaResponse,
    #[serde(default = "default_transition")]
    transition: String,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    image_prompt: String,
    audio_narration: String,
    #[serde(default = "default_music")]
    background_music: String,
    #[serde(default = "default_duration")]
    duration_seconds: f64,
}

fn default_transition() -> String {
    "cut".to_string()
}

fn default_music() -> String {
    "ambient".to_string()
}

fn default_duration() -> f64 {
    5.0
}

const MAX_ATTEMPTS: usize = 3;

pub struct StoryGenerator {
    llm: Arc<dyn TextGeneration>,
}

impl StoryGenerator {
    pub fn new(llm: Arc<dyn TextGeneration>) -> Self {
        Self { llm }
    }

    /// Generate a storyboard for the prompt. Transient upstream failures
    /// are retried with exponential backoff; schema mismatches are
    /// terminal and each attempt is validated independently.
    pub async fn generate(
        &self,
        prompt: &str,
        scene_count: usize,
        style: Option<&str>,
    ) -> Result<Storyboard> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::Validation("story prompt is empty".to_string()));
        }
        if scene_count == 0 {
            return Err(PipelineError::Validation(
                "scene count must be at least 1".to_string(),
            ));
        }

        let user_prompt = build_user_prompt(prompt, scene_count, style);
        let schema = story_schema();

        let mut policy = ExponentialBackoff {
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_generate(&user_prompt, &schema).await {
                Ok(storyboard) => {
                    tracing::info!(
                        "Generated story '{}' with {} scenes",
                        storyboard.title,
                        storyboard.scenes.len()
                    );
                    return Ok(storyboard);
                }
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let delay = policy
                        .next_backoff()
                        .unwrap_or(std::time::Duration::from_secs(1));
                    tracing::warn!(
                        "Story generation attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        MAX_ATTEMPTS,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_generate(&self, user_prompt: &str, schema: &Value) -> Result<Storyboard> {
        let raw = self
            .llm
            .complete_structured(SYSTEM_PROMPT, user_prompt, schema)
            .await?;
        parse_storyboard(raw)
    }
}

/// Validate the raw structured response and assign contiguous 1-based
/// scene indices in upstream order.
fn parse_storyboard(raw: Value) -> Result<Storyboard> {
    let response: StoryboardResponse = serde_json::from_value(raw)
        .map_err(|e| PipelineError::Schema(format!("story response: {}", e)))?;

    if response.scenes.is_empty() {
        return Err(PipelineError::Schema("story has no scenes".to_string()));
    }

    let mut scenes = Vec::with_capacity(response.scenes.len());
    for (i, scene) in response.scenes.into_iter().enumerate() {
        let index = i + 1;
        if scene.media.audio_narration.trim().is_empty() {
            return Err(PipelineError::Schema(format!(
                "scene {} has empty narration",
                index
            )));
        }
        if scene.media.image_prompt.trim().is_empty() {
            return Err(PipelineError::Schema(format!(
                "scene {} has empty image prompt",
                index
            )));
        }
        if scene.media.duration_seconds <= 0.0 {
            return Err(PipelineError::Schema(format!(
                "scene {} has non-positive duration",
                index
            )));
        }

        scenes.push(Scene {
            index,
            title: scene.title,
            description: scene.description,
            image_prompt: scene.media.image_prompt,
            narration: scene.media.audio_narration,
            background_music: scene.media.background_music,
            duration_seconds: scene.media.duration_seconds,
            transition: scene.transition,
        });
    }

    Ok(Storyboard {
        title: response.title,
        theme: response.theme,
        scenes,
    })
}

const SYSTEM_PROMPT: &str = "You are a creative storyteller and expert screenwriter. \
Generate a structured story that can be converted into a video sequence, divided into \
distinct scenes that flow naturally into one another.\n\n\
For each scene provide a short title, a detailed description, an extremely detailed \
image prompt (style, lighting, mood, colors) that visually continues the previous \
scene, engaging narration text that reads as a continuation of the previous scene's \
narration, a background music suggestion, a suggested duration in seconds, and a \
transition to the next scene.\n\n\
The story must have a clear beginning, middle, and end, and read as one cohesive \
whole across all scenes. Your output is consumed directly by an automated video \
generator, so be specific about visual and audio elements.";

fn build_user_prompt(prompt: &str, scene_count: usize, style: Option<&str>) -> String {
    let mut user_prompt = format!(
        "Create a story with approximately {} scenes based on the following prompt: {}",
        scene_count, prompt
    );
    if let Some(style) = style {
        user_prompt.push_str(&format!("\nThe story should be in a {} style.", style));
    }
    user_prompt.push_str(
        "\n\nMake sure each scene flows naturally from the previous one, with narration \
         that continues the story and image prompts detailed enough for high-quality \
         generation.",
    );
    user_prompt
}

/// Function-calling schema constraining the completion output.
fn story_schema() -> Value {
    json!({
        "name": "generate_story",
        "description": "Generate a structured story with scenes and multimedia elements for video creation",
        "parameters": {
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Title of the story" },
                "theme": { "type": "string", "description": "Central theme of the story" },
                "scenes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "description": "Short descriptive title for the scene" },
                            "description": { "type": "string", "description": "Detailed description of what happens in the scene" },
                            "media": {
                                "type": "object",
                                "properties": {
                                    "image_prompt": { "type": "string", "description": "Extremely detailed prompt for image generation" },
                                    "audio_narration": { "type": "string", "description": "Narration text that continues the story from the previous scene" },
                                    "background_music": { "type": "string", "description": "Type of background music for the scene" },
                                    "duration_seconds": { "type": "number", "description": "Suggested duration of this scene in seconds" }
                                },
                                "required": ["image_prompt", "audio_narration", "background_music", "duration_seconds"]
                            },
                            "transition": { "type": "string", "description": "Transition to the next scene (e.g. fade, dissolve, cut)" }
                        },
                        "required": ["title", "description", "media", "transition"]
                    }
                }
            },
            "required": ["title", "theme", "scenes"]
        }
    })
}
