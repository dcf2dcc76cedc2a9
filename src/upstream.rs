// src/upstream.rs
//! Capability traits for the external generative and transcription
//! services. Pipelines depend on these seams only, so every stage can be
//! exercised against fakes in tests.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Structured text generation: a completion constrained to a fixed output
/// schema (function calling). Returns the parsed function arguments.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    async fn complete_structured(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &Value,
    ) -> Result<Value>;
}

/// Image synthesis from a text prompt. Returns encoded image bytes.
#[async_trait]
pub trait ImageSynthesis: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Parameters for one speech synthesis call.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
    /// BCP-47-ish language code; None means the service default.
    pub language: Option<String>,
    pub speed: f32,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: "shimmer".to_string(),
            language: None,
            speed: 0.90,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Speech synthesis. Returns encoded audio bytes (mp3).
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>>;
}

/// Speech-to-text over a complete audio file.
#[async_trait]
pub trait Transcription: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String>;
}

/// Machine translation into an explicit target language.
#[async_trait]
pub trait Translation: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}
