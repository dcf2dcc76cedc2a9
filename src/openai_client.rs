// src/openai_client.rs
// OpenAI API client
// Supports: structured chat completions, image generation, TTS, transcription

use crate::error::{PipelineError, Result};
use crate::upstream::{ImageSynthesis, SpeechRequest, SpeechSynthesis, TextGeneration, Transcription};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: Client,
    base_url: String,
    chat_model: String,
}

// ============================================================================
// API REQUEST/RESPONSE STRUCTURES
// ============================================================================

#[derive(Serialize, Debug)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    tools: Vec<Value>,
    tool_choice: Value,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize, Debug)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize, Debug)]
struct FunctionCall {
    arguments: String,
}

#[derive(Deserialize, Debug)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    url: String,
}

#[derive(Deserialize, Debug)]
struct TranscriptionResponse {
    text: String,
}

// ============================================================================
// IMPLEMENTATION
// ============================================================================

impl OpenAiClient {
    pub fn new(api_key: String, chat_model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            client,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model,
        }
    }

    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::Upstream(format!(
                "OpenAI {} API error ({}): {}",
                what, status, error_text
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl TextGeneration for OpenAiClient {
    async fn complete_structured(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &Value,
    ) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url);

        let schema_name = schema["name"].as_str().unwrap_or("generate");
        let request_body = ChatCompletionRequest {
            model: self.chat_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            tools: vec![json!({ "type": "function", "function": schema })],
            tool_choice: json!({ "type": "function", "function": { "name": schema_name } }),
            temperature: 0.7,
            max_tokens: 3000,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;
        let response = Self::check_status(response, "chat").await?;

        let completion: ChatCompletionResponse = response.json().await?;
        let tool_call = completion
            .choices
            .first()
            .and_then(|c| c.message.tool_calls.first())
            .ok_or_else(|| {
                PipelineError::Schema("no function call in completion response".to_string())
            })?;

        serde_json::from_str(&tool_call.function.arguments).map_err(|e| {
            PipelineError::Schema(format!("function arguments are not valid JSON: {}", e))
        })
    }
}

#[async_trait]
impl ImageSynthesis for OpenAiClient {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        let url = format!("{}/images/generations", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": "dall-e-3",
                "prompt": prompt,
                "size": "1024x1024",
                "quality": "standard",
                "n": 1,
            }))
            .send()
            .await?;
        let response = Self::check_status(response, "images").await?;

        let generation: ImageGenerationResponse = response.json().await?;
        let image_url = generation
            .data
            .first()
            .map(|d| d.url.clone())
            .ok_or_else(|| PipelineError::Schema("image response had no data".to_string()))?;

        // The API returns a short-lived URL; fetch the actual bytes.
        let image_response = self.client.get(&image_url).send().await?;
        let image_response = Self::check_status(image_response, "image download").await?;
        let bytes = image_response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesis for OpenAiClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        let url = format!("{}/audio/speech", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": "tts-1-hd",
                "voice": request.voice,
                "input": request.text,
                "speed": request.speed,
            }))
            .send()
            .await?;
        let response = Self::check_status(response, "speech").await?;

        let audio_bytes = response.bytes().await?;
        Ok(audio_bytes.to_vec())
    }
}

#[async_trait]
impl Transcription for OpenAiClient {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/mpeg")
            .map_err(|e| PipelineError::Upstream(format!("invalid multipart body: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("model", "whisper-1")
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let response = Self::check_status(response, "transcription").await?;

        let transcription: TranscriptionResponse = response.json().await?;
        Ok(transcription.text)
    }
}
