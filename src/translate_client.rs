// src/translate_client.rs
// Google Translate client (unauthenticated gtx endpoint) plus the table of
// language codes this service accepts for dubbing and narration.

use crate::error::{PipelineError, Result};
use crate::upstream::Translation;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Language codes supported by both the translation and speech-synthesis
/// capabilities. Codes outside this set are rejected before any upstream
/// call.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "nl", "pl", "ru", "uk", "tr", "ar", "hi", "bn", "ta",
    "te", "ja", "ko", "zh-CN", "zh-TW", "id", "vi", "th", "sv", "no", "da", "fi", "el", "cs",
    "ro", "hu",
];

pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|c| *c == code)
}

/// Reject unsupported target-language codes with a `Validation` error.
pub fn validate_target_language(code: &str) -> Result<()> {
    if is_supported_language(code) {
        Ok(())
    } else {
        Err(PipelineError::Validation(format!(
            "unsupported target language: {}",
            code
        )))
    }
}

#[derive(Clone)]
pub struct GoogleTranslateClient {
    client: Client,
    base_url: String,
}

impl GoogleTranslateClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: "https://translate.googleapis.com".to_string(),
        }
    }

}

#[async_trait]
impl Translation for GoogleTranslateClient {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        validate_target_language(target_lang)?;

        let url = format!("{}/translate_a/single", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::Upstream(format!(
                "translate API error ({}): {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await?;
        parse_translation(&body)
    }
}

/// The gtx endpoint answers with nested arrays; the translated text is the
/// first element of each segment under the first top-level array.
fn parse_translation(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::Schema("unexpected translate response shape".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(PipelineError::Schema(
            "translate response contained no text".to_string(),
        ));
    }
    Ok(translated)
}
