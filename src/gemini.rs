use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::models::{FloralAnalysisResponse, ImagePayload, Language, Suggestion};
use crate::prompts::{build_image_prompt, response_schema, user_prompt, IMAGE_ASPECT_RATIO, SYSTEM_INSTRUCTION};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("API key is missing")] MissingApiKey,
    #[error("HTTP error: {0}")] Http(String),
    #[error("no response from AI")] EmptyResponse,
    #[error("parse error: {0}")] Parse(String),
}

/// The two remote calls the app depends on.
#[async_trait]
pub trait FloralModel: Send + Sync {
    /// Fails with [`GeminiError::MissingApiKey`] before touching the network
    /// when `api_key` is blank. Never retried.
    async fn analyze_floral_request(
        &self,
        text: &str,
        image: Option<&ImagePayload>,
        language: Language,
        api_key: &str,
    ) -> Result<FloralAnalysisResponse, GeminiError>;

    /// Returns a `data:` URL, or `None` on any failure.
    async fn generate_floral_image(&self, suggestion: &Suggestion, api_key: &str) -> Option<String>;
}

// Helper function to truncate base64 data in JSON for cleaner logging
pub fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn loggable(value: &Value) -> String {
    let mut copy = value.clone();
    truncate_base64_in_json(&mut copy);
    serde_json::to_string(&copy).unwrap_or_default()
}

/// Content parts go image first, then the request text, then the language directive.
pub fn build_analysis_body(text: &str, image: Option<&ImagePayload>, language: Language) -> Value {
    let mut parts = Vec::with_capacity(3);
    if let Some(image) = image {
        parts.push(json!({
            "inlineData": { "mimeType": image.mime_type, "data": image.to_base64() }
        }));
    }
    parts.push(json!({ "text": user_prompt(text) }));
    parts.push(json!({ "text": language.output_directive() }));

    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

pub fn build_image_body(suggestion: &Suggestion) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": build_image_prompt(suggestion) }]
        }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": { "aspectRatio": IMAGE_ASPECT_RATIO }
        }
    })
}

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    client: Client,
    base_url: String,
    analysis_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, analysis_model: impl Into<String>, image_model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            analysis_model: analysis_model.into(),
            image_model: image_model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base, &config.analysis_model, &config.image_model)
    }

    async fn perform_api_call(&self, model: &str, api_key: &str, body: &Value) -> Result<GeminiResponse, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        info!("🔗 Making request to: {}", url);
        debug!("📤 Request body: {}", loggable(body));

        let response = self.client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", error_body);
            return Err(GeminiError::Http(format!("status={} body={}", status, error_body)));
        }

        let raw: Value = response.json().await.map_err(|e| GeminiError::Parse(e.to_string()))?;
        debug!("📥 Raw Gemini API response: {}", loggable(&raw));

        serde_json::from_value(raw).map_err(|e| GeminiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FloralModel for GeminiClient {
    async fn analyze_floral_request(
        &self,
        text: &str,
        image: Option<&ImagePayload>,
        language: Language,
        api_key: &str,
    ) -> Result<FloralAnalysisResponse, GeminiError> {
        if api_key.trim().is_empty() {
            error!("❌ Analysis request not sent: API key is missing");
            return Err(GeminiError::MissingApiKey);
        }

        info!(
            "🌸 Requesting floral analysis (image: {}, text: {} chars, language: {:?})",
            image.map(|i| i.mime_type.as_str()).unwrap_or("none"),
            text.trim().len(),
            language
        );
        let body = build_analysis_body(text, image, language);

        let result = async {
            let response = self.perform_api_call(&self.analysis_model, api_key, &body).await?;
            let text = extract_text(&response).ok_or(GeminiError::EmptyResponse)?;
            serde_json::from_str::<FloralAnalysisResponse>(text.trim())
                .map_err(|e| GeminiError::Parse(format!("{}: {}", e, text)))
        }
        .await;

        match &result {
            Ok(parsed) => info!("✅ Analysis returned {} suggestions", parsed.suggestions.len()),
            Err(e) => error!("❌ Gemini API error: {}", e),
        }
        result
    }

    async fn generate_floral_image(&self, suggestion: &Suggestion, api_key: &str) -> Option<String> {
        if api_key.trim().is_empty() {
            error!("❌ API key is missing for image generation");
            return None;
        }

        info!("🎯 Generating preview for '{}'", suggestion.title);
        match self.perform_api_call(&self.image_model, api_key, &build_image_body(suggestion)).await {
            Ok(response) => {
                let image = extract_first_image_data_url(&response);
                match &image {
                    Some(url) => info!("🖼️ Preview for '{}' ready ({} chars)", suggestion.title, url.len()),
                    None => info!("⚠️ No image data found for '{}'", suggestion.title),
                }
                image
            }
            Err(e) => {
                error!("❌ Gemini image generation error for '{}': {}", suggestion.title, e);
                None
            }
        }
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    #[allow(dead_code)]
    Other(Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

// Joins the text parts of the first candidate.
fn extract_text(resp: &GeminiResponse) -> Option<String> {
    let candidate = resp.candidates.first()?;
    let text: String = candidate.content.parts.iter()
        .filter_map(|p| match p { Part::Text { text } => Some(text.as_str()), _ => None })
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

fn extract_first_image_data_url(resp: &GeminiResponse) -> Option<String> {
    let candidate = resp.candidates.first()?;
    candidate.content.parts.iter().find_map(|p| match p {
        Part::Inline { inline_data } => {
            info!("🎯 Found image data with mime type: {}", inline_data.mime_type);
            Some(format!("data:{};base64,{}", inline_data.mime_type, inline_data.data))
        }
        _ => None,
    })
}
