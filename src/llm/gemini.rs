// src/llm/gemini.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, warn};

use super::{LlmError, TextModel};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    endpoint: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client,
        })
    }

    /// Points the client at another host, e.g. a local stand-in.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&error_body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(error_body);
            error!(status = %status, model = %self.model, "Gemini API returned an error.");
            return Err(LlmError::Api { status: status.as_u16(), message });
        }

        let reply: Value = response.json().await?;
        extract_text(&reply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Joins the text parts of the first candidate.
fn extract_text(reply: &Value) -> Result<String, LlmError> {
    let parts = reply["candidates"][0]["content"]["parts"].as_array().ok_or_else(|| {
        let reason = reply["promptFeedback"]["blockReason"].as_str().unwrap_or("no candidates");
        warn!(reason, "Gemini reply carried no content.");
        LlmError::InvalidResponse(format!("no text in reply ({reason})"))
    })?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyReply);
    }
    Ok(text.trim().to_string())
}
