// src/llm/mod.rs

//! Hosted language-model tasks: security review of a code snippet and
//! phishing classification of a message.
//!
//! The model's reply is opaque text. Nothing downstream parses it; the only
//! guarantee is that a successful reply is non-empty.

pub mod gemini;
pub mod prompts;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

pub use self::gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned an empty reply")]
    EmptyReply,

    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    #[error("input is empty")]
    EmptyInput,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// A model that turns one prompt into one non-empty block of text.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier for logs.
    fn model(&self) -> &str;
}

/// Asks the model for a security review of `code`.
pub async fn analyze_code(model: &dyn TextModel, code: &str) -> Result<String, LlmError> {
    run_task(model, "code_analysis", code, prompts::code_analysis).await
}

/// Asks the model whether `message` is a phishing attempt.
pub async fn check_phishing(model: &dyn TextModel, message: &str) -> Result<String, LlmError> {
    run_task(model, "phishing_check", message, prompts::phishing_check).await
}

async fn run_task(
    model: &dyn TextModel,
    task: &'static str,
    input: &str,
    build_prompt: fn(&str) -> String,
) -> Result<String, LlmError> {
    if input.trim().is_empty() {
        return Err(LlmError::EmptyInput);
    }
    debug!(task, model = model.model(), input_chars = input.len(), "Sending prompt to language model.");
    let reply = model.complete(&build_prompt(input)).await?;
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(LlmError::EmptyReply);
    }
    info!(task, reply_chars = reply.len(), "Language model replied.");
    Ok(reply.to_string())
}
