//! LLM client abstraction and provider selection
//!
//! The agent loop talks to models only through [`LLMClient`]. Two backends are
//! provided:
//! - **Gemini**: Google Gemini `generateContent` REST API
//! - **Ollama**: local Ollama server `/api/chat`
//!
//! Tests and embedders can supply their own implementation.

use crate::types::{AppError, Message, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
///
/// Invocations are stateless: every call receives the full ordered history and
/// the tool schemas, and the client keeps no memory between calls.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Produce the next assistant turn for `messages`, offering `tools`.
    async fn generate_with_tools_and_history(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM generation request
#[derive(Debug, Clone, PartialEq)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
        }
    }

    pub fn tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finish_reason: "tool_calls".to_string(),
        }
    }

    /// Convert into the assistant message appended to the conversation.
    pub fn into_message(self) -> Message {
        Message::assistant(self.content, self.tool_calls)
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini API
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: "AIza...".to_string(),
    ///     api_base: "https://generativelanguage.googleapis.com".to_string(),
    ///     model: "gemini-1.5-flash".to_string(),
    ///     params: GenerationParams::default(),
    /// };
    /// ```
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
        params: GenerationParams,
    },

    /// Ollama local LLM provider
    ///
    /// The model must support tool calling (e.g. `llama3.1`, `qwen2.5`).
    Ollama {
        base_url: String,
        model: String,
        params: GenerationParams,
    },
}

/// Settings shared by every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub system_prompt: Option<String>,
    pub request_timeout: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            system_prompt: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` when credentials or the model name are
    /// missing, before any request is made.
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::gemini::GeminiClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                params.clone(),
            )?)),

            Provider::Ollama {
                base_url,
                model,
                params,
            } => Ok(Box::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
                params.clone(),
            )?)),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Build the shared reqwest client used by the HTTP backends.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    if timeout.is_zero() {
        return Err(AppError::Configuration(
            "request timeout must be greater than zero".to_string(),
        ));
    }
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))
}
